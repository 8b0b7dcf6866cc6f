//! kmkc - driver for the kmk expansion and directive compiler.
//!
//! The [`Engine`] bundles one compiler instance with the collaborators the
//! core leaves to its host: a variable table, a rule list and a diagnostics
//! queue. The `kmk-cc` binary is a thin layer over it; see [`commands`].

pub mod commands;
mod engine;

use std::sync::Once;

pub use engine::{check_files, split_definition, CheckOutcome, Engine, EngineError};

static TRACING_INIT: Once = Once::new();

/// Install the global tracing subscriber.
///
/// Does nothing unless `RUST_LOG` is set, e.g. `RUST_LOG=kmk_cc=debug`.
/// With `KMK_LOG_TREE` set, spans are rendered as an indented tree.
/// Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var_os("RUST_LOG").is_none() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        let installed = if std::env::var_os("KMK_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .try_init()
        };
        if let Err(err) = installed {
            eprintln!("warning: tracing not initialized: {err}");
        }
    });
}
