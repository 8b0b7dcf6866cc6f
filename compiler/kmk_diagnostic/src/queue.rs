//! Diagnostic queue: the warning sink shared by compiler and interpreter.
//!
//! Features:
//! - Warning limit so a noisy makefile cannot flood the output
//! - Deduplication of identical warnings at the same location
//! - Stable ordering by insertion (evaluation order is meaningful in make)

use rustc_hash::FxHashSet;

use crate::{Diagnostic, Severity};

/// Configuration for diagnostic collection.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of warnings kept (0 = unlimited).
    pub warning_limit: usize,
    /// Drop a diagnostic identical to one already queued.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            warning_limit: 100,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// No limits, no deduplication (for tests).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            warning_limit: 0,
            deduplicate: false,
        }
    }
}

/// Ordered collection of reported diagnostics.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    seen: FxHashSet<Diagnostic>,
    warnings: usize,
    errors: usize,
    dropped: usize,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..DiagnosticQueue::default()
        }
    }

    /// Queue a diagnostic. Returns `false` if it was filtered out.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        if diag.severity == Severity::Warning
            && self.config.warning_limit > 0
            && self.warnings >= self.config.warning_limit
        {
            self.dropped += 1;
            return false;
        }
        if self.config.deduplicate && !self.seen.insert(diag.clone()) {
            return false;
        }
        match diag.severity {
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
            Severity::Note => {}
        }
        self.diagnostics.push(diag);
        true
    }

    /// Queue a diagnostic and mirror it into the tracing log.
    pub fn warn(&mut self, diag: Diagnostic) -> bool {
        tracing::warn!(code = %diag.code, "{}", diag.message);
        self.push(diag)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Warnings discarded because the limit was reached.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Take every queued diagnostic, leaving the queue empty.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        self.seen.clear();
        self.warnings = 0;
        self.errors = 0;
        std::mem::take(&mut self.diagnostics)
    }
}
