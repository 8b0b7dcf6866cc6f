//! kmk IR - shared vocabulary types
//!
//! This crate contains the small data types every other kmk crate speaks:
//! - `Name`: interned identifiers (variable and function names)
//! - `StringInterner`: sharded, thread-safe interning table
//! - `Span` / `Location`: source coordinates for diagnostics
//! - Variable vocabulary: origin, flavor, assignment operators
//!
//! # Design Philosophy
//!
//! - **Intern names**: plain variable references are compiled to a `Name(u32)`
//!   so run-time lookups compare integers, not text.
//! - **Copy everything small**: all types here are `Copy` except the interner.

/// Compile-time assertion that a type has a specific size.
///
/// Used to keep hot instruction payloads from silently growing.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod interner;
mod name;
mod span;
mod var;

pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use name::Name;
pub use span::{Location, Span, SpanError};
pub use var::{AssignOp, Flavor, Origin};
