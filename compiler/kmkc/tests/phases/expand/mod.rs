//! Expansion phase tests.
//!
//! - `programs` - compiled program shapes, caching and invalidation
//! - `functions` - built-in functions over realistic variable sets

mod functions;
mod programs;
