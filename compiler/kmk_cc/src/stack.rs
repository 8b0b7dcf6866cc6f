//! Stack growth for deeply nested expansions.
//!
//! A recursive variable may expand another recursive variable to arbitrary
//! depth, and `include` nests evaluation programs. Both paths go through
//! [`ensure_sufficient_stack`], which grows the stack on demand instead of
//! overflowing.

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
