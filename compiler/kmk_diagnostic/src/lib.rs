//! Diagnostic system for the kmk compiler and interpreter.
//!
//! Every user-visible problem carries:
//! - an [`ErrorCode`] for searchability
//! - a message naming the offending construct
//! - a [`Location`](kmk_ir::Location) (file, line, column when known)
//!
//! Fatal errors travel as `Err` values up to the outermost caller and are
//! converted to a [`Diagnostic`] only for rendering. Non-fatal warnings are
//! pushed into a [`DiagnosticQueue`], which plays the role of the warning
//! sink for both the compiler and the interpreter.

mod diagnostic;
pub mod emitter;
mod error_code;
pub mod queue;

pub use diagnostic::{Diagnostic, Severity};
pub use error_code::ErrorCode;
pub use queue::DiagnosticQueue;
