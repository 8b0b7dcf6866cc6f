//! Directive phase tests.
//!
//! - `conditionals` - `ifeq`/`ifdef`/`if1of`/`if` chains and their errors
//! - `includes` - include variants, guards, dependency queues
//! - `rules` - rule headers, recipes and statement errors

mod conditionals;
mod includes;
mod rules;
