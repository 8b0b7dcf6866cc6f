//! Compiler configuration.

/// Knobs shared by the compilers and interpreters of one
/// [`CompilerContext`](crate::CompilerContext).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompilerConfig {
    /// Warn when an undefined variable is referenced.
    pub warn_undefined: bool,
    /// Instruction slots in the first arena block of every program.
    pub first_block_hint: usize,
    /// Maximum nesting of `include` directives.
    pub max_include_depth: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            warn_undefined: false,
            first_block_hint: 16,
            max_include_depth: 32,
        }
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn with_warn_undefined(mut self, warn: bool) -> Self {
        self.warn_undefined = warn;
        self
    }

    #[must_use]
    pub fn with_first_block_hint(mut self, slots: usize) -> Self {
        self.first_block_hint = slots.max(1);
        self
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, depth: u32) -> Self {
        self.max_include_depth = depth;
        self
    }
}
