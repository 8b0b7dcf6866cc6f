//! Compiler statistics.
//!
//! One [`CompilerStats`] belongs to a [`CompilerContext`](crate::CompilerContext)
//! and is shared with the variable table, so independent compiler instances
//! (and unit tests) never see each other's counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::arena::ArenaStats;

#[derive(Debug, Default)]
pub struct CompilerStats {
    expansion_programs: AtomicU64,
    evaluation_programs: AtomicU64,
    expansion_runs: AtomicU64,
    evaluation_runs: AtomicU64,
    invalidated: AtomicU64,
    compile_errors: AtomicU64,
    blocks: AtomicU64,
    arena_bytes: AtomicU64,
    instructions: AtomicU64,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(u64::try_from(by).unwrap_or(u64::MAX), Ordering::Relaxed);
}

impl CompilerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_expansion_program(&self, arena: ArenaStats) {
        bump(&self.expansion_programs, 1);
        self.record_arena(arena);
    }

    pub(crate) fn record_evaluation_program(&self, arena: ArenaStats) {
        bump(&self.evaluation_programs, 1);
        self.record_arena(arena);
    }

    fn record_arena(&self, arena: ArenaStats) {
        bump(&self.blocks, arena.blocks);
        bump(&self.arena_bytes, arena.bytes);
        bump(&self.instructions, arena.instructions);
    }

    pub(crate) fn record_expansion_run(&self) {
        bump(&self.expansion_runs, 1);
    }

    pub(crate) fn record_evaluation_run(&self) {
        bump(&self.evaluation_runs, 1);
    }

    pub(crate) fn record_invalidation(&self) {
        bump(&self.invalidated, 1);
    }

    pub(crate) fn record_compile_error(&self) {
        bump(&self.compile_errors, 1);
    }

    /// Consistent-enough copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            expansion_programs: load(&self.expansion_programs),
            evaluation_programs: load(&self.evaluation_programs),
            expansion_runs: load(&self.expansion_runs),
            evaluation_runs: load(&self.evaluation_runs),
            invalidated: load(&self.invalidated),
            compile_errors: load(&self.compile_errors),
            blocks: load(&self.blocks),
            arena_bytes: load(&self.arena_bytes),
            instructions: load(&self.instructions),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct StatsSnapshot {
    pub expansion_programs: u64,
    pub evaluation_programs: u64,
    pub expansion_runs: u64,
    pub evaluation_runs: u64,
    pub invalidated: u64,
    pub compile_errors: u64,
    pub blocks: u64,
    pub arena_bytes: u64,
    pub instructions: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# compiler statistics")?;
        writeln!(f, "expansion programs:  {:>10}", self.expansion_programs)?;
        writeln!(f, "evaluation programs: {:>10}", self.evaluation_programs)?;
        writeln!(f, "expansion runs:      {:>10}", self.expansion_runs)?;
        writeln!(f, "evaluation runs:     {:>10}", self.evaluation_runs)?;
        writeln!(f, "invalidated:         {:>10}", self.invalidated)?;
        writeln!(f, "compile errors:      {:>10}", self.compile_errors)?;
        writeln!(f, "arena blocks:        {:>10}", self.blocks)?;
        writeln!(f, "arena bytes:         {:>10}", self.arena_bytes)?;
        write!(f, "instructions:        {:>10}", self.instructions)
    }
}
