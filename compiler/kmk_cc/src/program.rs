//! Program lifecycle: run reference counts and output size feedback.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::errors::{program_invalidated, EvalError};

/// Bookkeeping shared by expansion and evaluation programs.
///
/// `refs` is 1 while the program is live and idle, above 1 while at least
/// one run is in flight, and 0 once the program has been invalidated.
#[derive(Debug)]
pub struct ProgramHeader {
    refs: AtomicU32,
    avg_len: AtomicU32,
}

/// Result of [`ProgramHeader::invalidate`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Invalidation {
    Done,
    AlreadyInvalid,
    InFlight,
}

impl ProgramHeader {
    pub(crate) fn new() -> Self {
        ProgramHeader {
            refs: AtomicU32::new(1),
            avg_len: AtomicU32::new(0),
        }
    }

    /// Mark the start of a run. The returned guard ends it on drop.
    pub fn try_begin_run(&self) -> Result<RunGuard<'_>, EvalError> {
        self.refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n == 0 {
                    None
                } else {
                    n.checked_add(1)
                }
            })
            .map_err(|_| program_invalidated())?;
        Ok(RunGuard { refs: &self.refs })
    }

    pub fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.ref_count() > 1
    }

    pub fn is_invalidated(&self) -> bool {
        self.ref_count() == 0
    }

    /// Detach the program. Fails while a run is in flight.
    pub fn invalidate(&self) -> Invalidation {
        match self
            .refs
            .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Invalidation::Done,
            Err(0) => Invalidation::AlreadyInvalid,
            Err(_) => Invalidation::InFlight,
        }
    }

    /// Expected output size of the next run.
    pub fn size_hint(&self) -> usize {
        self.avg_len.load(Ordering::Relaxed) as usize
    }

    /// Fold one run's output size into the moving average:
    /// `avg = (avg * 7 + sample) / 8`.
    pub(crate) fn record_output(&self, produced: usize) {
        let sample = u64::try_from(produced).unwrap_or(u64::MAX);
        let _ = self
            .avg_len
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |avg| {
                let next = (u64::from(avg) * 7).saturating_add(sample) / 8;
                Some(u32::try_from(next).unwrap_or(u32::MAX))
            });
    }
}

/// Proof that a run is in flight.
#[derive(Debug)]
pub struct RunGuard<'p> {
    refs: &'p AtomicU32,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.refs.fetch_sub(1, Ordering::AcqRel);
    }
}
