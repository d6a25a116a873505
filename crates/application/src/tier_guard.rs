use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use doctero_domain::BackupTier;

/// Per-tier "run in progress" flags shared by scheduled and manual runs.
#[derive(Debug, Default)]
pub struct TierGuard {
    running: [AtomicBool; BackupTier::COUNT],
}

impl TierGuard {
    /// Creates a guard with every tier idle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `tier` as running, or returns `None` when it already is.
    #[must_use]
    pub fn try_acquire(self: &Arc<Self>, tier: BackupTier) -> Option<TierPermit> {
        self.running[tier.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TierPermit {
                guard: Arc::clone(self),
                tier,
            })
    }

    /// Returns whether a run for `tier` is in progress.
    #[must_use]
    pub fn is_running(&self, tier: BackupTier) -> bool {
        self.running[tier.index()].load(Ordering::Acquire)
    }
}

/// Proof that the holder owns the run slot of one tier. Released on drop.
#[derive(Debug)]
pub struct TierPermit {
    guard: Arc<TierGuard>,
    tier: BackupTier,
}

impl TierPermit {
    /// Returns the guarded tier.
    #[must_use]
    pub fn tier(&self) -> BackupTier {
        self.tier
    }
}

impl Drop for TierPermit {
    fn drop(&mut self) {
        self.guard.running[self.tier.index()].store(false, Ordering::Release);
    }
}
