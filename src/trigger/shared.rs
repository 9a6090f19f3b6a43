//! Discovery latch shared by the relay nodes of one simulation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way latch: starts unset, can be set once, never resets.
///
/// Clones share the same cell. Every relay-role producer of a run receives a
/// clone at construction; separate runs create separate flags.
#[derive(Debug, Clone, Default)]
pub struct SharedDiscoveryFlag {
    inner: Arc<AtomicBool>,
}

impl SharedDiscoveryFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, read fresh on every call
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Set the latch. Returns true only for the call that flipped it.
    pub fn set(&self) -> bool {
        self.inner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Number of handles sharing this flag
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}
