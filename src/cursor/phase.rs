//! Traversal phases
//!
//! ```text
//! Chain(head) -> Chain(older) -> ... -> OnDisk -> History -> Exhausted
//! ```

use crate::table::ChainHandle;

/// Where a traversal currently stands.
///
/// Phases only move forward: `Chain` → `OnDisk` → `History` → `Exhausted`.
/// Going back requires a new `search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Next version is this update chain node.
    Chain(ChainHandle),
    /// Next version is the on-disk base value, if any.
    OnDisk,
    /// Next version comes from the history store.
    History,
    /// Nothing left.
    Exhausted,
}

impl Phase {
    fn rank(&self) -> u8 {
        match self {
            Phase::Chain(_) => 0,
            Phase::OnDisk => 1,
            Phase::History => 2,
            Phase::Exhausted => 3,
        }
    }

    /// Moves to `next`, which must not be an earlier phase.
    pub(crate) fn advance(&mut self, next: Phase) {
        debug_assert!(
            next.rank() >= self.rank(),
            "phase moved backwards: {:?} -> {:?}",
            self,
            next
        );
        *self = next;
    }

    /// Exhaustion flags implied by this phase.
    pub fn flags(&self) -> PhaseFlags {
        let rank = self.rank();
        PhaseFlags {
            chain_exhausted: rank >= 1,
            on_disk_exhausted: rank >= 2,
            history_exhausted: rank >= 3,
        }
    }
}

/// Per-layer exhaustion, derived from [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseFlags {
    pub chain_exhausted: bool,
    pub on_disk_exhausted: bool,
    pub history_exhausted: bool,
}
