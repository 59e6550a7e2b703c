//! Leasable state machine.

use serde::{Deserialize, Serialize};

/// Observable state of one leasable core.
///
/// State transitions:
/// - Empty -> Live(1)            (acquire builds a resource)
/// - Live(n) -> Live(n + 1)      (acquire reuses the resource)
/// - Live(n) -> Live(n - 1)      (release, n > 1)
/// - Live(1) -> Idle             (last release, policy keeps the resource)
/// - Live(1) -> Empty            (last release, policy renews: resource disposed)
/// - Idle -> Live(1)             (acquire reuses the cached resource, no build)
/// - Idle | Empty -> Live(1)     (renew_and_acquire builds a fresh resource)
/// - any -> Closed(n)            (shutdown disposes the resource; n holders remain)
/// - Closed(n) -> Closed(n - 1)  (outstanding holder releases)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseState {
    /// No resource held.
    Empty,

    /// Resource retained for reuse, no outstanding lease.
    Idle,

    /// Resource lent to `n >= 1` holders.
    Live(usize),

    /// Shut down. No resource is held; `n` leases have not been released yet.
    Closed(usize),
}

impl LeaseState {
    pub(crate) fn from_parts(has_resource: bool, lease_count: usize, closed: bool) -> Self {
        match (closed, has_resource, lease_count) {
            (true, _, n) => LeaseState::Closed(n),
            (false, _, n) if n > 0 => LeaseState::Live(n),
            (false, true, _) => LeaseState::Idle,
            (false, false, _) => LeaseState::Empty,
        }
    }

    /// Number of outstanding leases.
    pub fn lease_count(self) -> usize {
        match self {
            LeaseState::Live(n) | LeaseState::Closed(n) => n,
            LeaseState::Empty | LeaseState::Idle => 0,
        }
    }

    /// Is the resource currently lent to someone?
    pub fn is_live(self) -> bool {
        matches!(self, LeaseState::Live(_))
    }

    pub fn is_closed(self) -> bool {
        matches!(self, LeaseState::Closed(_))
    }
}

/// Result of a best-effort forced renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewOutcome {
    /// A fresh resource was built for this lease.
    Renewed,

    /// Another holder got in first; the existing (possibly stale) resource was leased.
    Stale,
}

impl RenewOutcome {
    pub fn is_renewed(self) -> bool {
        matches!(self, RenewOutcome::Renewed)
    }
}
