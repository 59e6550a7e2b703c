//! Status views for leasables and the leasing office.

use serde::{Deserialize, Serialize};

use crate::domain::{LeaseState, ResourceId};

/// Point-in-time view of one leasable core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeasableStatus {
    pub state: LeaseState,
    pub lease_count: usize,
    pub closed: bool,

    /// Present while a resource is held.
    pub resource: Option<ResourceStatus>,
}

/// Metadata of the resource currently held by a core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub id: ResourceId,
    pub age_ms: u64,
    pub error_count: u32,
    pub usage_count: u64,
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedStatus {
    pub key: String,
    #[serde(flatten)]
    pub status: LeasableStatus,
}

/// Point-in-time view of a whole leasing office.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficeSnapshot {
    pub closed: bool,
    pub total: usize,
    pub entries: Vec<KeyedStatus>,
}

impl OfficeSnapshot {
    /// Sum of outstanding leases across all keys.
    pub fn total_leases(&self) -> usize {
        self.entries.iter().map(|e| e.status.lease_count).sum()
    }

    /// Number of keys currently holding a resource (idle or live).
    pub fn live_resources(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status.resource.is_some())
            .count()
    }
}
