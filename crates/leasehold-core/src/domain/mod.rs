//! Domain model (ids, state, errors).

pub mod errors;
pub mod ids;
pub mod state;

pub use self::errors::{BoxError, LeaseError};
pub use self::ids::{LeaseId, ResourceId};
pub use self::state::{LeaseState, RenewOutcome};
