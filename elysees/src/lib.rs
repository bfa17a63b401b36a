//! Named leases: exclusive, time-bounded ownership of a resource identified
//! by name.
//!
//! [`LeaseStore`] is the in-process authority that grants, renews and
//! releases leases. [`client::Elysees`] talks to a store exposed over HTTP
//! and hands out [`client::Lease`] handles for granted leases.

pub mod client;
mod clock;
mod gate;
mod outcome;
mod record;
mod store;
pub mod wire;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::GateRegistry;
pub use outcome::{ExpiryOutcome, ReleaseOutcome, RenewOutcome, RequestOutcome};
pub use record::LeaseRecord;
pub use store::LeaseStore;

/// Path under which the HTTP transport mounts the lease endpoints.
pub const API_BASE_PATH: &str = "/elysees-api/v1";
