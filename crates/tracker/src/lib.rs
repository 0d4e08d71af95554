//! Session continuity for horizontally-scaled deployments.
//!
//! Implements the cluster-key model: every client session gets a stable
//! correlation key that round-trips through a client-visible carrier and the
//! server-side session attributes, so any replica can locate the same logical
//! session in shared storage.  Live session state that cannot be serialized
//! rides across replicas in a [`TransientCapsule`], which replays
//! transient-resource reconstruction under the original ambient context and
//! the session's execution lock.

pub mod ambient;
pub mod capsule;
pub mod carrier;
pub mod current_key;
pub mod identity;
pub mod session;

pub use ambient::{current_session, current_unit, AmbientGuard, UnitOfWork};
pub use capsule::{TransientCapsule, TransientDescriptor, TransientResolver};
pub use carrier::{CarrierSink, CarrierSource};
pub use current_key::CLUSTER_KEY;
pub use identity::{carrier_value, current_token, ensure_bound};
pub use session::{
    LockLease, LockSlot, LockableSession, MemorySession, SessionAttributes, SessionLock,
};
