//! Context-preserving serialization wrapper for transient session state.
//!
//! A [`TransientCapsule`] rides along with serialized session state: it
//! wraps the serializable payload together with descriptors of the transient
//! resources that must be rebuilt after rehydration, and remembers which
//! session and unit of work were active when it was captured.  On the
//! restoring replica, [`TransientCapsule::replay`] runs the reconstruction
//! with the original ambient context reinstalled and the session's execution
//! lock held, so rehydration cannot race live activity on the same logical
//! session.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rk_domain::{Result, TraceEvent};

use crate::ambient::{self, UnitOfWork};
use crate::session::LockableSession;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Descriptors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Describes one transient slot of a payload: which slot (`name`) and which
/// environment resource rebuilds it (`reference`).  Pure data; the rebuild
/// itself is a [`TransientResolver`].  Immutable once captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientDescriptor {
    name: String,
    reference: String,
}

impl TransientDescriptor {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
        }
    }

    /// Identifier of the transient slot on the payload.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the environment resource that rebuilds the slot.
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// Rebuilds one transient slot after rehydration, inside the restored
/// ambient context.
pub trait TransientResolver {
    fn rebuild(&self, descriptor: &TransientDescriptor, payload: Option<&Value>) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Capsule
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wraps a serializable payload with its transient descriptors and the
/// ambient context captured alongside them.
///
/// Captured handles are weak back-references and do not survive
/// serialization; the restore pipeline re-associates the reconstructed
/// session and unit with [`rebind`](Self::rebind) before calling
/// [`replay`](Self::replay).
#[derive(Serialize, Deserialize)]
pub struct TransientCapsule {
    payload: Option<Value>,
    descriptors: Vec<TransientDescriptor>,
    #[serde(skip)]
    captured_unit: Option<Weak<dyn UnitOfWork>>,
    #[serde(skip)]
    captured_session: Option<Weak<dyn LockableSession>>,
}

impl std::fmt::Debug for TransientCapsule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientCapsule")
            .field("payload", &self.payload)
            .field("descriptors", &self.descriptors)
            .field("captured_unit", &self.captured_unit.is_some())
            .field("captured_session", &self.captured_session.is_some())
            .finish()
    }
}

impl TransientCapsule {
    /// Capture `payload` and its transient descriptors together with
    /// whatever ambient context is active on the calling thread.  The unit
    /// of work and session are snapshotted independently; capturing outside
    /// any request (neither active) is valid.
    pub fn capture(payload: Option<Value>, descriptors: &[TransientDescriptor]) -> Self {
        Self {
            payload,
            descriptors: descriptors.to_vec(),
            captured_unit: ambient::current_unit().map(|u| Arc::downgrade(&u)),
            captured_session: ambient::current_session().map(|s| Arc::downgrade(&s)),
        }
    }

    /// The canonical "nothing transient to carry" capsule: no payload, no
    /// descriptors, no captured context.
    pub fn null() -> Self {
        Self {
            payload: None,
            descriptors: Vec::new(),
            captured_unit: None,
            captured_session: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.payload.is_none()
            && self.descriptors.is_empty()
            && self.captured_unit.is_none()
            && self.captured_session.is_none()
    }

    /// The transient descriptors, as an independent copy: mutating the
    /// returned list never affects the capsule.
    pub fn descriptors(&self) -> Vec<TransientDescriptor> {
        self.descriptors.clone()
    }

    /// The wrapped payload, as-is.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Re-associate context handles with a deserialized capsule.
    ///
    /// Serialization carries only the payload and descriptors; the restore
    /// pipeline calls this with the freshly-reconstructed session (and unit,
    /// when one exists) before replaying.
    pub fn rebind(
        &mut self,
        session: Option<&Arc<dyn LockableSession>>,
        unit: Option<&Arc<dyn UnitOfWork>>,
    ) {
        self.captured_session = session.map(Arc::downgrade);
        self.captured_unit = unit.map(Arc::downgrade);
    }

    /// Run `action` the way the capture-side code ran: with the captured
    /// unit of work (or, failing that, the captured session) reinstalled as
    /// the ambient context, and the captured session's execution lock held.
    ///
    /// A session with no attached lock gets one synthesized for the duration
    /// of the outstanding replays and detached once the last of them
    /// finishes (see [`LockSlot::lease`]).  Acquisition blocks the calling
    /// thread until the lock is free; there is no timeout.  The lock is
    /// released and the previous ambient context restored on every exit
    /// path, and only then does an error from `action` reach the caller.
    ///
    /// Consumes the capsule: each capsule backs exactly one restore attempt.
    /// A dead back-reference means the original session or unit is gone and
    /// counts as absent.
    ///
    /// [`LockSlot::lease`]: crate::session::LockSlot::lease
    pub fn replay<F>(self, action: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let unit = self.captured_unit.as_ref().and_then(Weak::upgrade);
        let session = self.captured_session.as_ref().and_then(Weak::upgrade);

        let _ambient = match (&unit, &session) {
            (Some(unit), _) => Some(ambient::activate_unit(unit.clone())),
            (None, Some(session)) => Some(ambient::activate_session(session.clone())),
            (None, None) => None,
        };

        match &session {
            Some(session) => {
                let lease = session.lock_slot().lease();
                TraceEvent::CapsuleReplay {
                    descriptors: self.descriptors.len(),
                    locked: true,
                    lock_synthesized: lease.synthesized(),
                }
                .emit();
                let _guard = lease.lock().lock();
                action()
            }
            None => {
                TraceEvent::CapsuleReplay {
                    descriptors: self.descriptors.len(),
                    locked: false,
                    lock_synthesized: false,
                }
                .emit();
                action()
            }
        }
    }

    /// The typical replay action: rebuild every transient descriptor against
    /// the restored payload, in order.  The first failure fails the whole
    /// replay; earlier rebuilds are not rolled back or reported separately.
    pub fn replay_rebuild(self, resolver: &dyn TransientResolver) -> Result<()> {
        let descriptors = self.descriptors.clone();
        let payload = self.payload.clone();
        self.replay(move || {
            for descriptor in &descriptors {
                resolver.rebuild(descriptor, payload.as_ref())?;
            }
            Ok(())
        })
    }
}
