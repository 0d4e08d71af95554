//! Session abstractions — attribute storage and the execution-lock slot.
//!
//! The host runtime owns its session objects; this crate reaches them
//! through two narrow traits.  [`SessionAttributes`] is the well-known-name
//! attribute map the cluster key lives in.  [`LockableSession`] exposes the
//! session's execution lock through a [`LockSlot`], the public
//! get-or-create/detach capability that replaces poking a private lock field
//! on a foreign session object.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use rk_domain::Result;

/// The execution lock governing one logical session.
pub type SessionLock = Arc<Mutex<()>>;

/// Server-side session attribute store: well-known names to values.
pub trait SessionAttributes: Send + Sync {
    fn attribute(&self, name: &str) -> Option<String>;

    /// Write an attribute.  A rejected write is a fatal storage error and is
    /// surfaced to the caller unretried.
    fn set_attribute(&self, name: &str, value: &str) -> Result<()>;
}

/// A session that exposes its execution lock through a [`LockSlot`].
pub trait LockableSession: Send + Sync {
    fn lock_slot(&self) -> &LockSlot;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lock slot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct SlotEntry {
    lock: SessionLock,
    synthesized: bool,
    /// Outstanding leases; meaningful only while `synthesized`.
    leases: usize,
}

/// Get-or-create lock capability embedded in every lockable session.
///
/// Request machinery installs the session's real lock with [`attach`]; that
/// attachment lasts until [`detach`].  A replay on a freshly-reconstructed
/// session finds the slot empty and [`lease`]s a synthesized lock instead.
/// Concurrent leases of an empty slot share a single synthesized instance,
/// and the attachment is removed when the last lease drops, so a synthesized
/// lock never outlives the replays that needed it.
///
/// Clones share the same slot.
///
/// [`attach`]: LockSlot::attach
/// [`detach`]: LockSlot::detach
/// [`lease`]: LockSlot::lease
#[derive(Clone, Default)]
pub struct LockSlot {
    state: Arc<Mutex<Option<SlotEntry>>>,
}

impl LockSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `lock` as the session's lock, replacing any attachment.
    pub fn attach(&self, lock: SessionLock) {
        *self.state.lock() = Some(SlotEntry {
            lock,
            synthesized: false,
            leases: 0,
        });
    }

    /// Remove the current attachment, if any.
    pub fn detach(&self) {
        *self.state.lock() = None;
    }

    /// The currently attached lock, if any.
    pub fn current(&self) -> Option<SessionLock> {
        self.state.lock().as_ref().map(|e| e.lock.clone())
    }

    /// Get the attached lock, or synthesize one for the duration of the
    /// lease.
    ///
    /// Leasing an empty slot installs a synthesized lock; further leases
    /// taken before the last one drops join the same instance, so replays
    /// that race on a reconstructed session still exclude each other.
    pub fn lease(&self) -> LockLease {
        let mut state = self.state.lock();
        match state.as_mut() {
            Some(entry) => {
                if entry.synthesized {
                    entry.leases += 1;
                }
                LockLease {
                    slot: self.clone(),
                    lock: entry.lock.clone(),
                    synthesized: entry.synthesized,
                }
            }
            None => {
                let lock: SessionLock = Arc::new(Mutex::new(()));
                *state = Some(SlotEntry {
                    lock: lock.clone(),
                    synthesized: true,
                    leases: 1,
                });
                LockLease {
                    slot: self.clone(),
                    lock,
                    synthesized: true,
                }
            }
        }
    }

    fn release(&self, lock: &SessionLock) {
        let mut state = self.state.lock();
        if let Some(entry) = state.as_mut() {
            if entry.synthesized && Arc::ptr_eq(&entry.lock, lock) {
                entry.leases -= 1;
                if entry.leases == 0 {
                    *state = None;
                }
            }
        }
    }
}

/// A leased session lock.  Dropping the lease removes a synthesized
/// attachment once no other lease still uses it; permanent attachments are
/// untouched.
pub struct LockLease {
    slot: LockSlot,
    lock: SessionLock,
    synthesized: bool,
}

impl LockLease {
    pub fn lock(&self) -> &SessionLock {
        &self.lock
    }

    /// Whether this lease runs on a synthesized lock rather than one the
    /// request machinery attached.
    pub fn synthesized(&self) -> bool {
        self.synthesized
    }
}

impl Drop for LockLease {
    fn drop(&mut self) {
        if self.synthesized {
            self.slot.release(&self.lock);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory session for hosts that keep session state in process memory.
#[derive(Default)]
pub struct MemorySession {
    attributes: RwLock<HashMap<String, String>>,
    lock_slot: LockSlot,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionAttributes for MemorySession {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.read().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        self.attributes
            .write()
            .insert(name.to_owned(), value.to_owned());
        Ok(())
    }
}

impl LockableSession for MemorySession {
    fn lock_slot(&self) -> &LockSlot {
        &self.lock_slot
    }
}
