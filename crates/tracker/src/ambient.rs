//! Ambient execution context — the per-thread "currently active" pointers.
//!
//! Deeply nested code consults the ambient context instead of threading the
//! active session or unit of work through every call.  State is strictly
//! thread-local and mutated only through guards that restore the previous
//! state on drop, so an installation can never leak past its scope or onto
//! another thread.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::session::LockableSession;

/// The active top-level interactive context (one view, one screen) owned by
/// a session at a point in time.
pub trait UnitOfWork: Send + Sync {
    /// The session this unit belongs to, when it has one.
    fn session(&self) -> Option<Arc<dyn LockableSession>> {
        None
    }
}

#[derive(Default, Clone)]
struct Active {
    unit: Option<Arc<dyn UnitOfWork>>,
    session: Option<Arc<dyn LockableSession>>,
}

thread_local! {
    static ACTIVE: RefCell<Active> = RefCell::new(Active::default());
}

/// Install `unit` (and its owning session, when it has one) as current.
pub fn activate_unit(unit: Arc<dyn UnitOfWork>) -> AmbientGuard {
    let session = unit.session();
    swap_in(Active {
        unit: Some(unit),
        session,
    })
}

/// Install `session` as current, with no current unit.
pub fn activate_session(session: Arc<dyn LockableSession>) -> AmbientGuard {
    swap_in(Active {
        unit: None,
        session: Some(session),
    })
}

/// The unit of work currently active on this thread.
pub fn current_unit() -> Option<Arc<dyn UnitOfWork>> {
    ACTIVE.with(|a| a.borrow().unit.clone())
}

/// The session currently active on this thread.
pub fn current_session() -> Option<Arc<dyn LockableSession>> {
    ACTIVE.with(|a| a.borrow().session.clone())
}

fn swap_in(next: Active) -> AmbientGuard {
    let prev = ACTIVE.with(|a| a.replace(next));
    AmbientGuard {
        prev: Some(prev),
        _not_send: PhantomData,
    }
}

/// Restores the previously active context when dropped.
pub struct AmbientGuard {
    prev: Option<Active>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            ACTIVE.with(|a| *a.borrow_mut() = prev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;

    struct View {
        owner: Option<Arc<MemorySession>>,
    }

    impl UnitOfWork for View {
        fn session(&self) -> Option<Arc<dyn LockableSession>> {
            self.owner
                .clone()
                .map(|s| s as Arc<dyn LockableSession>)
        }
    }

    fn is_same(active: &Arc<dyn LockableSession>, session: &Arc<MemorySession>) -> bool {
        Arc::as_ptr(active) as *const u8 == Arc::as_ptr(session) as *const u8
    }

    #[test]
    fn session_visible_inside_scope_only() {
        assert!(current_session().is_none());
        {
            let _guard = activate_session(Arc::new(MemorySession::new()));
            assert!(current_session().is_some());
            assert!(current_unit().is_none());
        }
        assert!(current_session().is_none());
    }

    #[test]
    fn activating_a_unit_also_activates_its_session() {
        let owner = Arc::new(MemorySession::new());
        let unit = Arc::new(View {
            owner: Some(owner.clone()),
        });

        let _guard = activate_unit(unit);
        assert!(current_unit().is_some());
        let active = current_session().unwrap();
        assert!(is_same(&active, &owner));
    }

    #[test]
    fn nested_scopes_restore_in_order() {
        let outer = Arc::new(MemorySession::new());
        let _outer_guard = activate_session(outer.clone());
        {
            let _inner_guard = activate_session(Arc::new(MemorySession::new()));
            let active = current_session().unwrap();
            assert!(!is_same(&active, &outer));
        }
        let active = current_session().unwrap();
        assert!(is_same(&active, &outer));
    }

    #[test]
    fn a_unit_without_a_session_leaves_the_session_clear() {
        let _guard = activate_unit(Arc::new(View { owner: None }));
        assert!(current_unit().is_some());
        assert!(current_session().is_none());
    }

    #[test]
    fn other_threads_see_nothing() {
        let _guard = activate_session(Arc::new(MemorySession::new()));
        let seen = std::thread::spawn(|| current_session().is_some())
            .join()
            .unwrap();
        assert!(!seen);
    }
}
