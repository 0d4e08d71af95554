//! Well-known cluster-key name and the per-request current key.
//!
//! Components that only see the request (not the session) learn the active
//! cluster key from a thread-local slot installed for the duration of
//! request processing.

use std::cell::RefCell;
use std::marker::PhantomData;

/// Name used for both the carrier entry and the server-session attribute.
/// Storing the same value under both is what joins the client-visible
/// carrier to the server-side session.
pub const CLUSTER_KEY: &str = "cluster-key";

thread_local! {
    static CURRENT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Install `key` as the current cluster key for the calling thread.
///
/// The previous value is restored when the returned guard drops, on every
/// exit path.
pub fn enter(key: &str) -> KeyScope {
    let prev = CURRENT.with(|c| c.replace(Some(key.to_owned())));
    KeyScope {
        prev,
        _not_send: PhantomData,
    }
}

/// The cluster key of the request currently being processed on this thread.
pub fn get() -> Option<String> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Scope guard restoring the previously current key.
pub struct KeyScope {
    prev: Option<String>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for KeyScope {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT.with(|c| *c.borrow_mut() = prev);
    }
}
