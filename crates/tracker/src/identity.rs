//! Cluster-key binding between the client carrier and the server session.
//!
//! Every request passes through [`ensure_bound`]: the first request of a new
//! session mints a key and emits it through the carrier; a request whose
//! session was rebuilt on another replica adopts the key the client already
//! carries; everything else is a no-op.  An existing key always wins over
//! regeneration so one client never splits across two logical sessions.

use rk_domain::{Result, TraceEvent};
use uuid::Uuid;

use crate::carrier::{CarrierSink, CarrierSource};
use crate::current_key::CLUSTER_KEY;
use crate::session::SessionAttributes;

/// Bind the cluster key for this request, minting one if needed.
///
/// Exactly one of three branches runs:
/// 1. no inbound carrier value — mint a key, store it on the session, emit
///    it through the sink;
/// 2. carrier value present but no session attribute — adopt the carrier
///    value (the session was rebuilt on this replica and the client already
///    has a key);
/// 3. both present — nothing to do, whatever the values are.
///
/// The only error is the session store rejecting the attribute write;
/// nothing is emitted in that case.  Calling again with the same state is a
/// no-op.
pub fn ensure_bound(
    session: &dyn SessionAttributes,
    request: &dyn CarrierSource,
    response: &mut dyn CarrierSink,
) -> Result<()> {
    match request.value_of(CLUSTER_KEY) {
        None => {
            let key = Uuid::new_v4().to_string();
            session.set_attribute(CLUSTER_KEY, &key)?;
            response.emit(CLUSTER_KEY, &key);
            TraceEvent::KeyIssued { cluster_key: key }.emit();
        }
        Some(key) if session.attribute(CLUSTER_KEY).is_none() => {
            session.set_attribute(CLUSTER_KEY, &key)?;
            TraceEvent::KeyAdopted { cluster_key: key }.emit();
        }
        Some(_) => {}
    }
    Ok(())
}

/// The cluster key stored on the session, if it was ever bound.
pub fn current_token(session: &dyn SessionAttributes) -> Option<String> {
    session.attribute(CLUSTER_KEY)
}

/// The cluster key the client sent with this request, if any.
///
/// Usable by components that only see the request, not the session.
pub fn carrier_value(request: &dyn CarrierSource) -> Option<String> {
    request.value_of(CLUSTER_KEY)
}
