//! Client-visible carrier boundary.
//!
//! The carrier is the transport slot that round-trips the cluster key between
//! client and server (an HTTP cookie in most deployments).  The wire format
//! is the host's concern; this crate only reads the first matching inbound
//! entry and emits at most one outbound entry per session lifetime.

use std::collections::HashMap;

/// Read-only view of the carrier values a client sent with a request.
pub trait CarrierSource {
    /// The first carrier entry named `name`, if any.
    fn value_of(&self, name: &str) -> Option<String>;
}

/// Sink for emitting a carrier value back to the client.
pub trait CarrierSink {
    fn emit(&mut self, name: &str, value: &str);
}

impl CarrierSource for Vec<(String, String)> {
    fn value_of(&self, name: &str) -> Option<String> {
        self.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
    }
}

impl CarrierSource for HashMap<String, String> {
    fn value_of(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl CarrierSink for Vec<(String, String)> {
    fn emit(&mut self, name: &str, value: &str) {
        self.push((name.to_owned(), value.to_owned()));
    }
}
