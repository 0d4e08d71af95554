use serde::Serialize;

/// Structured trace events emitted across all Replikit crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    KeyIssued {
        cluster_key: String,
    },
    KeyAdopted {
        cluster_key: String,
    },
    CapsuleReplay {
        descriptors: usize,
        locked: bool,
        lock_synthesized: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "rk_event");
    }
}
