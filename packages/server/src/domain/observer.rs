//! Structured observability for the hub.
//!
//! Usecases report what happened as [`HubSignal`]s to an injected
//! [`HubObserver`]; how signals are rendered (tracing, an append-only log,
//! metrics) is decided by the infrastructure layer.

/// Why an inbound frame from a live connection was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    RateLimited,
    Malformed,
    Invalid,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::RateLimited => "rate_limited",
            DropReason::Malformed => "malformed",
            DropReason::Invalid => "invalid",
        }
    }
}

/// Something noteworthy that happened inside the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubSignal {
    Connected {
        id: String,
        name: String,
        remote_address: String,
    },
    /// An older session was closed because a newer one took its display name
    Replaced { id: String, name: String },
    Disconnected { id: String, name: String },
    Renamed { id: String, from: String, to: String },
    Delivered {
        kind: &'static str,
        sender: Option<String>,
        recipients: usize,
    },
    /// A broadcast received over HTTP rather than a live connection
    HttpBroadcast {
        remote_address: String,
        kind: &'static str,
        sent: usize,
    },
    ReactionRelayed { from: String, to: String },
    ReactionUnresolved { target_user_id: String },
    FrameDropped { id: String, reason: DropReason },
    AuthRejected {
        remote_address: String,
        reason: String,
    },
    TokenIssued { prefix: String, owner_id: String },
    TokenRevoked { prefix: String, closed: usize },
    OwnerReassigned {
        prefix: String,
        owner_id: String,
        closed: usize,
    },
}

/// Receiver of [`HubSignal`]s.
pub trait HubObserver: Send + Sync {
    fn observe(&self, signal: &HubSignal);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl HubObserver for NoopObserver {
    fn observe(&self, _signal: &HubSignal) {}
}
