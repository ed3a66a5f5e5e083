//! Callback addresses and the lifecycle events delivered to them

use super::negotiation::{ContractNegotiation, NegotiationState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where to notify interested parties about negotiation lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackAddress {
    /// Target URI
    pub uri: String,
    /// Subscribed event names or dot-separated prefixes of them
    #[serde(default)]
    pub events: BTreeSet<String>,
    /// Whether delivery must succeed before the pipeline proceeds
    #[serde(default)]
    pub transactional: bool,
}

impl CallbackAddress {
    /// Create a callback address subscribed to the given events
    pub fn new<I, S>(uri: impl Into<String>, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uri: uri.into(),
            events: events.into_iter().map(Into::into).collect(),
            transactional: false,
        }
    }

    /// Check whether this address wants to hear about `kind`
    ///
    /// A subscription matches when it equals the event name or is a prefix of it ending
    /// on a segment boundary, so `edr.negotiation` matches `edr.negotiation.finalized`
    /// but `edr.nego` does not.
    pub fn is_subscribed_to(&self, kind: EdrEventKind) -> bool {
        let name = kind.as_str();
        self.events.iter().any(|event| {
            name == event
                || name
                    .strip_prefix(event.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Lifecycle events emitted by the negotiation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdrEventKind {
    /// Negotiation accepted and handed to the pipeline
    #[serde(rename = "edr.negotiation.initiated")]
    Initiated,
    /// Capability stored in the cache
    #[serde(rename = "edr.negotiation.finalized")]
    Finalized,
    /// Capability could not be stored because a live one already exists
    #[serde(rename = "edr.negotiation.conflict")]
    Conflict,
    /// Remote negotiation ended without a capability
    #[serde(rename = "edr.negotiation.terminated")]
    Terminated,
    /// Capability could not be stored for an infrastructure reason
    #[serde(rename = "edr.negotiation.failed")]
    Failed,
}

impl EdrEventKind {
    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "edr.negotiation.initiated",
            Self::Finalized => "edr.negotiation.finalized",
            Self::Conflict => "edr.negotiation.conflict",
            Self::Terminated => "edr.negotiation.terminated",
            Self::Failed => "edr.negotiation.failed",
        }
    }
}

impl fmt::Display for EdrEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered to callback addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdrEvent {
    /// What happened
    pub kind: EdrEventKind,
    /// Negotiation the event belongs to
    pub negotiation_id: String,
    /// Local state of the negotiation when the event was raised
    pub negotiation_state: NegotiationState,
    /// Transfer process the capability is bound to, once known
    pub transfer_process_id: Option<String>,
    /// Failure or conflict detail
    pub message: Option<String>,
}

impl EdrEvent {
    /// Create an event for the negotiation's current state, without transfer binding or detail
    pub fn new(kind: EdrEventKind, negotiation: &ContractNegotiation) -> Self {
        Self {
            kind,
            negotiation_id: negotiation.id.clone(),
            negotiation_state: negotiation.state,
            transfer_process_id: None,
            message: None,
        }
    }

    /// Attach the transfer process id
    pub fn with_transfer_process_id(mut self, transfer_process_id: impl Into<String>) -> Self {
        self.transfer_process_id = Some(transfer_process_id.into());
        self
    }

    /// Attach a detail message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
