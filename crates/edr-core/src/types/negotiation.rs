//! Negotiation requests and the handles returned when they are dispatched

use super::callback::CallbackAddress;
use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Usage policy attached to an offer, evaluated elsewhere
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy(pub serde_json::Value);

/// Usage terms proposed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOffer {
    /// Offer identifier
    pub id: String,
    /// Asset the offer covers
    pub asset_id: String,
    /// Participant id of the provider, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Opaque usage policy
    #[serde(default)]
    pub policy: Policy,
}

impl ContractOffer {
    /// Create an offer with an empty policy
    pub fn new(id: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            asset_id: asset_id.into(),
            provider_id: None,
            policy: Policy::default(),
        }
    }

    /// Set the provider participant id
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Set the usage policy
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }
}

/// Request to negotiate a contract and an EDR with a remote party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateEdrRequest {
    /// Negotiation protocol dialect
    pub protocol: String,
    /// Network address of the counter-party
    pub counter_party_address: String,
    /// Where to notify on lifecycle events
    #[serde(default)]
    pub callback_addresses: Vec<CallbackAddress>,
    /// Proposed usage terms
    pub offer: ContractOffer,
}

impl NegotiateEdrRequest {
    /// Create a request without callbacks
    pub fn new(
        protocol: impl Into<String>,
        counter_party_address: impl Into<String>,
        offer: ContractOffer,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            counter_party_address: counter_party_address.into(),
            callback_addresses: Vec::new(),
            offer,
        }
    }

    /// Add a callback address
    pub fn with_callback(mut self, callback: CallbackAddress) -> Self {
        self.callback_addresses.push(callback);
        self
    }

    /// Check required fields, reporting every violation at once
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        let required = [
            ("protocol", &self.protocol),
            ("counterPartyAddress", &self.counter_party_address),
            ("offer.id", &self.offer.id),
            ("offer.assetId", &self.offer.asset_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                violations.push(format!("{field} must not be empty"));
            }
        }
        for (index, callback) in self.callback_addresses.iter().enumerate() {
            if callback.uri.trim().is_empty() {
                violations.push(format!("callbackAddresses[{index}].uri must not be empty"));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}

/// Local view of a negotiation's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationState {
    /// Accepted for processing, outcome pending
    Requested,
    /// Remote negotiation succeeded
    Finalized,
    /// Remote negotiation ended without agreement
    Terminated,
}

impl NegotiationState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Terminated)
    }
}

/// Handle to a negotiation accepted for processing
///
/// Proves dispatch only. The eventual capability reaches the cache through the
/// negotiation pipeline, never through this handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractNegotiation {
    /// Negotiation identifier
    pub id: String,
    /// Participant id of the counter-party
    pub counter_party_id: String,
    /// Network address of the counter-party
    pub counter_party_address: String,
    /// Negotiation protocol dialect
    pub protocol: String,
    /// Asset being negotiated
    pub asset_id: String,
    /// Local lifecycle state
    pub state: NegotiationState,
}

impl ContractNegotiation {
    /// Mint a pending negotiation for a request
    pub fn requested(request: &NegotiateEdrRequest) -> Self {
        let counter_party_id = request
            .offer
            .provider_id
            .clone()
            .unwrap_or_else(|| request.counter_party_address.clone());
        Self {
            id: Uuid::new_v4().to_string(),
            counter_party_id,
            counter_party_address: request.counter_party_address.clone(),
            protocol: request.protocol.clone(),
            asset_id: request.offer.asset_id.clone(),
            state: NegotiationState::Requested,
        }
    }

    /// Move to a new state
    pub fn transition_to(&mut self, state: NegotiationState) {
        self.state = state;
    }
}
