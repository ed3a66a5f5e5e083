//! Canonical test data

use edr_core::{
    CallbackAddress, ContextDocument, ContractNegotiation, ContractOffer, EndpointDataReference,
    NegotiateEdrRequest, NegotiationState, Policy,
};
use std::collections::BTreeSet;

/// URL of the W3C verifiable-credentials v2 context
pub const W3C_VC_CONTEXT_URL: &str = "https://www.w3.org/ns/credentials/v2";

/// Local copy of the W3C verifiable-credentials v2 context
pub const W3C_VC_CONTEXT: &str = include_str!("../fixtures/w3c_vc_v2.jsonld");

/// The W3C VC context as a trust-context document
pub fn w3c_vc_context() -> ContextDocument {
    ContextDocument::new(W3C_VC_CONTEXT_URL, Some("2.0".to_string()), W3C_VC_CONTEXT)
}

/// A valid request with one callback subscribed to every EDR event
pub fn negotiate_edr_request() -> NegotiateEdrRequest {
    NegotiateEdrRequest {
        protocol: "dataspace-protocol-http".to_string(),
        counter_party_address: "http://test".to_string(),
        callback_addresses: vec![CallbackAddress {
            uri: "http://callback".to_string(),
            events: BTreeSet::from(["edr.negotiation".to_string()]),
            transactional: false,
        }],
        offer: ContractOffer::new("id", "assetId")
            .with_provider_id("provider")
            .with_policy(Policy(serde_json::json!({
                "@type": "Set",
                "permission": [{"action": "use"}]
            }))),
    }
}

/// A pending negotiation as returned by a successful dispatch
pub fn contract_negotiation() -> ContractNegotiation {
    ContractNegotiation {
        id: "id".to_string(),
        counter_party_id: "provider".to_string(),
        counter_party_address: "http://test".to_string(),
        protocol: "dataspace-protocol-http".to_string(),
        asset_id: "assetId".to_string(),
        state: NegotiationState::Requested,
    }
}

/// A capability with credential material and one extension property
pub fn endpoint_data_reference(id: &str) -> EndpointDataReference {
    EndpointDataReference::new(id, "test-contract", "http://test/data")
        .with_auth("Authorization", format!("token-{id}"))
        .with_property("cid", "test-contract")
}
