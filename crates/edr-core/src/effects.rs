//! Collaborator traits
//!
//! The façade and the orchestrator depend only on these seams, so every collaborator can
//! be swapped for an in-memory fake in tests.

use crate::result::{DispatchResult, StoreResult};
use crate::types::{
    CallbackAddress, ContractNegotiation, EdrEvent, EndpointDataReference, NegotiateEdrRequest,
    TransferProcessId,
};
use crate::QuerySpec;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy sequence of cached capabilities
pub type EdrStream = BoxStream<'static, EndpointDataReference>;

/// Durable store of capabilities keyed by transfer process id
///
/// Implementations must be safe for any number of concurrent callers. `save` enforces
/// uniqueness at the storage boundary: the existence check and the insert are one atomic
/// step.
#[async_trait]
pub trait EdrCache: Send + Sync {
    /// Look up the capability bound to a transfer process; absence is `Ok(None)`
    async fn resolve_reference(
        &self,
        transfer_process_id: &str,
    ) -> StoreResult<Option<EndpointDataReference>>;

    /// Store a capability, failing with `AlreadyExists` if one is live for the key
    async fn save(
        &self,
        transfer_process_id: TransferProcessId,
        edr: EndpointDataReference,
    ) -> StoreResult<()>;

    /// Remove the capability bound to a transfer process, failing with `NotFound` if absent
    async fn delete_by_transfer_process_id(&self, transfer_process_id: &str) -> StoreResult<()>;

    /// Stream the capabilities matching a query over a point-in-time snapshot
    async fn query_for_entries(&self, query: &QuerySpec) -> StoreResult<EdrStream>;
}

/// Accepts negotiation requests into the asynchronous pipeline
#[async_trait]
pub trait EdrManager: Send + Sync {
    /// Validate and enqueue a negotiation, returning as soon as it is accepted
    async fn initiate_edr_negotiation(
        &self,
        request: NegotiateEdrRequest,
    ) -> DispatchResult<ContractNegotiation>;
}

/// Terminal outcome of a remote negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// Agreement reached and a capability issued for the transfer
    Finalized {
        /// Transfer process the capability is bound to
        transfer_process_id: TransferProcessId,
        /// Issued capability
        edr: EndpointDataReference,
    },
    /// Negotiation ended without a capability
    Terminated {
        /// Why the counter-party or the protocol gave up
        reason: String,
    },
}

/// Runs the remote negotiation protocol (wire protocol out of scope)
#[async_trait]
pub trait NegotiationPipeline: Send + Sync {
    /// Drive a negotiation to a terminal outcome
    async fn negotiate(
        &self,
        negotiation: &ContractNegotiation,
        request: &NegotiateEdrRequest,
    ) -> NegotiationOutcome;
}

/// Delivers lifecycle events to callback addresses (transport out of scope)
#[async_trait]
pub trait CallbackNotifier: Send + Sync {
    /// Deliver one event to one address
    async fn notify(&self, address: &CallbackAddress, event: &EdrEvent);
}
