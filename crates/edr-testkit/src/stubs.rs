//! Stubbed collaborators with scripted responses
//!
//! Each stub answers with whatever response it was configured with and records the calls
//! it received, so façade tests can assert both the translation of a response and the
//! fact that a collaborator was (or was not) contacted.

use async_trait::async_trait;
use edr_core::{
    ContractNegotiation, DispatchResult, EdrCache, EdrManager, EdrStream, EndpointDataReference,
    NegotiateEdrRequest, QuerySpec, StoreResult, TransferProcessId,
};
use futures::StreamExt;
use parking_lot::Mutex;

/// Orchestrator stub
pub struct StubEdrManager {
    response: DispatchResult<ContractNegotiation>,
    requests: Mutex<Vec<NegotiateEdrRequest>>,
}

impl StubEdrManager {
    /// Answer every dispatch with `response`
    pub fn returning(response: DispatchResult<ContractNegotiation>) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<NegotiateEdrRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl EdrManager for StubEdrManager {
    async fn initiate_edr_negotiation(
        &self,
        request: NegotiateEdrRequest,
    ) -> DispatchResult<ContractNegotiation> {
        self.requests.lock().push(request);
        self.response.clone()
    }
}

/// A recorded cache call
#[derive(Debug, Clone, PartialEq)]
pub enum CacheCall {
    /// `resolve_reference`
    Resolve(String),
    /// `save`
    Save(String),
    /// `delete_by_transfer_process_id`
    Delete(String),
    /// `query_for_entries`
    Query(QuerySpec),
}

/// Cache stub; unconfigured operations behave like an empty cache
pub struct StubEdrCache {
    resolve: StoreResult<Option<EndpointDataReference>>,
    save: StoreResult<()>,
    delete: StoreResult<()>,
    query: StoreResult<Vec<EndpointDataReference>>,
    calls: Mutex<Vec<CacheCall>>,
}

impl Default for StubEdrCache {
    fn default() -> Self {
        Self {
            resolve: Ok(None),
            save: Ok(()),
            delete: Err(edr_core::StoreFailure::not_found("empty stub")),
            query: Ok(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubEdrCache {
    /// Create a stub behaving like an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `resolve_reference`
    pub fn with_resolve(mut self, response: StoreResult<Option<EndpointDataReference>>) -> Self {
        self.resolve = response;
        self
    }

    /// Script `save`
    pub fn with_save(mut self, response: StoreResult<()>) -> Self {
        self.save = response;
        self
    }

    /// Script `delete_by_transfer_process_id`
    pub fn with_delete(mut self, response: StoreResult<()>) -> Self {
        self.delete = response;
        self
    }

    /// Script `query_for_entries`
    pub fn with_query(mut self, response: StoreResult<Vec<EndpointDataReference>>) -> Self {
        self.query = response;
        self
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl EdrCache for StubEdrCache {
    async fn resolve_reference(
        &self,
        transfer_process_id: &str,
    ) -> StoreResult<Option<EndpointDataReference>> {
        self.calls
            .lock()
            .push(CacheCall::Resolve(transfer_process_id.to_string()));
        self.resolve.clone()
    }

    async fn save(
        &self,
        transfer_process_id: TransferProcessId,
        _edr: EndpointDataReference,
    ) -> StoreResult<()> {
        self.calls.lock().push(CacheCall::Save(transfer_process_id));
        self.save.clone()
    }

    async fn delete_by_transfer_process_id(&self, transfer_process_id: &str) -> StoreResult<()> {
        self.calls
            .lock()
            .push(CacheCall::Delete(transfer_process_id.to_string()));
        self.delete.clone()
    }

    async fn query_for_entries(&self, query: &QuerySpec) -> StoreResult<EdrStream> {
        self.calls.lock().push(CacheCall::Query(query.clone()));
        self.query
            .clone()
            .map(|entries| futures::stream::iter(entries).boxed())
    }
}
