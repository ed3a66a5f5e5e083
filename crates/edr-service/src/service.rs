//! EDR service façade
//!
//! Composes the orchestrator (write path for new capabilities) with the cache
//! (read, delete and query path for existing ones). Every outcome is a
//! [`ServiceResult`]; lower-layer failures are translated through the fixed mapping in
//! [`edr_core::result`].

use async_trait::async_trait;
use edr_core::{
    ContractNegotiation, EdrCache, EdrManager, EndpointDataReference, NegotiateEdrRequest,
    QuerySpec, ServiceFailure, ServiceFailureReason, ServiceResult,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::instrument;

/// Largest page accepted when no limit is configured
pub const DEFAULT_MAX_QUERY_LIMIT: usize = 1000;

/// Single entry point for requesting, looking up, listing and revoking EDRs
#[async_trait]
pub trait EdrService: Send + Sync {
    /// Start a negotiation; success means "accepted for processing", not "capability exists"
    async fn initiate_edr_negotiation(
        &self,
        request: NegotiateEdrRequest,
    ) -> ServiceResult<ContractNegotiation>;

    /// Look up the capability bound to a transfer process
    async fn find_by_transfer_process_id(
        &self,
        transfer_process_id: &str,
    ) -> ServiceResult<EndpointDataReference>;

    /// Revoke the capability bound to a transfer process
    async fn delete_by_transfer_process_id(&self, transfer_process_id: &str) -> ServiceResult<()>;

    /// List capabilities matching a query; no match is an empty list
    async fn find_by(&self, query: &QuerySpec) -> ServiceResult<Vec<EndpointDataReference>>;
}

/// Default [`EdrService`] over an orchestrator and a cache
pub struct EdrServiceImpl {
    manager: Arc<dyn EdrManager>,
    cache: Arc<dyn EdrCache>,
    max_query_limit: usize,
}

impl EdrServiceImpl {
    /// Create a service with the default query page limit
    pub fn new(manager: Arc<dyn EdrManager>, cache: Arc<dyn EdrCache>) -> Self {
        Self {
            manager,
            cache,
            max_query_limit: DEFAULT_MAX_QUERY_LIMIT,
        }
    }

    /// Override the largest accepted query page
    pub fn with_max_query_limit(mut self, max_query_limit: usize) -> Self {
        self.max_query_limit = max_query_limit;
        self
    }
}

#[async_trait]
impl EdrService for EdrServiceImpl {
    #[instrument(skip(self, request), fields(protocol = %request.protocol, asset_id = %request.offer.asset_id))]
    async fn initiate_edr_negotiation(
        &self,
        request: NegotiateEdrRequest,
    ) -> ServiceResult<ContractNegotiation> {
        if let Err(e) = request.validate() {
            tracing::debug!(error = %e, "Rejected EDR negotiation request");
            return Err(ServiceFailure::with_messages(
                ServiceFailureReason::BadRequest,
                e.into_violations(),
            ));
        }

        self.manager
            .initiate_edr_negotiation(request)
            .await
            .map_err(|failure| {
                tracing::warn!(error = %failure, "EDR negotiation dispatch failed");
                ServiceFailure::from_dispatch(failure)
            })
    }

    #[instrument(skip(self))]
    async fn find_by_transfer_process_id(
        &self,
        transfer_process_id: &str,
    ) -> ServiceResult<EndpointDataReference> {
        self.cache
            .resolve_reference(transfer_process_id)
            .await?
            .ok_or_else(|| {
                ServiceFailure::not_found(format!(
                    "EDR for transfer process {transfer_process_id} not found"
                ))
            })
    }

    #[instrument(skip(self))]
    async fn delete_by_transfer_process_id(&self, transfer_process_id: &str) -> ServiceResult<()> {
        self.cache
            .delete_by_transfer_process_id(transfer_process_id)
            .await
            .map_err(ServiceFailure::from)
    }

    #[instrument(skip(self, query), fields(criteria = query.filter_expression.len(), limit = query.limit))]
    async fn find_by(&self, query: &QuerySpec) -> ServiceResult<Vec<EndpointDataReference>> {
        query
            .compile(self.max_query_limit)
            .map_err(|e| ServiceFailure::bad_request(e.to_string()))?;

        let entries = self.cache.query_for_entries(query).await?;
        Ok(entries.collect().await)
    }
}
