//! In-memory EDR cache

use crate::predicate;
use async_trait::async_trait;
use edr_core::{
    EdrCache, EdrStream, EndpointDataReference, QuerySpec, StoreFailure, StoreResult,
    TransferProcessId,
};
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory cache keyed by transfer process id
///
/// A single lock guards the map. `save` checks and inserts under one write guard,
/// so for any key concurrent writers serialize and exactly one insert wins. Queries
/// clone a snapshot under a read guard and release it before the caller consumes
/// the stream.
#[derive(Clone, Default)]
pub struct InMemoryEdrCache {
    entries: Arc<RwLock<BTreeMap<TransferProcessId, EndpointDataReference>>>,
}

impl InMemoryEdrCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn snapshot(&self) -> Vec<(TransferProcessId, EndpointDataReference)> {
        self.entries
            .read()
            .iter()
            .map(|(tp, edr)| (tp.clone(), edr.clone()))
            .collect()
    }
}

#[async_trait]
impl EdrCache for InMemoryEdrCache {
    async fn resolve_reference(
        &self,
        transfer_process_id: &str,
    ) -> StoreResult<Option<EndpointDataReference>> {
        Ok(self.entries.read().get(transfer_process_id).cloned())
    }

    async fn save(
        &self,
        transfer_process_id: TransferProcessId,
        edr: EndpointDataReference,
    ) -> StoreResult<()> {
        let mut entries = self.entries.write();
        match entries.entry(transfer_process_id) {
            Entry::Occupied(occupied) => {
                tracing::debug!(
                    transfer_process_id = %occupied.key(),
                    "EDR already cached for transfer process"
                );
                Err(StoreFailure::already_exists(format!(
                    "EDR for transfer process {} already exists",
                    occupied.key()
                )))
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(
                    transfer_process_id = %vacant.key(),
                    edr_id = %edr.id,
                    "Caching EDR"
                );
                vacant.insert(edr);
                Ok(())
            }
        }
    }

    async fn delete_by_transfer_process_id(&self, transfer_process_id: &str) -> StoreResult<()> {
        match self.entries.write().remove(transfer_process_id) {
            Some(_) => {
                tracing::debug!(transfer_process_id, "Removed cached EDR");
                Ok(())
            }
            None => Err(StoreFailure::not_found(format!(
                "EDR for transfer process {transfer_process_id} not found"
            ))),
        }
    }

    async fn query_for_entries(&self, query: &QuerySpec) -> StoreResult<EdrStream> {
        let compiled = query
            .compile(usize::MAX)
            .map_err(|e| StoreFailure::generic_error(e.to_string()))?;
        let snapshot = self.snapshot();
        Ok(futures::stream::iter(predicate::evaluate(compiled, snapshot)).boxed())
    }
}
