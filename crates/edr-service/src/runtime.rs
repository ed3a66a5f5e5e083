//! Runtime assembly
//!
//! Wires the cache, the orchestrator and the façade from an [`EdrConfig`]. The
//! negotiation pipeline and the callback notifier are external collaborators supplied
//! by the host.

use crate::config::{ConfigError, EdrConfig, TrustContextSource};
use crate::service::{EdrService, EdrServiceImpl};
use edr_core::{
    CallbackNotifier, ContextDocument, EdrCache, NegotiationPipeline, TrustContextRegistry,
};
use edr_negotiation::EdrNegotiationManager;
use edr_store::InMemoryEdrCache;
use std::sync::Arc;

/// Assembled EDR components
pub struct EdrRuntime {
    service: Arc<EdrServiceImpl>,
    manager: Arc<EdrNegotiationManager>,
    trust_contexts: TrustContextRegistry,
}

impl EdrRuntime {
    /// Assemble over an in-memory cache; must run inside a tokio runtime
    pub fn from_config(
        config: &EdrConfig,
        pipeline: Arc<dyn NegotiationPipeline>,
        notifier: Arc<dyn CallbackNotifier>,
    ) -> Result<Self, ConfigError> {
        Self::with_cache(config, Arc::new(InMemoryEdrCache::new()), pipeline, notifier)
    }

    /// Assemble over a caller-supplied cache
    pub fn with_cache(
        config: &EdrConfig,
        cache: Arc<dyn EdrCache>,
        pipeline: Arc<dyn NegotiationPipeline>,
        notifier: Arc<dyn CallbackNotifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let trust_contexts = load_trust_contexts(&config.trust_contexts)?;

        let manager = Arc::new(EdrNegotiationManager::start(
            &config.negotiation,
            pipeline,
            Arc::clone(&cache),
            notifier,
        ));
        let service = Arc::new(
            EdrServiceImpl::new(manager.clone(), cache)
                .with_max_query_limit(config.query.max_limit),
        );

        tracing::info!(
            trust_contexts = trust_contexts.len(),
            "EDR runtime assembled"
        );

        Ok(Self {
            service,
            manager,
            trust_contexts,
        })
    }

    /// The façade
    pub fn service(&self) -> Arc<dyn EdrService> {
        self.service.clone()
    }

    /// Registered trust-context documents
    pub fn trust_contexts(&self) -> &TrustContextRegistry {
        &self.trust_contexts
    }

    /// Stop accepting negotiations and wait for in-flight ones
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

fn load_trust_contexts(sources: &[TrustContextSource]) -> Result<TrustContextRegistry, ConfigError> {
    let documents = sources
        .iter()
        .map(|source| {
            let raw = std::fs::read_to_string(&source.path).map_err(|e| ConfigError::Io {
                path: source.path.clone(),
                message: e.to_string(),
            })?;
            Ok(ContextDocument::new(
                source.url.clone(),
                source.version.clone(),
                raw,
            ))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    Ok(TrustContextRegistry::from_documents(documents)?)
}
