//! Negotiation orchestrator
//!
//! `initiate_edr_negotiation` validates a request, mints a handle and pushes the job onto
//! a bounded queue. A worker task owned by the manager drains the queue, drives each
//! negotiation through the [`NegotiationPipeline`] and is the only writer that stores
//! the resulting capability in the [`EdrCache`].
//!
//! Dispatch never consults the cache. Two negotiations for the same transfer are both
//! accepted; the second surfaces as `edr.negotiation.conflict` when its store fails.

use crate::config::NegotiationConfig;
use crate::notifier::notify_subscribers;
use async_trait::async_trait;
use edr_core::{
    CallbackNotifier, ContractNegotiation, DispatchFailure, DispatchResult, EdrCache, EdrEvent,
    EdrEventKind, EdrManager, NegotiateEdrRequest, NegotiationOutcome, NegotiationPipeline,
    NegotiationState, StoreFailureReason,
};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

struct NegotiationJob {
    negotiation: ContractNegotiation,
    request: NegotiateEdrRequest,
}

/// Collaborators shared by every in-flight negotiation
struct WorkerContext {
    pipeline: Arc<dyn NegotiationPipeline>,
    cache: Arc<dyn EdrCache>,
    notifier: Arc<dyn CallbackNotifier>,
}

/// Asynchronous negotiation orchestrator
pub struct EdrNegotiationManager {
    queue: Mutex<Option<mpsc::Sender<NegotiationJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EdrNegotiationManager {
    /// Spawn the worker on the current tokio runtime
    pub fn start(
        config: &NegotiationConfig,
        pipeline: Arc<dyn NegotiationPipeline>,
        cache: Arc<dyn EdrCache>,
        notifier: Arc<dyn CallbackNotifier>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let context = Arc::new(WorkerContext {
            pipeline,
            cache,
            notifier,
        });
        let worker = tokio::spawn(run_worker(receiver, context, config.max_concurrent.max(1)));

        tracing::debug!(
            queue_capacity = config.queue_capacity,
            max_concurrent = config.max_concurrent,
            "Started EDR negotiation worker"
        );

        Self {
            queue: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Stop accepting negotiations and wait for in-flight ones to reach a terminal state
    pub async fn shutdown(&self) {
        drop(self.queue.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "EDR negotiation worker panicked");
            }
        }
    }
}

#[async_trait]
impl EdrManager for EdrNegotiationManager {
    async fn initiate_edr_negotiation(
        &self,
        request: NegotiateEdrRequest,
    ) -> DispatchResult<ContractNegotiation> {
        request
            .validate()
            .map_err(|e| DispatchFailure::fatal(e.into_violations()))?;

        let sender = self
            .queue
            .lock()
            .clone()
            .ok_or_else(|| DispatchFailure::fatal(vec!["EDR negotiation manager is shut down".into()]))?;

        let negotiation = ContractNegotiation::requested(&request);
        let job = NegotiationJob {
            negotiation: negotiation.clone(),
            request,
        };

        match sender.try_send(job) {
            Ok(()) => {
                tracing::debug!(
                    negotiation_id = %negotiation.id,
                    counter_party = %negotiation.counter_party_address,
                    "EDR negotiation dispatched"
                );
                Ok(negotiation)
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(negotiation_id = %negotiation.id, "EDR negotiation queue is full");
                Err(DispatchFailure::retry("EDR negotiation queue is full"))
            }
            Err(TrySendError::Closed(_)) => Err(DispatchFailure::fatal(vec![
                "EDR negotiation worker has stopped".into(),
            ])),
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<NegotiationJob>,
    context: Arc<WorkerContext>,
    max_concurrent: usize,
) {
    let permits = Arc::new(Semaphore::new(max_concurrent));
    let mut in_flight = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        while let Some(result) = in_flight.try_join_next() {
            log_join_error(result);
        }

        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let context = Arc::clone(&context);
        in_flight.spawn(async move {
            let _permit = permit;
            context.process(job).await;
        });
    }

    while let Some(result) = in_flight.join_next().await {
        log_join_error(result);
    }
    tracing::debug!("EDR negotiation worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "EDR negotiation task failed");
    }
}

impl WorkerContext {
    async fn process(&self, job: NegotiationJob) {
        let NegotiationJob {
            mut negotiation,
            request,
        } = job;
        let callbacks = request.callback_addresses.as_slice();

        self.emit(callbacks, EdrEvent::new(EdrEventKind::Initiated, &negotiation))
            .await;

        let outcome = AssertUnwindSafe(self.pipeline.negotiate(&negotiation, &request))
            .catch_unwind()
            .await;

        let event = match outcome {
            Ok(NegotiationOutcome::Finalized {
                transfer_process_id,
                edr,
            }) => {
                negotiation.transition_to(NegotiationState::Finalized);
                let event = match self.cache.save(transfer_process_id.clone(), edr).await {
                    Ok(()) => {
                        tracing::info!(
                            negotiation_id = %negotiation.id,
                            transfer_process_id = %transfer_process_id,
                            "EDR negotiation finalized"
                        );
                        EdrEvent::new(EdrEventKind::Finalized, &negotiation)
                    }
                    Err(failure) if failure.reason() == StoreFailureReason::AlreadyExists => {
                        tracing::warn!(
                            negotiation_id = %negotiation.id,
                            transfer_process_id = %transfer_process_id,
                            "EDR already cached for transfer process"
                        );
                        EdrEvent::new(EdrEventKind::Conflict, &negotiation)
                            .with_message(failure.message())
                    }
                    Err(failure) => {
                        tracing::error!(
                            negotiation_id = %negotiation.id,
                            transfer_process_id = %transfer_process_id,
                            error = %failure,
                            "Failed to cache EDR"
                        );
                        EdrEvent::new(EdrEventKind::Failed, &negotiation)
                            .with_message(failure.message())
                    }
                };
                event.with_transfer_process_id(transfer_process_id)
            }
            Ok(NegotiationOutcome::Terminated { reason }) => {
                negotiation.transition_to(NegotiationState::Terminated);
                tracing::info!(
                    negotiation_id = %negotiation.id,
                    reason = %reason,
                    "EDR negotiation terminated"
                );
                EdrEvent::new(EdrEventKind::Terminated, &negotiation).with_message(reason)
            }
            Err(panic) => {
                negotiation.transition_to(NegotiationState::Terminated);
                let detail = panic_message(panic.as_ref());
                tracing::error!(
                    negotiation_id = %negotiation.id,
                    panic = %detail,
                    "EDR negotiation pipeline panicked"
                );
                EdrEvent::new(EdrEventKind::Failed, &negotiation)
                    .with_message(format!("negotiation pipeline panicked: {detail}"))
            }
        };

        self.emit(callbacks, event).await;
    }

    async fn emit(&self, callbacks: &[edr_core::CallbackAddress], event: EdrEvent) {
        notify_subscribers(self.notifier.as_ref(), callbacks, &event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use edr_core::{DispatchStatus, EndpointDataReference, StoreFailure};
    use edr_store::InMemoryEdrCache;
    use edr_testkit::{fixtures, CacheCall, RecordingNotifier, ScriptedPipeline, StubEdrCache};

    fn manager_with(
        config: &NegotiationConfig,
        pipeline: Arc<ScriptedPipeline>,
        cache: Arc<InMemoryEdrCache>,
        notifier: Arc<RecordingNotifier>,
    ) -> EdrNegotiationManager {
        EdrNegotiationManager::start(config, pipeline, cache, notifier)
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_the_pipeline() {
        let pipeline = Arc::new(ScriptedPipeline::terminating("unused"));
        let manager = manager_with(
            &NegotiationConfig::default(),
            Arc::clone(&pipeline),
            Arc::new(InMemoryEdrCache::new()),
            Arc::new(RecordingNotifier::new()),
        );

        let mut request = fixtures::negotiate_edr_request();
        request.protocol.clear();

        let failure = manager.initiate_edr_negotiation(request).await.unwrap_err();
        assert_eq!(failure.status(), DispatchStatus::FatalError);
        assert!(failure.messages()[0].contains("protocol"));

        manager.shutdown().await;
        assert_eq!(pipeline.invocations(), 0);
    }

    #[tokio::test]
    async fn dispatch_returns_before_the_pipeline_completes() {
        let pipeline = Arc::new(ScriptedPipeline::gated(NegotiationOutcome::Finalized {
            transfer_process_id: "tp-1".into(),
            edr: fixtures::endpoint_data_reference("edr-1"),
        }));
        let cache = Arc::new(InMemoryEdrCache::new());
        let manager = manager_with(
            &NegotiationConfig::default(),
            Arc::clone(&pipeline),
            Arc::clone(&cache),
            Arc::new(RecordingNotifier::new()),
        );

        let handle = manager
            .initiate_edr_negotiation(fixtures::negotiate_edr_request())
            .await
            .unwrap();
        assert_eq!(handle.state, NegotiationState::Requested);
        assert!(cache.is_empty());

        pipeline.release();
        manager.shutdown().await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn finalized_negotiation_is_cached_and_announced() {
        let edr = fixtures::endpoint_data_reference("edr-1");
        let pipeline = Arc::new(ScriptedPipeline::finalizing("tp-1", edr.clone()));
        let cache = Arc::new(InMemoryEdrCache::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = manager_with(
            &NegotiationConfig::default(),
            pipeline,
            Arc::clone(&cache),
            Arc::clone(&notifier),
        );

        let handle = manager
            .initiate_edr_negotiation(fixtures::negotiate_edr_request())
            .await
            .unwrap();
        manager.shutdown().await;

        assert_eq!(cache.resolve_reference("tp-1").await, Ok(Some(edr)));
        assert_eq!(
            notifier.kinds(),
            [EdrEventKind::Initiated, EdrEventKind::Finalized]
        );
        let events = notifier.events();
        assert!(events.iter().all(|(_, e)| e.negotiation_id == handle.id));
        assert_eq!(events[0].1.negotiation_state, NegotiationState::Requested);
        assert_eq!(events[1].1.negotiation_state, NegotiationState::Finalized);
        assert_eq!(events[1].1.transfer_process_id.as_deref(), Some("tp-1"));
    }

    #[tokio::test]
    async fn store_fault_is_reported_as_failed() {
        let cache = Arc::new(
            StubEdrCache::new().with_save(Err(StoreFailure::generic_error("disk full"))),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = EdrNegotiationManager::start(
            &NegotiationConfig::default(),
            Arc::new(ScriptedPipeline::finalizing(
                "tp-1",
                fixtures::endpoint_data_reference("edr-1"),
            )),
            cache.clone(),
            notifier.clone(),
        );

        manager
            .initiate_edr_negotiation(fixtures::negotiate_edr_request())
            .await
            .unwrap();
        manager.shutdown().await;

        assert_eq!(cache.calls(), [CacheCall::Save("tp-1".into())]);
        let (_, failed) = notifier.events().pop().unwrap();
        assert_eq!(failed.kind, EdrEventKind::Failed);
        assert_eq!(failed.transfer_process_id.as_deref(), Some("tp-1"));
        assert_eq!(failed.message.as_deref(), Some("disk full"));
    }

    struct PanickingPipeline;

    #[async_trait]
    impl NegotiationPipeline for PanickingPipeline {
        async fn negotiate(
            &self,
            _negotiation: &ContractNegotiation,
            _request: &NegotiateEdrRequest,
        ) -> NegotiationOutcome {
            panic!("counter-party sent garbage")
        }
    }

    #[tokio::test]
    async fn pipeline_panic_is_reported_as_failed() {
        let cache = Arc::new(InMemoryEdrCache::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = EdrNegotiationManager::start(
            &NegotiationConfig::default(),
            Arc::new(PanickingPipeline),
            cache.clone(),
            notifier.clone(),
        );

        manager
            .initiate_edr_negotiation(fixtures::negotiate_edr_request())
            .await
            .unwrap();
        manager.shutdown().await;

        assert!(cache.is_empty());
        assert_eq!(notifier.kinds(), [EdrEventKind::Initiated, EdrEventKind::Failed]);
        let (_, failed) = notifier.events().pop().unwrap();
        assert_eq!(failed.negotiation_state, NegotiationState::Terminated);
        assert_eq!(failed.transfer_process_id, None);
        assert!(failed
            .message
            .as_deref()
            .is_some_and(|m| m.contains("counter-party sent garbage")));
    }

    #[tokio::test]
    async fn worker_keeps_running_after_a_pipeline_panic() {
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = EdrNegotiationManager::start(
            &NegotiationConfig::default(),
            Arc::new(PanickingPipeline),
            Arc::new(InMemoryEdrCache::new()),
            notifier.clone(),
        );

        for _ in 0..3 {
            manager
                .initiate_edr_negotiation(fixtures::negotiate_edr_request())
                .await
                .unwrap();
        }
        manager.shutdown().await;

        let failed = notifier
            .kinds()
            .into_iter()
            .filter(|kind| *kind == EdrEventKind::Failed)
            .count();
        assert_eq!(failed, 3);
    }

    #[tokio::test]
    async fn second_negotiation_for_same_transfer_reports_conflict() {
        let pipeline = Arc::new(ScriptedPipeline::finalizing(
            "tp-1",
            fixtures::endpoint_data_reference("edr-new"),
        ));
        let cache = Arc::new(InMemoryEdrCache::new());
        cache
            .save("tp-1".into(), EndpointDataReference::new("edr-old", "o1", "http://peer/data"))
            .await
            .unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = manager_with(
            &NegotiationConfig::default(),
            pipeline,
            Arc::clone(&cache),
            Arc::clone(&notifier),
        );

        let dispatched = manager
            .initiate_edr_negotiation(fixtures::negotiate_edr_request())
            .await;
        assert!(dispatched.is_ok());
        manager.shutdown().await;

        let kinds = notifier.kinds();
        assert_eq!(kinds.last(), Some(&EdrEventKind::Conflict));
        let current = cache.resolve_reference("tp-1").await.unwrap().unwrap();
        assert_eq!(current.id, "edr-old");
    }

    #[tokio::test]
    async fn terminated_negotiation_stores_nothing() {
        let pipeline = Arc::new(ScriptedPipeline::terminating("policy rejected"));
        let cache = Arc::new(InMemoryEdrCache::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = manager_with(
            &NegotiationConfig::default(),
            pipeline,
            Arc::clone(&cache),
            Arc::clone(&notifier),
        );

        manager
            .initiate_edr_negotiation(fixtures::negotiate_edr_request())
            .await
            .unwrap();
        manager.shutdown().await;

        assert!(cache.is_empty());
        let events = notifier.events();
        assert_eq!(events.last().map(|(_, e)| e.kind), Some(EdrEventKind::Terminated));
        assert_eq!(
            events.last().map(|(_, e)| e.negotiation_state),
            Some(NegotiationState::Terminated)
        );
        assert_eq!(
            events.last().and_then(|(_, e)| e.message.as_deref()),
            Some("policy rejected")
        );
    }

    #[tokio::test]
    async fn unsubscribed_callbacks_hear_nothing() {
        let pipeline = Arc::new(ScriptedPipeline::terminating("no"));
        let notifier = Arc::new(RecordingNotifier::new());
        let manager = manager_with(
            &NegotiationConfig::default(),
            pipeline,
            Arc::new(InMemoryEdrCache::new()),
            Arc::clone(&notifier),
        );

        let mut request = fixtures::negotiate_edr_request();
        request.callback_addresses = vec![edr_core::CallbackAddress::new(
            "http://cb",
            ["edr.negotiation.finalized"],
        )];
        manager.initiate_edr_negotiation(request).await.unwrap();
        manager.shutdown().await;

        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn full_queue_asks_caller_to_retry() {
        let pipeline = Arc::new(ScriptedPipeline::gated(NegotiationOutcome::Terminated {
            reason: "done".into(),
        }));
        let config = NegotiationConfig {
            queue_capacity: 1,
            max_concurrent: 1,
        };
        let manager = manager_with(
            &config,
            Arc::clone(&pipeline),
            Arc::new(InMemoryEdrCache::new()),
            Arc::new(RecordingNotifier::new()),
        );

        // The worker holds one job in the pipeline and one waiting for a permit;
        // keep dispatching until the queue itself is full.
        let mut outcome = Ok(());
        for _ in 0..8 {
            match manager
                .initiate_edr_negotiation(fixtures::negotiate_edr_request())
                .await
            {
                Ok(_) => tokio::task::yield_now().await,
                Err(failure) => {
                    outcome = Err(failure);
                    break;
                }
            }
        }
        assert_matches!(outcome, Err(ref f) if f.status() == DispatchStatus::ErrorRetry);

        pipeline.release();
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_is_fatal() {
        let manager = manager_with(
            &NegotiationConfig::default(),
            Arc::new(ScriptedPipeline::terminating("unused")),
            Arc::new(InMemoryEdrCache::new()),
            Arc::new(RecordingNotifier::new()),
        );
        manager.shutdown().await;

        let failure = manager
            .initiate_edr_negotiation(fixtures::negotiate_edr_request())
            .await
            .unwrap_err();
        assert_eq!(failure.status(), DispatchStatus::FatalError);
    }
}
