//! Scripted negotiation pipeline

use async_trait::async_trait;
use edr_core::{
    ContractNegotiation, EndpointDataReference, NegotiateEdrRequest, NegotiationOutcome,
    NegotiationPipeline,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// Pipeline that answers every negotiation with the same outcome
///
/// A gated pipeline holds every negotiation until [`ScriptedPipeline::release`] is called,
/// which lets tests observe the state between dispatch and completion.
pub struct ScriptedPipeline {
    outcome: NegotiationOutcome,
    gate: Option<watch::Sender<bool>>,
    invocations: AtomicUsize,
}

impl ScriptedPipeline {
    /// Always finalize with the given capability
    pub fn finalizing(transfer_process_id: &str, edr: EndpointDataReference) -> Self {
        Self::new(NegotiationOutcome::Finalized {
            transfer_process_id: transfer_process_id.to_string(),
            edr,
        })
    }

    /// Always terminate with the given reason
    pub fn terminating(reason: &str) -> Self {
        Self::new(NegotiationOutcome::Terminated {
            reason: reason.to_string(),
        })
    }

    /// Answer immediately with `outcome`
    pub fn new(outcome: NegotiationOutcome) -> Self {
        Self {
            outcome,
            gate: None,
            invocations: AtomicUsize::new(0),
        }
    }

    /// Answer with `outcome` once released
    pub fn gated(outcome: NegotiationOutcome) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            outcome,
            gate: Some(gate),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Let every held and future negotiation complete
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.send_replace(true);
        }
    }

    /// Number of negotiations that reached the pipeline
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NegotiationPipeline for ScriptedPipeline {
    async fn negotiate(
        &self,
        _negotiation: &ContractNegotiation,
        _request: &NegotiateEdrRequest,
    ) -> NegotiationOutcome {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let mut open = gate.subscribe();
            let _ = open.wait_for(|open| *open).await;
        }
        self.outcome.clone()
    }
}
