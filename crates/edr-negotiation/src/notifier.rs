//! Callback fan-out

use async_trait::async_trait;
use edr_core::{CallbackAddress, CallbackNotifier, EdrEvent};

/// Deliver an event to every subscribed address, in declaration order
pub async fn notify_subscribers(
    notifier: &dyn CallbackNotifier,
    addresses: &[CallbackAddress],
    event: &EdrEvent,
) {
    for address in addresses
        .iter()
        .filter(|address| address.is_subscribed_to(event.kind))
    {
        notifier.notify(address, event).await;
    }
}

/// Notifier that only records events in the trace log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCallbackNotifier;

#[async_trait]
impl CallbackNotifier for TracingCallbackNotifier {
    async fn notify(&self, address: &CallbackAddress, event: &EdrEvent) {
        tracing::info!(
            uri = %address.uri,
            event = %event.kind,
            negotiation_id = %event.negotiation_id,
            transfer_process_id = ?event.transfer_process_id,
            "EDR lifecycle event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_core::EdrEventKind;
    use edr_testkit::{fixtures, RecordingNotifier};

    #[tokio::test]
    async fn only_subscribed_addresses_are_notified_in_order() {
        let notifier = RecordingNotifier::new();
        let addresses = [
            CallbackAddress::new("http://a", ["edr.negotiation"]),
            CallbackAddress::new("http://b", ["edr.negotiation.terminated"]),
            CallbackAddress::new("http://c", ["edr.negotiation.finalized"]),
        ];
        let event = EdrEvent::new(EdrEventKind::Finalized, &fixtures::contract_negotiation())
            .with_transfer_process_id("tp-1");

        notify_subscribers(&notifier, &addresses, &event).await;

        let uris: Vec<_> = notifier.events().into_iter().map(|(uri, _)| uri).collect();
        assert_eq!(uris, ["http://a", "http://c"]);
    }

    #[tokio::test]
    async fn tracing_notifier_accepts_every_event() {
        let address = CallbackAddress::new("http://cb", ["edr.negotiation"]);
        let negotiation = fixtures::contract_negotiation();
        for kind in [
            EdrEventKind::Initiated,
            EdrEventKind::Finalized,
            EdrEventKind::Conflict,
            EdrEventKind::Terminated,
            EdrEventKind::Failed,
        ] {
            notify_subscribers(
                &TracingCallbackNotifier,
                std::slice::from_ref(&address),
                &EdrEvent::new(kind, &negotiation).with_message("detail"),
            )
            .await;
        }
    }
}
