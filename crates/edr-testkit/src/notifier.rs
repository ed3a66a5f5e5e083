//! Recording callback notifier

use async_trait::async_trait;
use edr_core::{CallbackAddress, CallbackNotifier, EdrEvent, EdrEventKind};
use parking_lot::Mutex;

/// Notifier that keeps every delivery for later assertions
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<(String, EdrEvent)>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(uri, event)` delivered so far
    pub fn events(&self) -> Vec<(String, EdrEvent)> {
        self.deliveries.lock().clone()
    }

    /// Kinds of the delivered events, in delivery order
    pub fn kinds(&self) -> Vec<EdrEventKind> {
        self.deliveries.lock().iter().map(|(_, e)| e.kind).collect()
    }
}

#[async_trait]
impl CallbackNotifier for RecordingNotifier {
    async fn notify(&self, address: &CallbackAddress, event: &EdrEvent) {
        self.deliveries
            .lock()
            .push((address.uri.clone(), event.clone()));
    }
}
