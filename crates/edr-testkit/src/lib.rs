//! EDR Testing Infrastructure
//!
//! Fixtures and substitutable fakes for every collaborator trait, so the façade and
//! the orchestrator can be exercised without a remote counter-party or a database.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

/// Canonical test data
pub mod fixtures;
/// Recording callback notifier
pub mod notifier;
/// Scripted negotiation pipeline
pub mod pipeline;
/// Stubbed cache and orchestrator
pub mod stubs;

pub use notifier::RecordingNotifier;
pub use pipeline::ScriptedPipeline;
pub use stubs::{CacheCall, StubEdrCache, StubEdrManager};
