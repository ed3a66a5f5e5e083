//! # EDR Negotiation
//!
//! **Purpose**: Accept EDR negotiation requests, run them off the caller's task and store
//! the capability each successful negotiation yields.
//!
//! The synchronous part of a dispatch only validates and enqueues. Everything that talks
//! to the counter-party happens on the worker behind the queue.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Queue and concurrency limits
pub mod config;

/// The orchestrator
pub mod manager;

/// Callback fan-out
pub mod notifier;

pub use config::NegotiationConfig;
pub use manager::EdrNegotiationManager;
pub use notifier::{notify_subscribers, TracingCallbackNotifier};
