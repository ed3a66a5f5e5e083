//! # EDR Service
//!
//! **Purpose**: The single entry point for endpoint data references: start a
//! negotiation, resolve a capability by transfer process, list capabilities and revoke
//! them.
//!
//! Also hosts the ambient pieces a deployment needs around the façade: TOML/env
//! configuration, tracing installation and runtime assembly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration
pub mod config;

/// Runtime assembly
pub mod runtime;

/// Façade
pub mod service;

/// Tracing subscriber installation
pub mod telemetry;

pub use config::{ConfigError, EdrConfig, LoggingConfig, QueryConfig, TrustContextSource};
pub use runtime::EdrRuntime;
pub use service::{EdrService, EdrServiceImpl, DEFAULT_MAX_QUERY_LIMIT};
pub use telemetry::{init_tracing, TelemetryError};

pub use edr_core::{
    ContractNegotiation, EndpointDataReference, NegotiateEdrRequest, QuerySpec, ServiceFailure,
    ServiceFailureReason, ServiceResult,
};
