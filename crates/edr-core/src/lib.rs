//! # EDR Core
//!
//! **Purpose**: Domain types, the uniform result model and collaborator traits for
//! endpoint data reference (EDR) negotiation and caching.
//!
//! # Architecture Constraints
//!
//! - YES Domain types and validation
//! - YES Result model and the fixed store/dispatch → service mapping
//! - YES Trait seams for the cache, the orchestrator and external collaborators
//! - NO storage implementations (that's edr-store)
//! - NO task spawning or queueing (that's edr-negotiation)
//! - NO façade composition (that's edr-service)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Collaborator traits
pub mod effects;

/// Validation and query errors
pub mod errors;

/// Query specification types
pub mod query;

/// Uniform result model
pub mod result;

/// Trust-context reference documents
pub mod trust_context;

/// Domain types
pub mod types;

pub use effects::{
    CallbackNotifier, EdrCache, EdrManager, EdrStream, NegotiationOutcome, NegotiationPipeline,
};
pub use errors::{QueryError, ValidationError};
pub use query::{CompiledQuery, Criterion, Operand, Operator, Predicate, QueryField, QuerySpec, SortOrder};
pub use result::{
    DispatchFailure, DispatchResult, DispatchStatus, ServiceFailure, ServiceFailureReason,
    ServiceResult, StoreFailure, StoreFailureReason, StoreResult,
};
pub use trust_context::{ContextDocument, TrustContextError, TrustContextRegistry};
pub use types::{
    CallbackAddress, ContractNegotiation, ContractOffer, EdrEvent, EdrEventKind,
    EndpointDataReference, NegotiateEdrRequest, NegotiationState, Policy, TransferProcessId,
};
