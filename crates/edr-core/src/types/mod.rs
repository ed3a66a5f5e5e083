//! EDR domain types

/// Callback addresses and lifecycle events
pub mod callback;

/// Endpoint data references (the cached capability)
pub mod edr;

/// Negotiation requests and handles
pub mod negotiation;

pub use callback::{CallbackAddress, EdrEvent, EdrEventKind};
pub use edr::{EndpointDataReference, TransferProcessId};
pub use negotiation::{ContractNegotiation, ContractOffer, NegotiateEdrRequest, NegotiationState, Policy};
