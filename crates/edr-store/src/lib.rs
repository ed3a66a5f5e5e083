//! # EDR Store
//!
//! **Purpose**: Cache implementations for endpoint data references and the query
//! evaluation they share.
//!
//! Every implementation honours the [`EdrCache`](edr_core::EdrCache) contract: uniqueness
//! enforced at insert, `NotFound` on deleting a missing key, and queries evaluated
//! over a point-in-time snapshot.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// In-memory cache
pub mod memory;

/// Query evaluation against cache entries
pub mod predicate;

pub use memory::InMemoryEdrCache;
