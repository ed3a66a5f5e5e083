//! Endpoint data references
//!
//! An [`EndpointDataReference`] grants access to one data endpoint under one contract.
//! The cache binds each reference to exactly one transfer process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of the transfer process a capability is bound to (the cache key)
pub type TransferProcessId = String;

/// Issued capability granting access to a data endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDataReference {
    /// Unique identifier of this capability instance
    pub id: String,
    /// Contract the capability was issued under
    pub contract_id: String,
    /// URL of the data endpoint
    pub endpoint: String,
    /// Name of the header carrying the credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,
    /// Credential material, never logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    /// Protocol-specific extension data
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl EndpointDataReference {
    /// Create a reference without credential material or properties
    pub fn new(
        id: impl Into<String>,
        contract_id: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            contract_id: contract_id.into(),
            endpoint: endpoint.into(),
            auth_key: None,
            auth_code: None,
            properties: BTreeMap::new(),
        }
    }

    /// Attach credential material
    pub fn with_auth(mut self, auth_key: impl Into<String>, auth_code: impl Into<String>) -> Self {
        self.auth_key = Some(auth_key.into());
        self.auth_code = Some(auth_code.into());
        self
    }

    /// Add an extension property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for EndpointDataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDataReference")
            .field("id", &self.id)
            .field("contract_id", &self.contract_id)
            .field("endpoint", &self.endpoint)
            .field("auth_key", &self.auth_key)
            .field("auth_code", &self.auth_code.as_ref().map(|_| "<redacted>"))
            .field("properties", &self.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_auth_code() {
        let edr = EndpointDataReference::new("edr-1", "c1", "http://peer/data")
            .with_auth("Authorization", "secret-token");
        let rendered = format!("{edr:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("Authorization"));
    }

    #[test]
    fn serializes_camel_case() {
        let edr = EndpointDataReference::new("edr-1", "c1", "http://peer/data")
            .with_property("cid", "x");
        let json = serde_json::to_value(&edr).unwrap();
        assert_eq!(json["contractId"], "c1");
        assert_eq!(json["properties"]["cid"], "x");
        assert!(json.get("authCode").is_none());
    }
}
