//! Trust-context reference documents
//!
//! JSON-LD context documents used elsewhere to validate participant credentials.
//! They are kept as immutable raw text keyed by URL; nothing here parses or edits them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Errors raised while assembling a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TrustContextError {
    /// Two documents claim the same URL
    #[error("Duplicate trust context: {url}")]
    Duplicate {
        /// Conflicting URL
        url: String,
    },

    /// URL or document body is empty
    #[error("Empty trust context: {url}")]
    Empty {
        /// Offending URL
        url: String,
    },
}

/// One versioned context document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    url: String,
    version: Option<String>,
    raw: Arc<str>,
}

impl ContextDocument {
    /// Wrap a raw document
    pub fn new(url: impl Into<String>, version: Option<String>, raw: impl Into<Arc<str>>) -> Self {
        Self {
            url: url.into(),
            version,
            raw: raw.into(),
        }
    }

    /// URL the document is published under
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Declared version, if any
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Raw document text
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Read-only lookup of context documents by URL
#[derive(Debug, Clone, Default)]
pub struct TrustContextRegistry {
    documents: HashMap<String, ContextDocument>,
}

impl TrustContextRegistry {
    /// Build a registry, rejecting duplicates and empty documents
    pub fn from_documents(
        documents: impl IntoIterator<Item = ContextDocument>,
    ) -> Result<Self, TrustContextError> {
        let mut map = HashMap::new();
        for document in documents {
            if document.url.trim().is_empty() || document.raw.trim().is_empty() {
                return Err(TrustContextError::Empty { url: document.url });
            }
            if map.contains_key(&document.url) {
                return Err(TrustContextError::Duplicate { url: document.url });
            }
            map.insert(document.url.clone(), document);
        }
        Ok(Self { documents: map })
    }

    /// Look up a document by URL
    pub fn get(&self, url: &str) -> Option<&ContextDocument> {
        self.documents.get(url)
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn lookup_returns_document_unchanged() {
        let raw = r#"{"@context": {"@version": 1.1}}"#;
        let registry = TrustContextRegistry::from_documents([ContextDocument::new(
            "https://example.org/ctx",
            Some("1.1".into()),
            raw,
        )])
        .unwrap();

        let doc = registry.get("https://example.org/ctx").unwrap();
        assert_eq!(doc.raw(), raw);
        assert_eq!(doc.version(), Some("1.1"));
        assert!(registry.get("https://example.org/other").is_none());
    }

    #[test]
    fn duplicates_are_rejected() {
        let doc = ContextDocument::new("https://example.org/ctx", None, "{}");
        let result = TrustContextRegistry::from_documents([doc.clone(), doc]);
        assert_matches!(result, Err(TrustContextError::Duplicate { .. }));
    }

    #[test]
    fn empty_documents_are_rejected() {
        let result =
            TrustContextRegistry::from_documents([ContextDocument::new("https://x", None, "  ")]);
        assert_matches!(result, Err(TrustContextError::Empty { .. }));
    }
}
