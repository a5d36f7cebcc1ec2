// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process document store.
//!
//! Behaves like a remote store with strict version checks: every accepted
//! write bumps the document version, stale or missing tokens are rejected.
//! Used for dry runs and tests.

use crate::store::{DocumentStore, DocumentWrite, Result, StoreError, StoredDocument, VersionToken};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct Entry {
    content: String,
    version: u64,
    message: String,
}

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, Entry>,
    next_version: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Seed a document, bypassing version checks.
    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        let version = self.bump();
        self.documents.insert(
            path.into(),
            Entry {
                content: content.into(),
                version,
                message: String::new(),
            },
        );
    }

    /// Current content of a document.
    pub fn content(&self, path: &str) -> Option<String> {
        self.documents.get(path).map(|e| e.content.clone())
    }

    /// Message of the last accepted write to a document.
    pub fn last_message(&self, path: &str) -> Option<String> {
        self.documents.get(path).map(|e| e.message.clone())
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>> {
        let document = self.documents.get(path).map(|e| StoredDocument {
            content: e.content.clone(),
            version: VersionToken::new(e.version.to_string()),
        });
        // Let concurrent callers interleave between read and write.
        tokio::task::yield_now().await;
        Ok(document)
    }

    async fn put(&self, path: &str, write: DocumentWrite) -> Result<()> {
        let conflict = || StoreError::Conflict {
            path: path.to_string(),
        };

        match self.documents.entry(path.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let current = occupied.get().version.to_string();
                if write.version.as_ref().map(VersionToken::as_str) != Some(current.as_str()) {
                    return Err(conflict());
                }
                let version = self.bump();
                occupied.insert(Entry {
                    content: write.content,
                    version,
                    message: write.message,
                });
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                if write.version.is_some() {
                    return Err(conflict());
                }
                let version = self.bump();
                vacant.insert(Entry {
                    content: write.content,
                    version,
                    message: write.message,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(content: &str, version: Option<VersionToken>) -> DocumentWrite {
        DocumentWrite {
            content: content.to_string(),
            message: "test".to_string(),
            version,
        }
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let store = MemoryStore::new();
        assert!(store.get("a.json").await.unwrap().is_none());

        store.put("a.json", write("v1", None)).await.unwrap();
        let doc = store.get("a.json").await.unwrap().unwrap();
        assert_eq!(doc.content, "v1");

        store.put("a.json", write("v2", Some(doc.version))).await.unwrap();
        assert_eq!(store.content("a.json").as_deref(), Some("v2"));
        assert_eq!(store.last_message("a.json").as_deref(), Some("test"));
    }

    #[tokio::test]
    async fn test_stale_token_conflicts() {
        let store = MemoryStore::new();
        store.insert("a.json", "v1");
        let stale = store.get("a.json").await.unwrap().unwrap().version;
        store.insert("a.json", "v2");

        let err = store.put("a.json", write("v3", Some(stale))).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.content("a.json").as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_create_over_existing_conflicts() {
        let store = MemoryStore::new();
        store.insert("a.json", "v1");
        assert!(store.put("a.json", write("v2", None)).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_token_for_missing_document_conflicts() {
        let store = MemoryStore::new();
        let err = store
            .put("a.json", write("v1", Some(VersionToken::new("7"))))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store.is_empty());
    }
}
