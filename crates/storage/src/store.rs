// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Conditionally-writable document store interface.
//!
//! A store hands out each document together with an opaque version token.
//! Writes must present the token they read and are rejected with
//! [`StoreError::Conflict`] when another writer got there first. Stores do
//! not retry; that is the synchronizer's job.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors returned by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The presented version token is stale (or missing for an existing document).
    #[error("Version conflict on {path}")]
    Conflict {
        /// Document path.
        path: String,
    },

    /// The store could not be reached or answered unexpectedly.
    #[error("Store transport error on {path}: {message}")]
    Transport {
        /// Document path.
        path: String,
        /// Error description.
        message: String,
    },

    /// The store returned content that could not be decoded.
    #[error("Invalid content for {path}: {message}")]
    InvalidContent {
        /// Document path.
        path: String,
        /// Error description.
        message: String,
    },
}

impl StoreError {
    /// Whether this error is a version conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Opaque version token of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a store-specific version string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as read from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Document text.
    pub content: String,
    /// Version the content was read at.
    pub version: VersionToken,
}

/// A conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentWrite {
    /// New document text.
    pub content: String,
    /// Change description recorded by the store.
    pub message: String,
    /// Version the write is based on; `None` creates a new document.
    pub version: Option<VersionToken>,
}

/// A remote document store with optimistic concurrency.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` when it does not exist.
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>>;

    /// Conditionally write a document.
    async fn put(&self, path: &str, write: DocumentWrite) -> Result<()>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>> {
        (**self).get(path).await
    }

    async fn put(&self, path: &str, write: DocumentWrite) -> Result<()> {
        (**self).put(path, write).await
    }
}
