// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Durable benchmark history.
//!
//! This crate records benchmark runs into a remote, multi-writer document
//! store: one append-only history document per implementation and a shared
//! manifest. Stores only offer conditional writes, so every update is a
//! read, merge, write cycle that restarts on conflict.
//!
//! - [`store`] - The [`DocumentStore`] interface
//! - [`github`] - GitHub Contents API store
//! - [`memory`] - In-process store
//! - [`history`] - History documents and commit entries
//! - [`manifest`] - The manifest of tracked implementations
//! - [`sync`] - The [`HistorySynchronizer`]

pub mod github;
pub mod history;
pub mod manifest;
pub mod memory;
pub mod store;
pub mod sync;

pub use github::{GithubContentsStore, GithubStoreConfig};
pub use history::{CommitEntry, HistoryDocument, MergeOutcome};
pub use manifest::{ImplementationEntry, ManifestDocument};
pub use memory::MemoryStore;
pub use store::{DocumentStore, DocumentWrite, StoreError, StoredDocument, VersionToken};
pub use sync::{HistorySynchronizer, SyncConfig, SyncError, SyncReport, SyncRequest};
