// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Benchwatch Adapters
//!
//! Adapters between the benchmark pipeline and the world around a CI run:
//!
//! - [`system_load`]: samples CPU load and memory usage before a run
//! - [`test_vectors`]: checks that every benchmark verified its outputs
//! - [`slack`]: posts run notifications to a Slack webhook
//! - [`github_actions`]: writes step outputs and workflow annotations

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod github_actions;
pub mod slack;
pub mod system_load;
pub mod test_vectors;

pub use github_actions::{annotation, append_outputs, write_outputs, AnnotationLevel, OutputError};
pub use slack::{Notification, NotificationSink, NotifyError, SlackConfig, SlackNotifier};
pub use system_load::{LoadError, LoadSampler, LoadThresholds, ProcLoadSampler, SystemLoadReport};
pub use test_vectors::{verify, VerificationReport};
