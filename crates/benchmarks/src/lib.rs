//! Benchmark snapshots, rolling baselines and regression detection.
//!
//! This crate holds the pure core of the pipeline: the snapshot model a
//! benchmark harness writes, the rolling-baseline aggregator, and the
//! multi-metric regression classifier.
//!
//! # Quick Start
//!
//! ```no_run
//! use benchwatch_benchmarks::{baseline, io, regression};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let outcome = baseline::compute_rolling_baseline("benchmark_data", &Default::default())?;
//! let current = io::read_snapshot("benchmark_results.json")?;
//!
//! if let Some(base) = outcome.snapshot() {
//!     let report = regression::detect(&current, base, &Default::default());
//!     for message in report.messages() {
//!         println!("{message}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`result`] - Snapshot and metric types
//! - [`io`] - Reading and writing snapshots, history selection
//! - [`baseline`] - Rolling baseline aggregation
//! - [`regression`] - Regression/improvement classification
//! - [`markdown`] - Markdown step summaries

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod baseline;
pub mod io;
pub mod markdown;
pub mod regression;
pub mod result;

pub use baseline::{BaselineConfig, BaselineOutcome};
pub use io::SnapshotDocument;
pub use regression::{ChangeKind, MetricChange, RegressionConfig, RegressionReport, RunClassification};
pub use result::{BenchmarkResult, Direction, Metric, MetricValue, RawPlatform, ResultSnapshot, TestVectors};
