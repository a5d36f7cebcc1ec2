// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! System load sampling.
//!
//! Benchmarks taken on a busy machine are noise. This adapter samples the
//! 1-minute load average and memory usage before a run and flags either one
//! when it exceeds its threshold.
//!
//! # Example
//!
//! ```ignore
//! use benchwatch_adapters::system_load::{LoadSampler, ProcLoadSampler, LoadThresholds};
//!
//! let report = ProcLoadSampler::default().sample(&LoadThresholds::default())?;
//! if report.cpu.warning {
//!     println!("CPU busy: {:.1}%", report.cpu.normalized_load * 100.0);
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sampling system load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A kernel statistics file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A kernel statistics file had an unexpected format
    #[error("Unexpected format in {0}")]
    Format(String),
}

/// Result type for load sampling.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Warning thresholds, as fractions of capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadThresholds {
    /// Normalized CPU load above which a warning is raised (default 0.80)
    pub cpu: f64,
    /// Memory usage ratio above which a warning is raised (default 0.80)
    pub memory: f64,
}

impl Default for LoadThresholds {
    fn default() -> Self {
        Self {
            cpu: 0.80,
            memory: 0.80,
        }
    }
}

/// CPU load section of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuLoad {
    /// 1-minute load average
    pub load_avg_1m: f64,
    /// Logical CPUs
    pub cpu_count: usize,
    /// Load average divided by CPU count
    pub normalized_load: f64,
    /// Threshold used
    pub threshold: f64,
    /// Whether the load is above the threshold
    pub warning: bool,
}

/// Memory section of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryLoad {
    /// Used / total
    pub usage_ratio: f64,
    /// Used memory in MiB
    pub used_mb: u64,
    /// Total memory in MiB
    pub total_mb: u64,
    /// Threshold used
    pub threshold: f64,
    /// Whether usage is above the threshold
    pub warning: bool,
}

/// System load snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLoadReport {
    /// CPU load
    pub cpu: CpuLoad,
    /// Memory usage
    pub memory: MemoryLoad,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl SystemLoadReport {
    /// Build a report from raw readings.
    pub fn from_readings(
        load_avg_1m: f64,
        cpu_count: usize,
        memory: MemInfo,
        thresholds: &LoadThresholds,
    ) -> Self {
        let cpu_count = cpu_count.max(1);
        let normalized = load_avg_1m / cpu_count as f64;

        let (ratio, used_kb) = if memory.total_kb == 0 {
            (0.0, 0)
        } else {
            let used = memory.total_kb.saturating_sub(memory.available_kb);
            (used as f64 / memory.total_kb as f64, used)
        };

        Self {
            cpu: CpuLoad {
                load_avg_1m: round_to(load_avg_1m, 2),
                cpu_count,
                normalized_load: round_to(normalized, 3),
                threshold: thresholds.cpu,
                warning: normalized > thresholds.cpu,
            },
            memory: MemoryLoad {
                usage_ratio: round_to(ratio, 3),
                used_mb: used_kb / 1024,
                total_mb: memory.total_kb / 1024,
                threshold: thresholds.memory,
                warning: ratio > thresholds.memory,
            },
        }
    }

    /// Step outputs describing this report.
    pub fn outputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("cpu_load", format!("{:.3}", self.cpu.normalized_load)),
            ("memory_usage", format!("{:.3}", self.memory.usage_ratio)),
            ("cpu_warning", self.cpu.warning.to_string()),
            ("memory_warning", self.memory.warning.to_string()),
        ]
    }
}

/// Memory totals in KiB, as reported by `/proc/meminfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    /// `MemTotal`
    pub total_kb: u64,
    /// `MemAvailable`
    pub available_kb: u64,
}

/// Parse the first field of `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Result<f64> {
    content
        .split_whitespace()
        .next()
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| LoadError::Format("/proc/loadavg".to_string()))
}

/// Parse `MemTotal` and `MemAvailable` from `/proc/meminfo`.
///
/// Missing keys read as zero, which yields a zero usage ratio.
pub fn parse_meminfo(content: &str) -> MemInfo {
    let mut info = MemInfo::default();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };
        match key.trim_end_matches(':') {
            "MemTotal" => info.total_kb = value,
            "MemAvailable" => info.available_kb = value,
            _ => {}
        }
    }
    info
}

/// Source of system load readings.
pub trait LoadSampler {
    /// Take a sample.
    fn sample(&self, thresholds: &LoadThresholds) -> Result<SystemLoadReport>;
}

/// Sampler reading Linux procfs.
#[derive(Debug, Clone)]
pub struct ProcLoadSampler {
    proc_root: PathBuf,
}

impl Default for ProcLoadSampler {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl ProcLoadSampler {
    /// Sampler reading from an alternative procfs mount.
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path).map_err(|source| LoadError::Read { path, source })
    }
}

impl LoadSampler for ProcLoadSampler {
    fn sample(&self, thresholds: &LoadThresholds) -> Result<SystemLoadReport> {
        let load = parse_loadavg(&self.read("loadavg")?)?;
        let memory = parse_meminfo(&self.read("meminfo")?);
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        Ok(SystemLoadReport::from_readings(load, cpus, memory, thresholds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       16384000 kB\nMemFree:         1000000 kB\nMemAvailable:    4096000 kB\n";

    #[test]
    fn test_parse_proc_files() {
        assert_eq!(parse_loadavg("3.52 2.10 1.00 2/1234 5678\n").unwrap(), 3.52);
        assert!(parse_loadavg("").is_err());

        let info = parse_meminfo(MEMINFO);
        assert_eq!(info.total_kb, 16_384_000);
        assert_eq!(info.available_kb, 4_096_000);
    }

    #[test]
    fn test_report_thresholds() {
        let report = SystemLoadReport::from_readings(
            7.0,
            8,
            parse_meminfo(MEMINFO),
            &LoadThresholds::default(),
        );
        assert_eq!(report.cpu.normalized_load, 0.875);
        assert!(report.cpu.warning);
        assert_eq!(report.memory.usage_ratio, 0.75);
        assert!(!report.memory.warning);
        assert_eq!(report.memory.total_mb, 16_000);
        assert_eq!(report.memory.used_mb, 12_000);
    }

    #[test]
    fn test_zero_memory_total() {
        let report =
            SystemLoadReport::from_readings(0.0, 0, MemInfo::default(), &LoadThresholds::default());
        assert_eq!(report.cpu.cpu_count, 1);
        assert_eq!(report.memory.usage_ratio, 0.0);
        assert!(!report.memory.warning);
    }

    #[test]
    fn test_outputs() {
        let report = SystemLoadReport::from_readings(
            2.0,
            4,
            parse_meminfo(MEMINFO),
            &LoadThresholds::default(),
        );
        let outputs = report.outputs();
        assert!(outputs.contains(&("cpu_load", "0.500".to_string())));
        assert!(outputs.contains(&("cpu_warning", "false".to_string())));
    }

    #[test]
    fn test_sampler_reads_proc_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("loadavg"), "0.50 0.40 0.30 1/100 42\n").unwrap();
        fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();

        let report = ProcLoadSampler::with_root(dir.path())
            .sample(&LoadThresholds::default())
            .unwrap();
        assert_eq!(report.cpu.load_avg_1m, 0.5);
    }

    #[test]
    fn test_sampler_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProcLoadSampler::with_root(dir.path())
            .sample(&LoadThresholds::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
