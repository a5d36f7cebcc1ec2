// Copyright 2026 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run notifications.
//!
//! A [`NotificationSink`] receives one [`Notification`] per CI run. The
//! Slack implementation renders it as Block Kit JSON and posts it to an
//! incoming webhook.

use async_trait::async_trait;
use benchwatch_benchmarks::{BenchmarkResult, Metric, RunClassification};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Maximum number of analysis lines carried into a notification.
pub const MAX_ANALYSIS_LINES: usize = 5;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP request could not be made
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The receiving service answered with a non-success status
    #[error("Notification rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

/// Result type for notifications.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Everything a sink needs to describe a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    /// Run classification; `None` reports a failed run
    pub classification: RunClassification,
    /// Implementation name
    pub implementation: String,
    /// Short commit SHA
    pub commit: String,
    /// Link to the CI run
    pub run_url: String,
    /// Results of the run, empty when none were produced
    pub benchmarks: BTreeMap<String, BenchmarkResult>,
    /// Analysis excerpt to include
    pub analysis: Option<String>,
}

/// Destination for run notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification.
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Slack webhook settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Incoming webhook URL; notifications are skipped when unset
    pub webhook_url: Option<String>,
    /// Request timeout in seconds (default 10)
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Header text and emoji for a run classification.
pub fn header_for(classification: RunClassification) -> (&'static str, &'static str) {
    match classification {
        RunClassification::Regression => ("Warning: Benchmark Regression Detected", ":warning:"),
        RunClassification::Improvement => {
            ("Benchmark Improvement Detected", ":chart_with_upwards_trend:")
        }
        RunClassification::Mixed => ("Benchmark: Mixed Performance Changes", ":bar_chart:"),
        RunClassification::None => ("Benchmark Run Failed", ":x:"),
    }
}

/// Format a number with `,` thousands separators.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (formatted.as_str(), None),
    };

    let digits = int_part.len();
    let mut grouped = String::with_capacity(digits + digits / 3 + decimals + 2);
    if value.is_sign_negative() && formatted.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        grouped.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

fn format_metric(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Latency => format!("{:.2} ns", value),
        Metric::Throughput => format!("{} ops/s", format_grouped(value, 2)),
        Metric::Memory => format!("{} bytes", format_grouped(value, 0)),
    }
}

fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Latency => "Latency",
        Metric::Throughput => "Throughput",
        Metric::Memory => "Memory",
    }
}

/// One-line summary of a benchmark, e.g. `Latency: 12.35 ns | Memory: 2,048 bytes`.
pub fn benchmark_line(result: &BenchmarkResult) -> String {
    let fields: Vec<String> = Metric::ALL
        .iter()
        .filter_map(|&metric| {
            result
                .metric(metric)
                .map(|v| format!("{}: {}", metric_label(metric), format_metric(metric, v.value)))
        })
        .collect();

    if fields.is_empty() {
        "N/A".to_string()
    } else {
        fields.join(" | ")
    }
}

/// Pull the `### Analysis` section out of a Markdown report.
///
/// Returns its first [`MAX_ANALYSIS_LINES`] non-empty lines, stopping at the
/// next heading, or `None` if the section is missing or empty.
pub fn extract_analysis_summary(markdown: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut in_analysis = false;

    for line in markdown.trim().lines() {
        if line.starts_with("### Analysis") {
            in_analysis = true;
            continue;
        }
        if !in_analysis {
            continue;
        }
        if line.starts_with("##") {
            break;
        }
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines[..lines.len().min(MAX_ANALYSIS_LINES)].join("\n"))
    }
}

/// Render a notification as a Slack Block Kit payload.
pub fn build_payload(notification: &Notification) -> Value {
    let (header, _) = header_for(notification.classification);

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {"type": "plain_text", "text": header, "emoji": true}
        }),
        json!({
            "type": "section",
            "fields": [
                {"type": "mrkdwn", "text": format!("*Implementation:*\n{}", notification.implementation)},
                {"type": "mrkdwn", "text": format!("*Commit:*\n`{}`", notification.commit)}
            ]
        }),
    ];

    for (name, result) in &notification.benchmarks {
        blocks.push(json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": format!("*{}*: {}", name, benchmark_line(result))}
        }));
    }

    if let Some(analysis) = &notification.analysis {
        blocks.push(json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": format!("*AI Analysis:*\n{}", analysis)}
        }));
    }

    blocks.push(json!({
        "type": "actions",
        "elements": [{
            "type": "button",
            "text": {"type": "plain_text", "text": "View Run"},
            "url": notification.run_url
        }]
    }));

    json!({ "blocks": blocks })
}

/// Posts notifications to a Slack incoming webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    /// Create a notifier, or `None` when no webhook is configured.
    pub fn from_config(config: &SlackConfig) -> Result<Option<Self>> {
        let Some(webhook_url) = config
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        else {
            debug!("Slack webhook not configured");
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            webhook_url: webhook_url.to_string(),
        }))
    }
}

#[async_trait]
impl NotificationSink for SlackNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let payload = build_payload(notification);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let (_, emoji) = header_for(notification.classification);
        info!(
            implementation = %notification.implementation,
            classification = %notification.classification,
            "Slack alert sent {}",
            emoji
        );
        Ok(())
    }
}
