//! Execution statistics.
//!
//! [`StatsCollector`] aggregates per-command [`CommandMetrics`] plus a few
//! process-wide counters. It is a cheap-to-clone handle; all clones share the
//! same data. Reporting goes through [`StatsSnapshot`], an immutable copy taken
//! under a short read lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Serializer};

use crate::command::ExecutionResult;
use crate::error::ErrorKind;
use selfbot_core::ConnectionStatus;

fn millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_nanos() as f64 / 1_000_000.0)
}

fn unix_secs<S: Serializer>(value: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let secs = value
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    serializer.serialize_u64(secs)
}

fn opt_unix_secs<S: Serializer>(
    value: &Option<SystemTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(time) => unix_secs(time, serializer),
        None => serializer.serialize_none(),
    }
}

// ============================================================================
// CommandMetrics
// ============================================================================

/// Aggregated metrics for a single command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandMetrics {
    pub name: String,
    pub total_executions: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Failures that were timeouts (also counted in `failure_count`).
    pub timeout_count: u64,
    #[serde(rename = "total_latency_ms", serialize_with = "millis")]
    pub total_latency: Duration,
    #[serde(rename = "mean_latency_ms", serialize_with = "millis")]
    pub mean_latency: Duration,
    #[serde(rename = "min_latency_ms", serialize_with = "millis")]
    pub min_latency: Duration,
    #[serde(rename = "max_latency_ms", serialize_with = "millis")]
    pub max_latency: Duration,
    #[serde(serialize_with = "opt_unix_secs")]
    pub last_executed: Option<SystemTime>,
}

impl CommandMetrics {
    /// Empty metrics for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_executions: 0,
            success_count: 0,
            failure_count: 0,
            timeout_count: 0,
            total_latency: Duration::ZERO,
            mean_latency: Duration::ZERO,
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            last_executed: None,
        }
    }

    fn record(&mut self, result: &ExecutionResult, at: SystemTime) {
        let elapsed = result.elapsed;
        if self.total_executions == 0 {
            self.min_latency = elapsed;
            self.max_latency = elapsed;
        } else {
            self.min_latency = self.min_latency.min(elapsed);
            self.max_latency = self.max_latency.max(elapsed);
        }

        self.total_executions += 1;
        self.total_latency += elapsed;
        self.mean_latency = mean(self.total_latency, self.total_executions);

        if result.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
            if result.error_kind == Some(ErrorKind::Timeout) {
                self.timeout_count += 1;
            }
        }
        self.last_executed = Some(at);
    }

    /// Success rate in percent, `0.0` before the first execution.
    pub fn success_rate(&self) -> f64 {
        percent(self.success_count, self.total_executions)
    }
}

fn mean(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((total.as_nanos() / u128::from(count)) as u64)
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

// ============================================================================
// StatsCollector
// ============================================================================

struct StatsInner {
    metrics: RwLock<HashMap<String, CommandMetrics>>,
    messages_processed: AtomicU64,
    commands_executed: AtomicU64,
    rate_limited: AtomicU64,
    status: Mutex<ConnectionStatus>,
    started: Instant,
    started_at: SystemTime,
}

/// Shared statistics collector.
#[derive(Clone)]
pub struct StatsCollector {
    inner: Arc<StatsInner>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner {
                metrics: RwLock::new(HashMap::new()),
                messages_processed: AtomicU64::new(0),
                commands_executed: AtomicU64::new(0),
                rate_limited: AtomicU64::new(0),
                status: Mutex::new(ConnectionStatus::default()),
                started: Instant::now(),
                started_at: SystemTime::now(),
            }),
        }
    }

    /// Records one command execution.
    pub fn record(&self, command: &str, result: &ExecutionResult) {
        let now = SystemTime::now();
        {
            let mut metrics = self.inner.metrics.write();
            metrics
                .entry(command.to_string())
                .or_insert_with(|| CommandMetrics::new(command))
                .record(result, now);
        }
        self.inner.commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an inbound message that reached the dispatcher.
    pub fn record_message(&self) {
        self.inner.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a dispatch denied by the rate limiter.
    pub fn record_rate_limited(&self) {
        self.inner.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        *self.inner.status.lock() = status;
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.lock()
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started.elapsed()
    }

    /// Metrics for a single command.
    pub fn metrics(&self, command: &str) -> Option<CommandMetrics> {
        self.inner.metrics.read().get(command).cloned()
    }

    /// Takes an immutable copy of everything collected so far.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut commands: Vec<CommandMetrics> = {
            let metrics = self.inner.metrics.read();
            metrics.values().cloned().collect()
        };
        commands.sort_by(|a, b| a.name.cmp(&b.name));

        StatsSnapshot {
            started_at: self.inner.started_at,
            uptime: self.uptime(),
            status: self.status(),
            messages_processed: self.inner.messages_processed.load(Ordering::Relaxed),
            commands_executed: self.inner.commands_executed.load(Ordering::Relaxed),
            rate_limited: self.inner.rate_limited.load(Ordering::Relaxed),
            commands,
        }
    }

    /// Clears all counters and metrics. Uptime keeps running.
    pub fn reset(&self) {
        self.inner.metrics.write().clear();
        self.inner.messages_processed.store(0, Ordering::Relaxed);
        self.inner.commands_executed.store(0, Ordering::Relaxed);
        self.inner.rate_limited.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for StatsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCollector")
            .field("status", &self.status())
            .field(
                "commands_executed",
                &self.inner.commands_executed.load(Ordering::Relaxed),
            )
            .finish()
    }
}

// ============================================================================
// Snapshot & summary
// ============================================================================

/// Point-in-time copy of all statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    #[serde(serialize_with = "unix_secs")]
    pub started_at: SystemTime,
    #[serde(rename = "uptime_ms", serialize_with = "millis")]
    pub uptime: Duration,
    pub status: ConnectionStatus,
    pub messages_processed: u64,
    pub commands_executed: u64,
    pub rate_limited: u64,
    /// Per-command metrics, sorted by name.
    pub commands: Vec<CommandMetrics>,
}

/// Derived figures for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_executions: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub timeout_count: u64,
    /// Percent of executions that succeeded.
    pub success_rate: f64,
    pub most_used_command: Option<String>,
    #[serde(rename = "mean_latency_ms", serialize_with = "millis")]
    pub mean_latency: Duration,
}

impl StatsSnapshot {
    pub fn command(&self, name: &str) -> Option<&CommandMetrics> {
        self.commands.iter().find(|m| m.name == name)
    }

    /// Aggregates per-command metrics.
    ///
    /// Ties for the most used command go to the alphabetically first name.
    pub fn summary(&self) -> PerformanceSummary {
        let mut total = 0;
        let mut success = 0;
        let mut failure = 0;
        let mut timeouts = 0;
        let mut latency = Duration::ZERO;
        let mut most_used: Option<&CommandMetrics> = None;

        for metrics in &self.commands {
            total += metrics.total_executions;
            success += metrics.success_count;
            failure += metrics.failure_count;
            timeouts += metrics.timeout_count;
            latency += metrics.total_latency;
            if metrics.total_executions > 0
                && most_used.is_none_or(|best| metrics.total_executions > best.total_executions)
            {
                most_used = Some(metrics);
            }
        }

        PerformanceSummary {
            total_executions: total,
            success_count: success,
            failure_count: failure,
            timeout_count: timeouts,
            success_rate: percent(success, total),
            most_used_command: most_used.map(|m| m.name.clone()),
            mean_latency: mean(latency, total),
        }
    }

    /// Pretty-printed JSON export of the snapshot and its summary.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Export<'a> {
            #[serde(flatten)]
            snapshot: &'a StatsSnapshot,
            summary: PerformanceSummary,
        }

        serde_json::to_string_pretty(&Export {
            snapshot: self,
            summary: self.summary(),
        })
    }
}
