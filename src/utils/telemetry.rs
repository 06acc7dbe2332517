// file: src/utils/telemetry.rs
// description: Health reporting and operation timing for the sync server
// reference: https://docs.rs/tracing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Health status for various system components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthCheck {
    fn record(
        component: &str,
        status: HealthStatus,
        message: Option<String>,
        started: Instant,
    ) -> Self {
        Self {
            component: component.to_string(),
            status,
            message,
            response_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Storage must exist (or be creatable) and accept writes.
    pub fn probe_storage(root: &Path) -> Self {
        let started = Instant::now();
        let writable = std::fs::create_dir_all(root)
            .and_then(|_| tempfile::tempfile_in(root).map(|_| ()));

        match writable {
            Ok(()) => Self::record("storage", HealthStatus::Healthy, None, started),
            Err(e) => Self::record(
                "storage",
                HealthStatus::Unhealthy,
                Some(format!("{} is not writable: {}", root.display(), e)),
                started,
            ),
        }
    }

    /// A missing git identity only degrades: the fallback namespace still works.
    pub fn probe_identity(resolved: &str, fallback: &str) -> Self {
        let started = Instant::now();
        if resolved == fallback {
            Self::record(
                "identity",
                HealthStatus::Degraded,
                Some(format!("git user.name unavailable, using fallback '{}'", fallback)),
                started,
            )
        } else {
            Self::record("identity", HealthStatus::Healthy, None, started)
        }
    }
}

/// Overall system health report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub storage_root: String,
    pub identity: String,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>, storage_root: &Path, identity: String) -> Self {
        let status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            checks,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage_root: storage_root.display().to_string(),
            identity,
        }
    }

    pub fn format(&self) -> String {
        let status_icon = match self.status {
            HealthStatus::Healthy => "✓",
            HealthStatus::Degraded => "⚠",
            HealthStatus::Unhealthy => "✗",
        };

        let mut output = format!(
            "{} System Health: {:?}\n\
             Version: {}\n\
             Storage: {}\n\
             Identity: {}\n\
             Timestamp: {}\n\n",
            status_icon,
            self.status,
            self.version,
            self.storage_root,
            self.identity,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        for check in &self.checks {
            let check_icon = match check.status {
                HealthStatus::Healthy => "✓",
                HealthStatus::Degraded => "⚠",
                HealthStatus::Unhealthy => "✗",
            };

            output.push_str(&format!(
                "{} {} ({:?}) - {}ms",
                check_icon, check.component, check.status, check.response_time_ms
            ));

            if let Some(ref msg) = check.message {
                output.push_str(&format!("\n  {}", msg));
            }

            output.push('\n');
        }

        output
    }
}

/// Logs the start, stages and duration of one workflow run.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stage(&self, stage: &str) {
        debug!(
            "[{}] {} at {}ms",
            self.operation,
            stage,
            self.elapsed().as_millis()
        );
    }

    /// Warns when the run exceeded `threshold`, then logs the total.
    pub fn finish(self, threshold: Duration) -> Duration {
        let elapsed = self.elapsed();
        if elapsed > threshold {
            warn!(
                "{} took {:.2}s (slower than {:.0}s)",
                self.operation,
                elapsed.as_secs_f64(),
                threshold.as_secs_f64()
            );
        } else {
            info!("Finished {} in {:.2}s", self.operation, elapsed.as_secs_f64());
        }
        elapsed
    }
}
