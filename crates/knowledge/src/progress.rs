//! Structured progress reporting for ingestion and maintenance runs.

use std::sync::Arc;
use std::time::Instant;

/// Progress event emitted during knowledge operations.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Phase of the operation: "chunk", "embed", "upsert", "delete"
    pub phase: String,

    /// Units processed so far (segments, ids)
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    /// Human-readable message
    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: impl Into<String>,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage =
            total.map(|t| if t > 0 { (current as f64 / t as f64) * 100.0 } else { 0.0 });

        Self {
            phase: phase.into(),
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a single user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Arc<Instant>,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Arc::new(Instant::now()),
        }
    }

    /// Reporter that only mirrors events to tracing.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let event = event.with_elapsed(elapsed);

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = elapsed,
            "Progress event"
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn chunk(&self, current: u64, total: Option<u64>, segments: usize) {
        self.emit(ProgressEvent::new(
            "chunk",
            current,
            total,
            format!("{} segments created", segments),
        ));
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(ProgressEvent::new(
            "embed",
            current,
            Some(total),
            format!("model={}", model),
        ));
    }

    pub fn upsert(&self, current: u64, total: u64, namespace: &str) {
        self.emit(ProgressEvent::new(
            "upsert",
            current,
            Some(total),
            format!("namespace={}", namespace),
        ));
    }

    pub fn delete(&self, current: u64, total: Option<u64>, namespace: &str) {
        self.emit(ProgressEvent::new(
            "delete",
            current,
            total,
            format!("namespace={}", namespace),
        ));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}
