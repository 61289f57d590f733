//! Per-invocation execution context
//!
//! A [`ToolContext`] is the cancellable handle every execution observes: a
//! [`CancellationToken`] the caller may fire at any time, plus an optional
//! deadline. Whichever fires first decides how an interrupted run is reported.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Context for tool execution
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Trace ID for correlation
    pub trace_id: Option<String>,

    /// Cancellation token
    pub cancellation: CancellationToken,

    /// Point in time after which execution is abandoned
    pub deadline: Option<Instant>,
}

impl ToolContext {
    /// Create a context with no deadline and a fresh token
    pub fn new() -> Self {
        Self::default()
    }

    /// Set trace ID
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Set cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set a deadline `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Check if the deadline, if any, has passed
    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline; `None` without one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}
