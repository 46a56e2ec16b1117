//! Structured logging and command context

use tracing::Span;
use uuid::Uuid;

/// Structured logger for wallet events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
}

impl StructuredLogger {
    pub fn new(context_id: String) -> Self {
        Self { context_id }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_transfer_attempt(&self, from: &str, to: &str, lamports: u64) {
        tracing::info!(
            context_id = %self.context_id,
            from = %from,
            to = %to,
            lamports = %lamports,
            "Attempting transfer"
        );
    }

    pub fn log_submission(&self, signature: &str, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            latency_ms = %latency_ms,
            "Transfer submitted"
        );
    }

    pub fn log_outcome(&self, signature: &str, outcome: &str, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            outcome = %outcome,
            latency_ms = %latency_ms,
            "Transfer resolved"
        );
    }

    pub fn log_failure(&self, stage: &str, error: &str, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            stage = %stage,
            error = %error,
            latency_ms = %latency_ms,
            "Transfer failed"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            message = %message,
            "Warning"
        );
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            context_id = %self.context_id,
            message = %message,
            "Error"
        );
    }
}

/// Per-command context: one request id shared by every log line of a command
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Unique request ID
    pub request_id: String,

    /// Operation name (subcommand)
    pub operation: String,

    /// Unix timestamp at creation
    pub timestamp: i64,

    /// Structured logger instance
    pub logger: StructuredLogger,
}

impl CommandContext {
    pub fn new(operation: &str) -> Self {
        let request_id = Uuid::new_v4().to_string();
        Self {
            request_id: request_id.clone(),
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            logger: StructuredLogger::new(request_id),
        }
    }

    /// Span to instrument the command future with
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "command",
            request_id = %self.request_id,
            op = %self.operation
        )
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new("default")
    }
}
