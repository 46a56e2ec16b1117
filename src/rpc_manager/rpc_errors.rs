use thiserror::Error;

/// JSON-RPC "method not found"
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Errors produced by an [`RpcTransport`](super::RpcTransport) call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection failure, timeout, or a non-2xx HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// The body was not JSON, or carried neither `result` nor `error`
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The node answered with a JSON-RPC `error` object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl TransportError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::MalformedResponse(_) => false,
            // Server-defined errors (-32000..-32099) cover transient node
            // states such as "node is behind" or "slot skipped"
            TransportError::Rpc { code, .. } => (-32099..=-32000).contains(code),
        }
    }

    /// Get the error category for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Network(_) => "network",
            TransportError::MalformedResponse(_) => "malformed",
            TransportError::Rpc { .. } => "rpc",
        }
    }

    pub fn is_method_not_found(&self) -> bool {
        matches!(self, TransportError::Rpc { code, .. } if *code == METHOD_NOT_FOUND)
    }
}

/// Retry policy for polling operations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,

    /// Base delay in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Jitter factor (0.0 - 1.0)
    pub jitter_factor: f64,

    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            jitter_factor: 0.1,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (zero-based) attempt, or `None` once the
    /// attempt budget is spent
    pub fn calculate_delay(&self, attempt: u32) -> Option<std::time::Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }

        // Exponential backoff
        let delay_ms = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64);

        let jitter = if self.jitter_factor > 0.0 {
            (rand::random::<f64>() - 0.5) * 2.0 * self.jitter_factor
        } else {
            0.0
        };
        let jittered_delay = (delay_ms * (1.0 + jitter)).max(0.0) as u64;

        Some(std::time::Duration::from_millis(jittered_delay))
    }

    /// Single attempt, no waiting
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
            multiplier: 1.0,
        }
    }

    /// Upper bound of the total time spent sleeping between attempts
    pub fn max_total_delay(&self) -> std::time::Duration {
        let mut total_ms = 0f64;
        for attempt in 0..self.max_attempts.saturating_sub(1) {
            let delay = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
            total_ms += delay.min(self.max_delay_ms as f64) * (1.0 + self.jitter_factor);
        }
        std::time::Duration::from_millis(total_ms as u64)
    }
}
