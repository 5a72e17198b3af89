use thiserror::Error;

/// Unified error type for the resilience layer.
///
/// This aggregates the failure modes a caller can observe from one logical
/// call: configuration errors (unknown service), load-shedding decisions
/// (circuit open), and downstream failures that survived the retry policy.
#[derive(Debug, Error)]
pub enum Error {
    /// The registry has no descriptor for the requested service. Never
    /// counted against a circuit breaker.
    #[error("unknown service: {service}")]
    UnknownService { service: String },

    /// The circuit breaker refused to dispatch the call.
    #[error("circuit open for service: {service}")]
    CircuitOpen { service: String },

    /// Connection-level failure after retries were exhausted.
    #[error("transport error calling {service}: {source}")]
    Transport {
        service: String,
        #[source]
        source: crate::transport::TransportError,
    },

    /// Non-2xx response that was not retryable, or exhausted its retries.
    #[error("HTTP {status} from {service}: {body}")]
    Http {
        service: String,
        status: u16,
        body: String,
    },

    /// Shared state store failure surfaced to the caller.
    #[error("state store error: {0}")]
    Store(String),

    /// Invalid client or descriptor configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Response body could not be deserialized into the requested type.
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Name of the service this error was observed against, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            Error::UnknownService { service }
            | Error::CircuitOpen { service }
            | Error::Transport { service, .. }
            | Error::Http { service, .. } => Some(service),
            _ => None,
        }
    }
}
