use thiserror::Error;

/// Unified error type for the orchestrator.
///
/// Per-provider failures (`ProviderTimeout`, `ProviderTransport`, `ProviderRejected`,
/// `Interrupted`) are consumed by the failover loop and only reach the caller inside
/// [`Error::AllProvidersExhausted`]. `AllProvidersExhausted` and `NoEligibleProvider`
/// are terminal: the caller must surface them, never substitute a canned response.
#[derive(Debug, Error)]
pub enum Error {
    #[error("provider '{provider}' timed out after {elapsed_ms}ms")]
    ProviderTimeout { provider: String, elapsed_ms: u64 },

    #[error("provider '{provider}' transport error: {message}")]
    ProviderTransport { provider: String, message: String },

    #[error("provider '{provider}' rejected the request (HTTP {status}): {message}")]
    ProviderRejected {
        provider: String,
        status: u16,
        message: String,
    },

    /// The call was aborted after at least one byte of response arrived.
    /// Indeterminate outcome: must not move consecutive-failure counters.
    #[error("provider '{provider}' call interrupted after a partial response")]
    Interrupted { provider: String },

    #[error("all {attempts} candidate providers failed; last error: {last_error}")]
    AllProvidersExhausted {
        attempts: usize,
        last_error: Box<Error>,
    },

    #[error("no provider is eligible for this request")]
    NoEligibleProvider,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The provider a failure is attributed to, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Error::ProviderTimeout { provider, .. }
            | Error::ProviderTransport { provider, .. }
            | Error::ProviderRejected { provider, .. }
            | Error::Interrupted { provider } => Some(provider),
            _ => None,
        }
    }

    /// Terminal errors end the request; they are never absorbed by failover.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::AllProvidersExhausted { .. } | Error::NoEligibleProvider
        )
    }
}
