/// Engine-wide result type.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors surfaced to the caller of the resolver.
///
/// Cascade outcomes (an unreachable host, a MIME nobody supports, a corrupt
/// payload) are not errors from the caller's point of view; they are reported
/// as a [`crate::diagnose::Diagnosis`] inside the session report. This enum
/// only covers inputs the engine refuses to work with and internal faults.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("session cancelled")]
    Cancelled,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl ResolveError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Whether a fresh session against the same URL could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled | Self::InvalidUrl { .. } | Self::Configuration { .. } => false,
            Self::Network { .. } | Self::Internal { .. } => true,
        }
    }
}
