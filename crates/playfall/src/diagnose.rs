//! Failure diagnosis: maps a probe result and a backend failure to one of a
//! fixed set of root causes with static remediation text.

use serde::{Deserialize, Serialize};

use crate::backend::{BackendFailure, FailureKind};
use crate::probe::ProbeResult;

/// Root cause of an exhausted cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    CorsPolicy,
    NetworkUnreachable,
    ContentTypeMismatch,
    DecodeCorrupt,
    UnsupportedMime,
    Unknown,
}

impl FailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CorsPolicy => "cors_policy",
            Self::NetworkUnreachable => "network_unreachable",
            Self::ContentTypeMismatch => "content_type_mismatch",
            Self::DecodeCorrupt => "decode_corrupt",
            Self::UnsupportedMime => "unsupported_mime",
            Self::Unknown => "unknown",
        }
    }

    /// Remediation templates are static data, not computed text.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::CorsPolicy => {
                "The hosting server does not allow cross-origin playback. Add an \
                 `Access-Control-Allow-Origin` header naming this site (or `*`) to the \
                 bucket/CDN CORS policy, then retry."
            }
            Self::NetworkUnreachable => {
                "The media host could not be reached. Check that the URL's host resolves, \
                 the object has not been deleted, and any signed-URL expiry is still valid, \
                 then retry."
            }
            Self::ContentTypeMismatch => {
                "The server declares a non-video content type for this object. Set the \
                 object's `Content-Type` metadata to the real container type (for example \
                 `video/mp4`), then retry."
            }
            Self::DecodeCorrupt => {
                "The file's bytes are corrupt or truncated and cannot be decoded. Re-upload \
                 the source file; retrying playback of the same object cannot succeed."
            }
            Self::UnsupportedMime => {
                "No supported container/codec combination matched this file. Re-encode to \
                 H.264/AAC in MP4 for the widest support, then retry."
            }
            Self::Unknown => {
                "Playback failed for an unrecognized reason. Check the browser console and \
                 the object's headers, then retry."
            }
        }
    }

    /// Whether a fresh session could plausibly succeed without changing the
    /// file itself. Reachability, CORS and content-type conditions can change
    /// between attempts; corrupt bytes cannot.
    pub fn retryable(&self) -> bool {
        !matches!(self, Self::DecodeCorrupt)
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal diagnosis shown to the user once all strategies are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub cause: FailureCause,
    pub remediation: &'static str,
    pub retryable: bool,
}

impl Diagnosis {
    pub fn from_cause(cause: FailureCause) -> Self {
        Self {
            cause,
            remediation: cause.remediation(),
            retryable: cause.retryable(),
        }
    }
}

/// Classify a terminal failure. Pure function.
///
/// Priority: an explicit decode-corrupt failure always wins regardless of
/// probe state; then the probe's priors in order (CORS, network, content
/// type); then the backend's unsupported-MIME report; then unknown.
pub fn classify(probe: &ProbeResult, failure: Option<&BackendFailure>) -> Diagnosis {
    if let Some(failure) = failure
        && failure.kind == FailureKind::DecodeCorrupt
    {
        return Diagnosis::from_cause(FailureCause::DecodeCorrupt);
    }

    if probe.cors_blocked {
        return Diagnosis::from_cause(FailureCause::CorsPolicy);
    }
    if probe.network_error || !probe.reachable {
        return Diagnosis::from_cause(FailureCause::NetworkUnreachable);
    }
    if probe.content_type_suspect {
        return Diagnosis::from_cause(FailureCause::ContentTypeMismatch);
    }

    match failure.map(|f| f.kind) {
        Some(FailureKind::UnsupportedMime) => Diagnosis::from_cause(FailureCause::UnsupportedMime),
        Some(FailureKind::Network) => Diagnosis::from_cause(FailureCause::NetworkUnreachable),
        _ => Diagnosis::from_cause(FailureCause::Unknown),
    }
}
