//! Playback backend drivers.
//!
//! A backend is one strategy for rendering a media URL. Backends are trait
//! objects owned exclusively by a session: at most one is live at any time,
//! and `detach()` must be idempotent and safe even when `attach()` never
//! completed.

mod frame;
mod progressive;
mod segmented;

pub use frame::FrameBackend;
pub use progressive::ProgressiveBackend;
pub use segmented::SegmentedBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::format::MimeCandidates;
use crate::session::PlaybackRequest;
use crate::surface::MediaErrorCode;

/// Kind of playback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Manifest-driven chunked playback.
    Segmented,
    /// Direct byte-range playback through the native element.
    Progressive,
    /// Opaque embedded frame, the terminal fallback.
    EmbeddedFrame,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segmented => "segmented",
            Self::Progressive => "progressive",
            Self::EmbeddedFrame => "embedded-frame",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a backend attempt failed, as far as cascade control is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The payload itself is bad; no MIME or backend permutation can fix it.
    DecodeCorrupt,
    /// Every tried MIME was rejected as unsupported.
    UnsupportedMime,
    /// Transport-level failure while loading.
    Network,
    /// The attempt was aborted before completing.
    Aborted,
    /// The segmented backend hit a fatal internal error; escalate to
    /// progressive with the same URL rather than retrying segmented.
    SegmentedFatal,
}

impl FailureKind {
    /// Fatal-and-final failures end the cascade outright.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DecodeCorrupt)
    }

    pub fn from_media_error(code: MediaErrorCode) -> Self {
        match code {
            MediaErrorCode::Decode => Self::DecodeCorrupt,
            MediaErrorCode::SrcNotSupported => Self::UnsupportedMime,
            MediaErrorCode::Network => Self::Network,
            MediaErrorCode::Aborted => Self::Aborted,
        }
    }
}

/// A failed backend attempt with enough detail for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl BackendFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

/// Result of one backend attach attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachOutcome {
    /// The backend rendered (or, for the embedded frame, structurally
    /// attached) the media.
    Success,
    Failure(BackendFailure),
}

impl AttachOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure(BackendFailure::new(kind, detail))
    }
}

/// One pluggable playback strategy.
#[async_trait]
pub trait PlaybackBackend: Send {
    /// Which backend this is, for the attempt log and status reporting.
    fn backend_type(&self) -> BackendType;

    /// Try to render the request. The candidate list is in priority order;
    /// how it is consumed (one type assertion, a sub-cascade, or ignored
    /// entirely) is backend-specific.
    async fn attach(
        &mut self,
        request: &PlaybackRequest,
        candidates: &MimeCandidates,
    ) -> AttachOutcome;

    /// Release all resources held for the current attachment. Must be safe
    /// to call twice, and safe when `attach` never ran or never completed.
    async fn detach(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_corrupt_is_the_only_fatal_kind() {
        assert!(FailureKind::DecodeCorrupt.is_fatal());
        assert!(!FailureKind::UnsupportedMime.is_fatal());
        assert!(!FailureKind::Network.is_fatal());
        assert!(!FailureKind::SegmentedFatal.is_fatal());
    }

    #[test]
    fn media_error_mapping() {
        assert_eq!(
            FailureKind::from_media_error(MediaErrorCode::Decode),
            FailureKind::DecodeCorrupt
        );
        assert_eq!(
            FailureKind::from_media_error(MediaErrorCode::SrcNotSupported),
            FailureKind::UnsupportedMime
        );
    }
}
