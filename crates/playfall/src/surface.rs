//! The playback surface seam.
//!
//! A surface is the caller-provided rendering target the backends attach to:
//! in a real player this wraps a native media element and an opaque embedded
//! frame, toggled by the session; in tests and the CLI it is a double or a
//! byte-sniffing stand-in. The engine never owns layout beyond these two
//! mount points.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Error family reported by a native media element, promoted from the
/// numeric code to an enum so backends can branch on it without magic
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    /// Fetch was aborted before the element became ready.
    Aborted,
    /// The element hit a network failure mid-load.
    Network,
    /// Bytes arrived but could not be decoded: the payload itself is bad.
    Decode,
    /// The source or its declared type is not supported by the element.
    SrcNotSupported,
}

impl MediaErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aborted => "aborted",
            Self::Network => "network",
            Self::Decode => "decode",
            Self::SrcNotSupported => "src_not_supported",
        }
    }
}

impl std::fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the surface reported back for one native attach attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSignal {
    /// The element reached a ready-to-play state.
    Ready,
    /// The element errored before becoming ready.
    Error(MediaErrorCode),
}

/// Rendering target provided by the embedding application.
///
/// Implementations must tolerate `clear()` at any time, including before any
/// attach and repeatedly; the session calls it unconditionally on teardown.
#[async_trait]
pub trait PlaybackSurface: Send + Sync {
    /// Whether this surface can drive manifest-based segmented playback.
    fn supports_segmented(&self) -> bool;

    /// Point the native element at `url` asserting `mime` (empty string for
    /// no type assertion), and wait for it to become ready or error out.
    async fn attach_native(&self, url: &Url, mime: &str) -> SurfaceSignal;

    /// Hand a manifest URL to the surface's segmented player.
    async fn attach_segmented(&self, url: &Url) -> SurfaceSignal;

    /// Direct the URL into the opaque embedded frame. There is no feedback
    /// channel from the frame; this either renders something or it does not.
    async fn attach_frame(&self, url: &Url);

    /// Release everything the surface holds for the current attachment.
    async fn clear(&self);
}
