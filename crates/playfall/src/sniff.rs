//! A headless reference surface that validates container magic bytes.
//!
//! Where a browser surface asks a media element whether it can play the
//! stream, this surface range-fetches the payload head and checks the
//! container signature against the asserted MIME type. It gives the CLI and
//! integration setups a real surface without a rendering environment, with
//! the same error vocabulary a media element would use: a signature that
//! contradicts the assertion is `SrcNotSupported`, a recognized but mangled
//! header is `Decode`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::RANGE;
use tracing::debug;
use url::Url;

use crate::surface::{MediaErrorCode, PlaybackSurface, SurfaceSignal};

/// Container family detected from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// ISOBMFF with an `ftyp` box (MP4 and friends).
    Isobmff,
    /// ISOBMFF whose major brand declares QuickTime.
    QuickTime,
    /// EBML header (WebM/Matroska).
    Ebml,
    /// RIFF with an `AVI ` form type.
    Avi,
    /// An HLS manifest (`#EXTM3U`).
    HlsManifest,
}

/// Outcome of signature detection on a payload head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniff {
    /// A known container signature, intact.
    Recognized(Container),
    /// A known signature whose header is mangled: a decode-level problem,
    /// not a type mismatch.
    Malformed,
    /// No known signature.
    Unrecognized,
}

/// Detect the container family from the first bytes of a payload.
pub fn detect_container(data: &[u8]) -> Sniff {
    if data.starts_with(b"#EXTM3U") {
        return Sniff::Recognized(Container::HlsManifest);
    }

    // EBML magic for WebM/Matroska.
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        // The magic is followed by a VINT-sized header; anything shorter than
        // the minimal header is truncation.
        if data.len() < 8 {
            return Sniff::Malformed;
        }
        return Sniff::Recognized(Container::Ebml);
    }

    if data.starts_with(b"RIFF") {
        if data.len() < 12 {
            return Sniff::Malformed;
        }
        if &data[8..12] == b"AVI " {
            return Sniff::Recognized(Container::Avi);
        }
        return Sniff::Unrecognized;
    }

    // ISOBMFF: a 32-bit box size followed by `ftyp`.
    if data.len() >= 8 && &data[4..8] == b"ftyp" {
        let size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        // An ftyp smaller than its own header, or absurdly large, is a
        // mangled file rather than a different container.
        if size < 16 || size > 4096 {
            return Sniff::Malformed;
        }
        if data.len() >= 12 && &data[8..12] == b"qt  " {
            return Sniff::Recognized(Container::QuickTime);
        }
        return Sniff::Recognized(Container::Isobmff);
    }

    Sniff::Unrecognized
}

/// Whether a detected container satisfies a MIME assertion. An empty
/// assertion accepts any recognized container.
pub fn container_matches_mime(container: Container, mime: &str) -> bool {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() {
        return true;
    }

    match container {
        Container::Isobmff => essence == "video/mp4",
        // QuickTime files are ISOBMFF too; mp4 players commonly handle them.
        Container::QuickTime => essence == "video/quicktime" || essence == "video/mp4",
        Container::Ebml => essence == "video/webm" || essence == "video/x-matroska",
        Container::Avi => essence == "video/x-msvideo",
        Container::HlsManifest => {
            essence == "application/vnd.apple.mpegurl" || essence == "application/x-mpegurl"
        }
    }
}

/// The byte-sniffing surface.
pub struct SniffSurface {
    client: Client,
}

impl SniffSurface {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_head(&self, url: &Url) -> Result<Bytes, MediaErrorCode> {
        let response = self
            .client
            .get(url.clone())
            .header(RANGE, "bytes=0-1023")
            .send()
            .await
            .map_err(|_| MediaErrorCode::Network)?;

        if !response.status().is_success() {
            return Err(MediaErrorCode::Network);
        }

        response.bytes().await.map_err(|_| MediaErrorCode::Network)
    }
}

#[async_trait]
impl PlaybackSurface for SniffSurface {
    fn supports_segmented(&self) -> bool {
        true
    }

    async fn attach_native(&self, url: &Url, mime: &str) -> SurfaceSignal {
        let head = match self.fetch_head(url).await {
            Ok(head) => head,
            Err(code) => return SurfaceSignal::Error(code),
        };

        match detect_container(&head) {
            Sniff::Malformed => SurfaceSignal::Error(MediaErrorCode::Decode),
            Sniff::Unrecognized => SurfaceSignal::Error(MediaErrorCode::SrcNotSupported),
            Sniff::Recognized(container) => {
                if container_matches_mime(container, mime) {
                    debug!(url = %url, mime, ?container, "sniffed container matches assertion");
                    SurfaceSignal::Ready
                } else {
                    SurfaceSignal::Error(MediaErrorCode::SrcNotSupported)
                }
            }
        }
    }

    async fn attach_segmented(&self, url: &Url) -> SurfaceSignal {
        match self.fetch_head(url).await {
            Ok(head) if head.starts_with(b"#EXTM3U") => SurfaceSignal::Ready,
            Ok(_) => SurfaceSignal::Error(MediaErrorCode::SrcNotSupported),
            Err(code) => SurfaceSignal::Error(code),
        }
    }

    async fn attach_frame(&self, _url: &Url) {
        // Headless: nothing to render, the frame hand-off is a no-op.
    }

    async fn clear(&self) {
        // No element state to release.
    }
}
