//! Progressive playback: the native element plus a MIME sub-cascade.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{AttachOutcome, BackendType, FailureKind, PlaybackBackend};
use crate::format::MimeCandidates;
use crate::session::PlaybackRequest;
use crate::surface::{MediaErrorCode, PlaybackSurface, SurfaceSignal};

/// Attaches the native element directly to the byte stream and walks the
/// candidate list one type assertion at a time.
///
/// The sub-cascade rule: a decode error ends the walk immediately, because
/// further MIME strings cannot fix a corrupt byte stream. An unsupported
/// source advances to the next candidate, and failure is only reported once
/// the list is exhausted.
pub struct ProgressiveBackend {
    surface: Arc<dyn PlaybackSurface>,
    attached: bool,
}

impl ProgressiveBackend {
    pub fn new(surface: Arc<dyn PlaybackSurface>) -> Self {
        Self {
            surface,
            attached: false,
        }
    }
}

#[async_trait]
impl PlaybackBackend for ProgressiveBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Progressive
    }

    async fn attach(
        &mut self,
        request: &PlaybackRequest,
        candidates: &MimeCandidates,
    ) -> AttachOutcome {
        // The element may hold buffers from a failed candidate; each new
        // assertion starts from a cleared surface.
        let mut last_error = MediaErrorCode::SrcNotSupported;

        for (index, mime) in candidates.iter().enumerate() {
            if self.attached {
                self.surface.clear().await;
                self.attached = false;
            }

            debug!(
                url = %request.url,
                mime,
                candidate = index + 1,
                total = candidates.len(),
                "trying progressive candidate"
            );

            self.attached = true;
            match self.surface.attach_native(&request.url, mime).await {
                SurfaceSignal::Ready => {
                    info!(url = %request.url, mime, "progressive playback ready");
                    return AttachOutcome::Success;
                }
                SurfaceSignal::Error(MediaErrorCode::Decode) => {
                    warn!(url = %request.url, mime, "decode error, aborting candidate walk");
                    return AttachOutcome::failure(
                        FailureKind::DecodeCorrupt,
                        format!("element reported a decode error for `{mime}`"),
                    );
                }
                SurfaceSignal::Error(code) => {
                    debug!(url = %request.url, mime, code = %code, "candidate rejected");
                    last_error = code;
                }
            }
        }

        let kind = FailureKind::from_media_error(last_error);
        AttachOutcome::failure(
            kind,
            format!(
                "all {} MIME candidates rejected, last error `{last_error}`",
                candidates.len()
            ),
        )
    }

    async fn detach(&mut self) {
        if self.attached {
            self.surface.clear().await;
            self.attached = false;
        }
    }
}
