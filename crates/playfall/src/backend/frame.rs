//! Embedded-frame playback: the last resort.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{AttachOutcome, BackendType, PlaybackBackend};
use crate::format::MimeCandidates;
use crate::session::PlaybackRequest;
use crate::surface::PlaybackSurface;

/// Directs the URL into an opaque embedded frame with no further diagnosis.
///
/// There is no feedback channel from the frame, so attachment is structural
/// success: something renders, whether or not the destination can actually
/// play the content. This is a display, not a diagnostic stage.
pub struct FrameBackend {
    surface: Arc<dyn PlaybackSurface>,
    attached: bool,
}

impl FrameBackend {
    pub fn new(surface: Arc<dyn PlaybackSurface>) -> Self {
        Self {
            surface,
            attached: false,
        }
    }
}

#[async_trait]
impl PlaybackBackend for FrameBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::EmbeddedFrame
    }

    async fn attach(
        &mut self,
        request: &PlaybackRequest,
        _candidates: &MimeCandidates,
    ) -> AttachOutcome {
        info!(url = %request.url, "falling back to embedded frame");
        self.attached = true;
        self.surface.attach_frame(&request.url).await;
        AttachOutcome::Success
    }

    async fn detach(&mut self) {
        if self.attached {
            self.surface.clear().await;
            self.attached = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHint;
    use crate::test_support::ScriptedSurface;
    use url::Url;

    #[tokio::test]
    async fn always_succeeds_structurally() {
        let surface = Arc::new(ScriptedSurface::new(vec![]));
        let mut backend = FrameBackend::new(surface.clone());

        let request = PlaybackRequest {
            url: Url::parse("https://example.com/opaque").unwrap(),
            declared_id: None,
        };
        let outcome = backend
            .attach(&request, &MimeCandidates::for_hint(FormatHint::Mp4))
            .await;

        assert!(outcome.is_success());
        assert_eq!(surface.frame_count(), 1);
    }
}
