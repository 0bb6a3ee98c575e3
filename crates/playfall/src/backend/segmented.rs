//! Segmented-stream playback: manifest fetch, variant resolution, and
//! hand-off to the surface's segmented player.

use std::sync::Arc;

use async_trait::async_trait;
use m3u8_rs::Playlist;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::{AttachOutcome, BackendType, FailureKind, PlaybackBackend};
use crate::format::MimeCandidates;
use crate::session::PlaybackRequest;
use crate::surface::{PlaybackSurface, SurfaceSignal};

/// Drives manifest-based playback when the surface supports it.
///
/// Every failure here is tagged [`FailureKind::SegmentedFatal`]: the state
/// machine escalates to progressive playback of the same URL rather than
/// retrying the segmented path.
pub struct SegmentedBackend {
    client: Client,
    surface: Arc<dyn PlaybackSurface>,
    attached: bool,
}

impl SegmentedBackend {
    pub fn new(client: Client, surface: Arc<dyn PlaybackSurface>) -> Self {
        Self {
            client,
            surface,
            attached: false,
        }
    }

    /// Fetch and parse the manifest, chasing one level of master -> media
    /// indirection, and return the first media segment URL.
    async fn resolve_first_segment(&self, manifest_url: &Url) -> Result<Url, String> {
        let media = match self.fetch_playlist(manifest_url).await? {
            Playlist::MediaPlaylist(media) => media,
            Playlist::MasterPlaylist(master) => {
                let variant = master
                    .variants
                    .first()
                    .ok_or_else(|| "master playlist has no variants".to_string())?;
                let variant_url = manifest_url
                    .join(&variant.uri)
                    .map_err(|e| format!("invalid variant URI `{}`: {e}", variant.uri))?;
                debug!(variant = %variant_url, "resolved master playlist variant");
                match self.fetch_playlist(&variant_url).await? {
                    Playlist::MediaPlaylist(media) => media,
                    Playlist::MasterPlaylist(_) => {
                        return Err("variant resolved to another master playlist".to_string());
                    }
                }
            }
        };

        let segment = media
            .segments
            .first()
            .ok_or_else(|| "media playlist has no segments".to_string())?;
        manifest_url
            .join(&segment.uri)
            .map_err(|e| format!("invalid segment URI `{}`: {e}", segment.uri))
    }

    async fn fetch_playlist(&self, url: &Url) -> Result<Playlist, String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| format!("manifest fetch failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("manifest fetch got HTTP {}", response.status()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| format!("manifest read failed: {e}"))?;

        m3u8_rs::parse_playlist_res(&body)
            .map_err(|e| format!("manifest parse failed: {e}"))
    }

    /// Confirm the first segment is actually fetchable before committing the
    /// surface to this manifest.
    async fn check_segment(&self, segment_url: &Url) -> Result<(), String> {
        let response = self
            .client
            .get(segment_url.clone())
            .header(reqwest::header::RANGE, "bytes=0-1023")
            .send()
            .await
            .map_err(|e| format!("segment fetch failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("segment fetch got HTTP {}", response.status()))
        }
    }
}

#[async_trait]
impl PlaybackBackend for SegmentedBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Segmented
    }

    async fn attach(
        &mut self,
        request: &PlaybackRequest,
        _candidates: &MimeCandidates,
    ) -> AttachOutcome {
        if !self.surface.supports_segmented() {
            // The state machine skips segmented on unsupported surfaces; this
            // guard covers callers driving the backend directly.
            return AttachOutcome::failure(
                FailureKind::SegmentedFatal,
                "surface does not support segmented playback",
            );
        }

        let segment_url = match self.resolve_first_segment(&request.url).await {
            Ok(url) => url,
            Err(reason) => {
                warn!(url = %request.url, reason, "segmented manifest resolution failed");
                return AttachOutcome::failure(FailureKind::SegmentedFatal, reason);
            }
        };

        if let Err(reason) = self.check_segment(&segment_url).await {
            warn!(url = %request.url, segment = %segment_url, reason, "first segment unreachable");
            return AttachOutcome::failure(FailureKind::SegmentedFatal, reason);
        }

        self.attached = true;
        match self.surface.attach_segmented(&request.url).await {
            SurfaceSignal::Ready => {
                info!(url = %request.url, "segmented playback ready");
                AttachOutcome::Success
            }
            SurfaceSignal::Error(code) => AttachOutcome::failure(
                FailureKind::SegmentedFatal,
                format!("segmented player error `{code}`"),
            ),
        }
    }

    async fn detach(&mut self) {
        if self.attached {
            self.surface.clear().await;
            self.attached = false;
        }
    }
}
