//! Integration tests for the full resolution cascade.
//!
//! These drive a real `PlaybackResolver` over scripted surface doubles and a
//! canned prober, so no test here touches the network. The HTTP-facing
//! segmented backend has its own suite in `segmented_http.rs`.

use std::sync::Arc;

use playfall_engine::backend::{AttachOutcome, BackendType};
use playfall_engine::config::ResolverConfig;
use playfall_engine::diagnose::FailureCause;
use playfall_engine::error::ResolveError;
use playfall_engine::probe::ProbeResult;
use playfall_engine::session::{PlaybackResolver, RequestHints, SessionPhase};
use playfall_engine::surface::{MediaErrorCode, SurfaceSignal};
use playfall_engine::test_support::{
    CallJournal, FixedProber, JournalingSurface, ScriptedSurface, StalledSurface,
};

/// Build a resolver over the given surface with an always-clean prober.
fn resolver(
    surface: Arc<dyn playfall_engine::surface::PlaybackSurface>,
) -> PlaybackResolver {
    PlaybackResolver::new(ResolverConfig::default(), surface)
        .expect("resolver construction")
        .with_prober(Arc::new(FixedProber(ProbeResult::default())))
}

fn resolver_with_probe(
    surface: Arc<dyn playfall_engine::surface::PlaybackSurface>,
    probe: ProbeResult,
) -> PlaybackResolver {
    PlaybackResolver::new(ResolverConfig::default(), surface)
        .expect("resolver construction")
        .with_prober(Arc::new(FixedProber(probe)))
}

mod strategy_selection {
    use super::*;

    #[tokio::test]
    async fn manifest_url_on_plain_surface_starts_progressive() {
        // Surface reports no segmented support, so the manifest hint must
        // not produce a segmented attempt at all.
        let surface = Arc::new(ScriptedSurface::new(vec![SurfaceSignal::Ready]));
        let resolver = resolver(surface.clone());

        let report = resolver
            .resolve("https://cdn.example.com/live/stream.m3u8", RequestHints::default())
            .await
            .expect("resolve");

        assert_eq!(report.phase, SessionPhase::Succeeded);
        assert!(report.verified_playback());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].backend, BackendType::Progressive);
        assert!(
            report
                .attempts
                .iter()
                .all(|a| a.backend != BackendType::Segmented)
        );
        assert_eq!(surface.segmented_attach_count(), 0);
    }

    #[tokio::test]
    async fn plain_mp4_success_leaves_no_diagnosis() {
        let surface = Arc::new(ScriptedSurface::new(vec![SurfaceSignal::Ready]));
        let resolver = resolver(surface.clone());

        let report = resolver
            .resolve("https://cdn.example.com/v/clip.mp4", RequestHints::default())
            .await
            .expect("resolve");

        assert!(report.verified_playback());
        assert!(report.diagnosis.is_none());
        assert!(report.raw_url_affordance.is_none());
        assert_eq!(surface.frame_count(), 0);
    }

    #[tokio::test]
    async fn invalid_url_fails_before_any_attach() {
        let surface = Arc::new(ScriptedSurface::new(vec![SurfaceSignal::Ready]));
        let resolver = resolver(surface.clone());

        let result = resolver.resolve("not a url", RequestHints::default()).await;

        assert!(matches!(result, Err(ResolveError::InvalidUrl { .. })));
        assert_eq!(surface.native_attach_count(), 0);
        assert_eq!(surface.frame_count(), 0);
    }
}

mod fatal_failures {
    use super::*;

    #[tokio::test]
    async fn decode_corrupt_ends_the_cascade_without_a_frame() {
        let surface = Arc::new(ScriptedSurface::new(vec![SurfaceSignal::Error(
            MediaErrorCode::Decode,
        )]));
        let resolver = resolver(surface.clone());

        let report = resolver
            .resolve("https://cdn.example.com/v/broken.mp4", RequestHints::default())
            .await
            .expect("resolve");

        assert_eq!(report.phase, SessionPhase::Exhausted);
        let diagnosis = report.diagnosis.expect("exhausted report carries a diagnosis");
        assert_eq!(diagnosis.cause, FailureCause::DecodeCorrupt);
        assert!(!diagnosis.retryable);
        assert!(report.raw_url_affordance.is_some());
        // No embedded-frame attempt for a corrupt payload.
        assert!(
            report
                .attempts
                .iter()
                .all(|a| a.backend != BackendType::EmbeddedFrame)
        );
        assert_eq!(surface.frame_count(), 0);
    }

    #[tokio::test]
    async fn exhausted_attempt_log_records_the_failure() {
        let surface = Arc::new(ScriptedSurface::new(vec![SurfaceSignal::Error(
            MediaErrorCode::Decode,
        )]));
        let resolver = resolver(surface);

        let report = resolver
            .resolve("https://cdn.example.com/v/broken.mp4", RequestHints::default())
            .await
            .expect("resolve");

        assert_eq!(report.attempts.len(), 1);
        let attempt = &report.attempts[0];
        assert_eq!(attempt.backend, BackendType::Progressive);
        assert!(!attempt.mime.is_empty());
        assert!(matches!(attempt.outcome, AttachOutcome::Failure(_)));
    }
}

mod frame_fallback {
    use super::*;

    #[tokio::test]
    async fn unsupported_everywhere_falls_to_the_frame_optimistically() {
        // Every MIME candidate rejected; the frame still renders something.
        let surface = Arc::new(ScriptedSurface::new(vec![
            SurfaceSignal::Error(
                MediaErrorCode::SrcNotSupported
            );
            4
        ]));
        let resolver = resolver(surface.clone());

        let report = resolver
            .resolve("https://cdn.example.com/v/odd.mp4", RequestHints::default())
            .await
            .expect("resolve");

        // Optimistic close: the frame has no feedback channel, so the phase
        // is a success, but the underlying diagnosis rides along.
        assert_eq!(report.phase, SessionPhase::Succeeded);
        assert!(!report.verified_playback());
        let diagnosis = report.diagnosis.expect("underlying failure is reported");
        assert_eq!(diagnosis.cause, FailureCause::UnsupportedMime);
        assert!(report.raw_url_affordance.is_some());
        assert_eq!(surface.frame_count(), 1);

        let backends: Vec<_> = report.attempts.iter().map(|a| a.backend).collect();
        assert_eq!(
            backends,
            vec![BackendType::Progressive, BackendType::EmbeddedFrame]
        );
        assert!(report.attempts[1].mime.is_empty());
        assert!(report.attempts[1].outcome.is_success());
    }
}

mod diagnosis_priorities {
    use super::*;

    #[tokio::test]
    async fn cors_block_outranks_unsupported_mime() {
        let surface = Arc::new(ScriptedSurface::new(vec![
            SurfaceSignal::Error(
                MediaErrorCode::SrcNotSupported
            );
            4
        ]));
        let probe = ProbeResult {
            cors_blocked: true,
            ..ProbeResult::default()
        };
        let resolver = resolver_with_probe(surface, probe);

        let report = resolver
            .resolve("https://cdn.example.com/v/clip.mp4", RequestHints::default())
            .await
            .expect("resolve");

        let diagnosis = report.diagnosis.expect("diagnosis");
        assert_eq!(diagnosis.cause, FailureCause::CorsPolicy);
        assert!(diagnosis.retryable);
    }

    #[tokio::test]
    async fn suspect_content_type_on_storage_url_maps_to_mismatch() {
        let surface = Arc::new(ScriptedSurface::new(vec![
            SurfaceSignal::Error(
                MediaErrorCode::SrcNotSupported
            );
            4
        ]));
        // A bucket that serves no Content-Type at all.
        let probe = ProbeResult {
            content_type_declared: None,
            content_type_suspect: true,
            ..ProbeResult::default()
        };
        let resolver = resolver_with_probe(surface, probe);

        let report = resolver
            .resolve(
                "https://bucket.s3.amazonaws.com/media/clip.mp4",
                RequestHints::default(),
            )
            .await
            .expect("resolve");

        let diagnosis = report.diagnosis.expect("diagnosis");
        assert_eq!(diagnosis.cause, FailureCause::ContentTypeMismatch);
        assert!(diagnosis.retryable);
        assert!(!diagnosis.remediation.is_empty());
    }
}

mod supersession {
    use super::*;

    #[tokio::test]
    async fn new_session_detaches_the_previous_backend_first() {
        let journal = CallJournal::default();
        let surface = Arc::new(JournalingSurface::new(
            journal.clone(),
            "s",
            SurfaceSignal::Ready,
        ));
        let resolver = resolver(surface);

        resolver
            .resolve("https://cdn.example.com/v/first.mp4", RequestHints::default())
            .await
            .expect("first resolve");
        resolver
            .resolve("https://cdn.example.com/v/second.mp4", RequestHints::default())
            .await
            .expect("second resolve");

        let entries = journal.entries();
        let attaches: Vec<_> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.starts_with("s:attach"))
            .map(|(i, _)| i)
            .collect();
        let clears: Vec<_> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| *e == "s:clear")
            .map(|(i, _)| i)
            .collect();

        assert_eq!(attaches.len(), 2, "journal: {entries:?}");
        assert_eq!(clears.len(), 1, "journal: {entries:?}");
        // The clear sits strictly between the two attaches.
        assert!(attaches[0] < clears[0] && clears[0] < attaches[1]);
    }

    #[tokio::test]
    async fn superseding_mid_flight_cancels_and_clears_the_stalled_attach() {
        let journal = CallJournal::default();
        let surface = Arc::new(StalledSurface::new(journal.clone()));
        let resolver = Arc::new(resolver(surface.clone()));

        let first = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                resolver
                    .resolve("https://cdn.example.com/v/slow.mp4", RequestHints::default())
                    .await
            })
        };
        surface.wait_for_attach().await;

        // Superseding request; it fails validation, but only after it has
        // interrupted and torn down the stalled session.
        let second = resolver.resolve("not a url", RequestHints::default()).await;
        assert!(matches!(second, Err(ResolveError::InvalidUrl { .. })));

        let first = first.await.expect("task join");
        assert!(matches!(first, Err(ResolveError::Cancelled)));

        let entries = journal.entries();
        assert_eq!(
            entries,
            vec!["stalled:attach-start".to_string(), "stalled:clear".to_string()],
            "the cancelled session must clear the surface it half-attached"
        );
    }

    #[tokio::test]
    async fn session_tokens_are_monotonic() {
        let surface = Arc::new(ScriptedSurface::new(vec![
            SurfaceSignal::Ready,
            SurfaceSignal::Ready,
            SurfaceSignal::Ready,
        ]));
        let resolver = resolver(surface);

        let mut last = 0;
        for url in [
            "https://cdn.example.com/v/a.mp4",
            "https://cdn.example.com/v/b.mp4",
            "https://cdn.example.com/v/c.mp4",
        ] {
            let report = resolver
                .resolve(url, RequestHints::default())
                .await
                .expect("resolve");
            assert!(report.session > last);
            last = report.session;
        }
    }
}

mod status_stream {
    use super::*;

    #[tokio::test]
    async fn updates_carry_the_session_token_and_phases_in_order() {
        let surface = Arc::new(ScriptedSurface::new(vec![SurfaceSignal::Ready]));
        let resolver = resolver(surface);
        let mut updates = resolver.subscribe();

        let report = resolver
            .resolve("https://cdn.example.com/v/clip.mp4", RequestHints::default())
            .await
            .expect("resolve");

        let mut phases = Vec::new();
        while let Ok(update) = updates.try_recv() {
            assert_eq!(update.session, report.session);
            phases.push(update.phase);
        }
        assert_eq!(
            phases,
            vec![
                SessionPhase::Probing,
                SessionPhase::Attempting(BackendType::Progressive),
                SessionPhase::Succeeded,
            ]
        );
    }

    #[tokio::test]
    async fn terminal_update_carries_the_diagnosis() {
        let surface = Arc::new(ScriptedSurface::new(vec![SurfaceSignal::Error(
            MediaErrorCode::Decode,
        )]));
        let resolver = resolver(surface);
        let mut updates = resolver.subscribe();

        resolver
            .resolve("https://cdn.example.com/v/broken.mp4", RequestHints::default())
            .await
            .expect("resolve");

        let mut terminal_diagnosis = None;
        while let Ok(update) = updates.try_recv() {
            if update.phase == SessionPhase::Exhausted {
                terminal_diagnosis = update.diagnosis;
            }
        }
        let diagnosis = terminal_diagnosis.expect("exhausted update carries diagnosis");
        assert_eq!(diagnosis.cause, FailureCause::DecodeCorrupt);
    }
}
