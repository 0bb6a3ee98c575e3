//! Playback sessions and the strategy state machine.
//!
//! A session owns its active backend exclusively: at most one backend is live
//! at any time, and tearing down the previous one always completes before a
//! new attach runs. That single invariant is what prevents leaked media
//! elements and half-dead streams, both within a session's cascade and across
//! session supersession.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::backend::{
    AttachOutcome, BackendFailure, BackendType, FrameBackend, PlaybackBackend, ProgressiveBackend,
    SegmentedBackend,
};
use crate::config::ResolverConfig;
use crate::diagnose::{self, Diagnosis};
use crate::error::{ResolveError, Result};
use crate::format::{self, FormatHint, MimeCandidates};
use crate::probe::{AccessibilityProber, HttpProber, ProbeResult};
use crate::surface::PlaybackSurface;
use crate::validate::{Validation, validate_media_url};

/// The immutable input of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub url: Url,
    /// Caller-declared media identifier, carried through for reporting only.
    pub declared_id: Option<String>,
}

/// Optional hints supplied alongside the URL.
#[derive(Debug, Clone, Default)]
pub struct RequestHints {
    pub declared_id: Option<String>,
}

/// Phase of the strategy state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Probing,
    Attempting(BackendType),
    Succeeded,
    Exhausted,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }

    /// Validate a phase transition.
    ///
    /// Terminal phases accept nothing; the only way back to `Attempting` is
    /// a user-initiated retry, which always starts a fresh session.
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use BackendType::*;
        use SessionPhase::*;

        match (self, target) {
            (Idle, Probing) => true,
            (Idle | Probing, Attempting(Segmented | Progressive)) => true,
            (Attempting(Segmented), Succeeded | Attempting(Progressive)) => true,
            (Attempting(Progressive), Succeeded | Exhausted | Attempting(EmbeddedFrame)) => true,
            (Attempting(EmbeddedFrame), Succeeded | Exhausted) => true,
            _ => false,
        }
    }

    pub fn transition_to(&self, target: SessionPhase) -> Result<SessionPhase> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(ResolveError::internal(format!(
                "illegal phase transition {self:?} -> {target:?}"
            )))
        }
    }
}

/// One entry of the session's attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub backend: BackendType,
    /// The primary MIME assertion of the attempt (empty when the backend
    /// takes no type assertion, as the embedded frame does).
    pub mime: String,
    pub outcome: AttachOutcome,
    pub at: DateTime<Utc>,
}

/// Structured status emitted for an external UI reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    /// Monotonic session token; consumers drop updates from stale tokens.
    pub session: u64,
    pub phase: SessionPhase,
    pub active_backend: Option<BackendType>,
    pub diagnosis: Option<Diagnosis>,
}

/// Final report of a resolved session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub session: u64,
    pub url: String,
    pub declared_id: Option<String>,
    pub hint: FormatHint,
    pub phase: SessionPhase,
    pub probe: ProbeResult,
    pub attempts: Vec<AttemptRecord>,
    /// Present whenever the cascade did not cleanly succeed, even when the
    /// embedded frame rendered something: the frame cannot confirm playback,
    /// so the underlying cause rides along for the UI to show.
    pub diagnosis: Option<Diagnosis>,
    /// Manual "open the raw URL" affordance, offered on terminal failure.
    pub raw_url_affordance: Option<String>,
}

impl SessionReport {
    /// Whether the outcome was a verified playback, as opposed to the
    /// optimistic embedded-frame fallback.
    pub fn verified_playback(&self) -> bool {
        self.phase == SessionPhase::Succeeded && self.diagnosis.is_none()
    }
}

/// State a finished session leaves behind so the next session can tear its
/// backend down before attaching anything.
struct LiveSession {
    token: u64,
    backend: Option<Box<dyn PlaybackBackend>>,
}

/// The running state of one cascade, owned by a single `resolve` call.
struct PlaybackSession {
    token: u64,
    request: PlaybackRequest,
    hint: FormatHint,
    phase: SessionPhase,
    attempt_log: Vec<AttemptRecord>,
    active_backend: Option<Box<dyn PlaybackBackend>>,
    probe_task: Option<JoinHandle<ProbeResult>>,
    cancel: CancellationToken,
}

impl PlaybackSession {
    /// Replace the active backend, unconditionally detaching any previous one
    /// before the replacement is touched.
    async fn swap_backend(&mut self, next: Box<dyn PlaybackBackend>) {
        if let Some(mut prev) = self.active_backend.take() {
            debug!(session = self.token, backend = %prev.backend_type(), "detaching previous backend");
            prev.detach().await;
        }
        self.active_backend = Some(next);
    }

    /// Run one attach attempt on the current active backend, honoring
    /// cancellation, and append the outcome to the attempt log.
    async fn run_attempt(&mut self, candidates: &MimeCandidates) -> Result<AttachOutcome> {
        let token = self.token;
        let cancel = self.cancel.clone();
        let request = self.request.clone();
        let backend = self
            .active_backend
            .as_mut()
            .ok_or_else(|| ResolveError::internal("attempt without an active backend"))?;
        let backend_type = backend.backend_type();
        let mime = match backend_type {
            BackendType::EmbeddedFrame => String::new(),
            _ => candidates.primary().to_string(),
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(session = token, "attach superseded mid-flight, ignoring result");
                return Err(ResolveError::Cancelled);
            }
            outcome = backend.attach(&request, candidates) => outcome,
        };

        self.attempt_log.push(AttemptRecord {
            backend: backend_type,
            mime,
            outcome: outcome.clone(),
            at: Utc::now(),
        });
        Ok(outcome)
    }

    /// Wait briefly for the probe task; fall back to the optimistic default
    /// if it has not settled. The probe must never block diagnosis for long.
    async fn probe_result(&mut self, grace: std::time::Duration) -> ProbeResult {
        let Some(mut task) = self.probe_task.take() else {
            return ProbeResult::default();
        };
        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(session = self.token, error = %e, "probe task failed, assuming reachable");
                ProbeResult::default()
            }
            Err(_) => {
                debug!(session = self.token, "probe still pending at diagnosis, assuming reachable");
                task.abort();
                ProbeResult::default()
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(mut backend) = self.active_backend.take() {
            backend.detach().await;
        }
        if let Some(task) = self.probe_task.take() {
            task.abort();
        }
    }
}

/// Orchestrates playback sessions: validation, probing, the backend cascade,
/// diagnosis, and session supersession.
pub struct PlaybackResolver {
    config: ResolverConfig,
    client: reqwest::Client,
    surface: Arc<dyn PlaybackSurface>,
    prober: Arc<dyn AccessibilityProber>,
    next_token: AtomicU64,
    /// Cancellation handle of the in-flight session, if any. Held outside the
    /// live-session lock so supersession can interrupt a running cascade.
    current_cancel: Mutex<Option<CancellationToken>>,
    /// The finished session whose backend is still attached to the surface.
    /// Also serializes cascades: a resolve call holds this lock end to end.
    live: tokio::sync::Mutex<Option<LiveSession>>,
    status_tx: broadcast::Sender<StatusUpdate>,
}

impl PlaybackResolver {
    pub fn new(config: ResolverConfig, surface: Arc<dyn PlaybackSurface>) -> Result<Self> {
        let client = config.build_client()?;
        let (status_tx, _) = broadcast::channel(64);
        let prober = Arc::new(HttpProber::new(client.clone(), config.clone()));
        Ok(Self {
            config,
            client,
            surface,
            prober,
            next_token: AtomicU64::new(0),
            current_cancel: Mutex::new(None),
            live: tokio::sync::Mutex::new(None),
            status_tx,
        })
    }

    /// Substitute the accessibility prober. Mainly for embedders that
    /// already know the environment, and for tests.
    pub fn with_prober(mut self, prober: Arc<dyn AccessibilityProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Subscribe to structured status updates for an external UI reporter.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.status_tx.subscribe()
    }

    /// The HTTP client shared by the probe and the segmented backend.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Resolve playback for a URL, driving the full strategy cascade.
    ///
    /// Starting a new resolution supersedes any session still running or
    /// still attached: the previous backend is detached before this session
    /// attaches anything.
    pub async fn resolve(&self, url: &str, hints: RequestHints) -> Result<SessionReport> {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        // Interrupt an in-flight cascade before queueing on the session lock,
        // otherwise a long attach would stall supersession.
        if let Some(prev) = self.current_cancel.lock().replace(cancel.clone()) {
            prev.cancel();
        }

        let mut live = self.live.lock().await;
        if cancel.is_cancelled() {
            // Superseded while waiting for our turn.
            return Err(ResolveError::Cancelled);
        }

        // Tear down whatever the previous session left attached.
        if let Some(mut prev) = live.take() {
            debug!(superseded = prev.token, session = token, "superseding live session");
            if let Some(mut backend) = prev.backend.take() {
                backend.detach().await;
            }
        }

        // Fail fast on bad input; no network call is made for an invalid URL.
        let parsed = match validate_media_url(url) {
            Validation::Valid(parsed) => parsed,
            Validation::Invalid { reason } => {
                return Err(ResolveError::invalid_url(url, reason));
            }
        };

        let request = PlaybackRequest {
            url: parsed,
            declared_id: hints.declared_id,
        };
        let hint = format::classify_url(&request.url);
        info!(session = token, url = %request.url, hint = %hint, "starting playback session");

        let mut session = PlaybackSession {
            token,
            request,
            hint,
            phase: SessionPhase::Idle,
            attempt_log: Vec::new(),
            active_backend: None,
            probe_task: None,
            cancel,
        };

        let report = match self.run_cascade(&mut session).await {
            Ok(report) => report,
            Err(e) => {
                session.teardown().await;
                return Err(e);
            }
        };

        *live = Some(LiveSession {
            token,
            backend: session.active_backend.take(),
        });
        if let Some(task) = session.probe_task.take() {
            task.abort();
        }
        Ok(report)
    }

    async fn run_cascade(&self, session: &mut PlaybackSession) -> Result<SessionReport> {
        // Fire-and-forget probe; it only pre-seeds diagnosis and must never
        // delay the first attempt.
        self.transition(session, SessionPhase::Probing)?;
        let prober = self.prober.clone();
        let probe_url = session.request.url.clone();
        session.probe_task = Some(tokio::spawn(
            async move { prober.probe(&probe_url).await },
        ));

        let candidates = MimeCandidates::for_hint(session.hint);

        // Segmented is only worth attempting when both the hint and the
        // surface agree; otherwise the cascade starts at progressive.
        if session.hint == FormatHint::SegmentedStream && self.surface.supports_segmented() {
            self.transition(session, SessionPhase::Attempting(BackendType::Segmented))?;
            session
                .swap_backend(Box::new(SegmentedBackend::new(
                    self.client.clone(),
                    self.surface.clone(),
                )))
                .await;
            match session.run_attempt(&candidates).await? {
                AttachOutcome::Success => {
                    return self.finish_success(session, None).await;
                }
                AttachOutcome::Failure(failure) => {
                    // Escalate: the same URL goes through progressive next,
                    // and diagnosis will be based on how that attempt ends.
                    warn!(session = session.token, %failure, "segmented backend failed, escalating");
                }
            }
        }

        // Progressive attempt, same URL, fresh candidate list.
        self.transition(session, SessionPhase::Attempting(BackendType::Progressive))?;
        session
            .swap_backend(Box::new(ProgressiveBackend::new(self.surface.clone())))
            .await;
        let failure = match session.run_attempt(&candidates).await? {
            AttachOutcome::Success => {
                return self.finish_success(session, None).await;
            }
            AttachOutcome::Failure(failure) => failure,
        };

        if failure.kind.is_fatal() {
            // An opaque frame cannot fix a corrupt file either; end the
            // cascade, but keep the raw URL as a manual affordance.
            return self.finish_exhausted(session, Some(failure)).await;
        }

        // Last resort: the embedded frame. Structurally always succeeds, and
        // with no feedback channel from the frame the session closes
        // optimistically; the diagnosis of the underlying failure rides along.
        self.transition(session, SessionPhase::Attempting(BackendType::EmbeddedFrame))?;
        session
            .swap_backend(Box::new(FrameBackend::new(self.surface.clone())))
            .await;
        match session.run_attempt(&candidates).await? {
            AttachOutcome::Success => self.finish_success(session, Some(failure)).await,
            AttachOutcome::Failure(failure) => self.finish_exhausted(session, Some(failure)).await,
        }
    }

    async fn finish_success(
        &self,
        session: &mut PlaybackSession,
        underlying: Option<BackendFailure>,
    ) -> Result<SessionReport> {
        self.transition(session, SessionPhase::Succeeded)?;
        let probe = session.probe_result(self.config.probe_grace).await;
        let diagnosis = underlying
            .as_ref()
            .map(|failure| diagnose::classify(&probe, Some(failure)));
        let raw_url_affordance = diagnosis
            .is_some()
            .then(|| session.request.url.to_string());
        Ok(self.report(session, probe, diagnosis, raw_url_affordance))
    }

    async fn finish_exhausted(
        &self,
        session: &mut PlaybackSession,
        failure: Option<BackendFailure>,
    ) -> Result<SessionReport> {
        self.transition(session, SessionPhase::Exhausted)?;
        let probe = session.probe_result(self.config.probe_grace).await;
        let diagnosis = diagnose::classify(&probe, failure.as_ref());
        info!(
            session = session.token,
            cause = %diagnosis.cause,
            retryable = diagnosis.retryable,
            "cascade exhausted"
        );
        // Nothing is attached on the failure path; drop the backend after a
        // final detach so the surface is clean for the terminal report.
        session.teardown().await;
        let raw_url = session.request.url.to_string();
        Ok(self.report(session, probe, Some(diagnosis), Some(raw_url)))
    }

    fn report(
        &self,
        session: &mut PlaybackSession,
        probe: ProbeResult,
        diagnosis: Option<Diagnosis>,
        raw_url_affordance: Option<String>,
    ) -> SessionReport {
        self.emit(session, diagnosis.clone());
        SessionReport {
            session: session.token,
            url: session.request.url.to_string(),
            declared_id: session.request.declared_id.clone(),
            hint: session.hint,
            phase: session.phase,
            probe,
            attempts: std::mem::take(&mut session.attempt_log),
            diagnosis,
            raw_url_affordance,
        }
    }

    fn transition(&self, session: &mut PlaybackSession, target: SessionPhase) -> Result<()> {
        session.phase = session.phase.transition_to(target)?;
        debug!(session = session.token, phase = ?session.phase, "phase transition");
        // Terminal phases are announced by `report`, where the diagnosis is
        // known; everything else is announced here.
        if !session.phase.is_terminal() {
            self.emit(session, None);
        }
        Ok(())
    }

    fn emit(&self, session: &PlaybackSession, diagnosis: Option<Diagnosis>) {
        let active_backend = match session.phase {
            SessionPhase::Attempting(backend) => Some(backend),
            _ => session.active_backend.as_ref().map(|b| b.backend_type()),
        };
        // Nobody listening is fine.
        let _ = self.status_tx.send(StatusUpdate {
            session: session.token,
            phase: session.phase,
            active_backend,
            diagnosis,
        });
    }
}
