//! Playfall: an adaptive playback resolution engine.
//!
//! Given an arbitrary, often cross-origin, often misconfigured media URL,
//! the engine decides how to render it, diagnoses why a rendering attempt
//! failed, and degrades through an ordered cascade of strategies until
//! something plays or a precise, actionable diagnosis is produced.
//!
//! The cascade: validate the URL, fire an advisory accessibility probe,
//! derive a format hint from the URL shape, then drive backends in order:
//! segmented stream (when hinted and supported), progressive byte-range
//! playback with a MIME sub-cascade, and finally an opaque embedded frame.
//! Failures feed a pure diagnostic classifier that maps the probe result and
//! the backend error to a fixed cause with static remediation text.

pub mod backend;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod format;
pub mod probe;
pub mod session;
pub mod sniff;
pub mod surface;
pub mod test_support;
pub mod validate;

pub use backend::{AttachOutcome, BackendFailure, BackendType, FailureKind, PlaybackBackend};
pub use config::ResolverConfig;
pub use diagnose::{Diagnosis, FailureCause, classify};
pub use error::{ResolveError, Result};
pub use format::{FormatHint, MimeCandidates, classify_url};
pub use probe::{AccessibilityProber, HttpProber, ProbeResult, probe_url};
pub use session::{
    AttemptRecord, PlaybackRequest, PlaybackResolver, RequestHints, SessionPhase, SessionReport,
    StatusUpdate,
};
pub use sniff::SniffSurface;
pub use surface::{MediaErrorCode, PlaybackSurface, SurfaceSignal};
pub use validate::{Validation, validate_media_url};
