//! Shared test doubles for the playback surface.
//!
//! Available for local tests and for downstream crate tests; production code
//! never constructs these.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::probe::{AccessibilityProber, ProbeResult};
use crate::surface::{MediaErrorCode, PlaybackSurface, SurfaceSignal};

/// A prober that returns a canned result without touching the network.
pub struct FixedProber(pub ProbeResult);

#[async_trait]
impl AccessibilityProber for FixedProber {
    async fn probe(&self, _url: &Url) -> ProbeResult {
        self.0.clone()
    }
}

/// One observed surface call, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Native { url: String, mime: String },
    Segmented { url: String },
    Frame { url: String },
    Clear,
}

/// A surface double that replays a scripted sequence of signals and records
/// every call it receives.
pub struct ScriptedSurface {
    native_script: Mutex<VecDeque<SurfaceSignal>>,
    segmented_script: Mutex<VecDeque<SurfaceSignal>>,
    supports_segmented: AtomicBool,
    calls: Mutex<Vec<SurfaceCall>>,
}

impl ScriptedSurface {
    /// Script for native attaches; segmented support defaults to off.
    pub fn new(native_script: Vec<SurfaceSignal>) -> Self {
        Self {
            native_script: Mutex::new(native_script.into()),
            segmented_script: Mutex::new(VecDeque::new()),
            supports_segmented: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_segmented(self, script: Vec<SurfaceSignal>) -> Self {
        *self.segmented_script.lock() = script.into();
        self.supports_segmented.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_supports_segmented(&self, supported: bool) {
        self.supports_segmented.store(supported, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    pub fn native_attach_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Native { .. }))
            .count()
    }

    pub fn segmented_attach_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Segmented { .. }))
            .count()
    }

    pub fn frame_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Frame { .. }))
            .count()
    }

    pub fn clear_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Clear))
            .count()
    }
}

#[async_trait]
impl PlaybackSurface for ScriptedSurface {
    fn supports_segmented(&self) -> bool {
        self.supports_segmented.load(Ordering::SeqCst)
    }

    async fn attach_native(&self, url: &Url, mime: &str) -> SurfaceSignal {
        self.calls.lock().push(SurfaceCall::Native {
            url: url.to_string(),
            mime: mime.to_string(),
        });
        self.native_script
            .lock()
            .pop_front()
            .unwrap_or(SurfaceSignal::Error(MediaErrorCode::SrcNotSupported))
    }

    async fn attach_segmented(&self, url: &Url) -> SurfaceSignal {
        self.calls.lock().push(SurfaceCall::Segmented {
            url: url.to_string(),
        });
        self.segmented_script
            .lock()
            .pop_front()
            .unwrap_or(SurfaceSignal::Ready)
    }

    async fn attach_frame(&self, url: &Url) {
        self.calls.lock().push(SurfaceCall::Frame {
            url: url.to_string(),
        });
    }

    async fn clear(&self) {
        self.calls.lock().push(SurfaceCall::Clear);
    }
}

/// A surface whose native attach never completes. Useful for driving a
/// request mid-flight and superseding it while the attach is pending.
pub struct StalledSurface {
    journal: CallJournal,
    started: tokio::sync::Notify,
}

impl StalledSurface {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            journal,
            started: tokio::sync::Notify::new(),
        }
    }

    /// Resolves once the first native attach has been entered.
    pub async fn wait_for_attach(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl PlaybackSurface for StalledSurface {
    fn supports_segmented(&self) -> bool {
        false
    }

    async fn attach_native(&self, _url: &Url, _mime: &str) -> SurfaceSignal {
        self.journal.record("stalled:attach-start");
        self.started.notify_one();
        std::future::pending::<()>().await;
        unreachable!("pending future resolved")
    }

    async fn attach_segmented(&self, _url: &Url) -> SurfaceSignal {
        SurfaceSignal::Ready
    }

    async fn attach_frame(&self, _url: &Url) {
        self.journal.record("stalled:frame");
    }

    async fn clear(&self) {
        self.journal.record("stalled:clear");
    }
}

/// Shared call journal for asserting cross-object ordering, e.g. that a
/// superseded session's surface is cleared before the new session attaches.
#[derive(Clone, Default)]
pub struct CallJournal(Arc<Mutex<Vec<String>>>);

impl CallJournal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// A surface that writes every call into a shared [`CallJournal`] and always
/// reports the same signal for native attaches.
pub struct JournalingSurface {
    journal: CallJournal,
    label: String,
    native_signal: SurfaceSignal,
    segmented: bool,
}

impl JournalingSurface {
    pub fn new(journal: CallJournal, label: impl Into<String>, native_signal: SurfaceSignal) -> Self {
        Self {
            journal,
            label: label.into(),
            native_signal,
            segmented: false,
        }
    }
}

#[async_trait]
impl PlaybackSurface for JournalingSurface {
    fn supports_segmented(&self) -> bool {
        self.segmented
    }

    async fn attach_native(&self, _url: &Url, mime: &str) -> SurfaceSignal {
        self.journal.record(format!("{}:attach:{mime}", self.label));
        self.native_signal
    }

    async fn attach_segmented(&self, _url: &Url) -> SurfaceSignal {
        self.journal.record(format!("{}:attach-segmented", self.label));
        SurfaceSignal::Ready
    }

    async fn attach_frame(&self, _url: &Url) {
        self.journal.record(format!("{}:frame", self.label));
    }

    async fn clear(&self) {
        self.journal.record(format!("{}:clear", self.label));
    }
}
