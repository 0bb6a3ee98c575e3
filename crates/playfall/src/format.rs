//! Container/codec hinting from URL shape.
//!
//! The hint is derived purely from the URL and is never trusted as ground
//! truth; it only orders the MIME candidates the backends will try. Servers
//! routinely misdeclare `Content-Type` for object-storage media, which is why
//! this classification ignores server headers entirely.

use serde::{Deserialize, Serialize};
use url::Url;

/// Container format guessed from the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatHint {
    /// Manifest-driven chunked media (HLS/DASH).
    SegmentedStream,
    Mp4,
    WebM,
    QuickTime,
    Avi,
    Matroska,
    /// No signal in the URL. Callers should not see this from
    /// [`classify_url`]; it classifies unrecognized URLs as [`Self::Mp4`]
    /// because every backend needs an initial MIME to try.
    Unknown,
}

impl FormatHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SegmentedStream => "segmented",
            Self::Mp4 => "mp4",
            Self::WebM => "webm",
            Self::QuickTime => "quicktime",
            Self::Avi => "avi",
            Self::Matroska => "matroska",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FormatHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extension and mid-URL substring patterns per format.
///
/// Extensions win over substrings; manifest formats win over everything.
const PATTERNS: &[(FormatHint, &[&str])] = &[
    (FormatHint::SegmentedStream, &["m3u8", "mpd"]),
    (FormatHint::Mp4, &["mp4", "m4v"]),
    (FormatHint::WebM, &["webm"]),
    (FormatHint::QuickTime, &["mov", "qt"]),
    (FormatHint::Avi, &["avi"]),
    (FormatHint::Matroska, &["mkv"]),
];

/// Classify a URL into a [`FormatHint`].
///
/// The path extension is inspected first (case-insensitively). If the path
/// carries no recognizable extension, the full URL string is scanned for
/// known format substrings, which handles storage URLs where the extension
/// is embedded mid-path or stripped by a signing proxy. No match defaults to
/// `Mp4`, never to an unresolved `Unknown`.
pub fn classify_url(url: &Url) -> FormatHint {
    if let Some(ext) = path_extension(url) {
        let ext = ext.to_ascii_lowercase();
        for (hint, exts) in PATTERNS {
            if exts.contains(&ext.as_str()) {
                return *hint;
            }
        }
    }

    let full = url.as_str().to_ascii_lowercase();
    for (hint, exts) in PATTERNS {
        for ext in *exts {
            // A dotted occurrence anywhere in the URL counts; a bare substring
            // like "mp4" inside a random token does not.
            if full.contains(&format!(".{ext}")) {
                return *hint;
            }
        }
    }

    FormatHint::Mp4
}

fn path_extension(url: &Url) -> Option<&str> {
    let path = url.path();
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() { None } else { Some(ext) }
}

/// Ordered, deduplicated MIME strings to try against a backend.
///
/// Ordering is most-specific (with codec parameters) first, then the generic
/// container type, then the empty string, which tells a surface to attach
/// without any type assertion at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeCandidates(Vec<String>);

impl MimeCandidates {
    /// Build the candidate list for a format hint.
    pub fn for_hint(hint: FormatHint) -> Self {
        let raw: &[&str] = match hint {
            FormatHint::SegmentedStream => &[
                "application/vnd.apple.mpegurl",
                "application/x-mpegURL",
                "video/mp4",
                "",
            ],
            FormatHint::Mp4 | FormatHint::Unknown => &[
                "video/mp4; codecs=\"avc1.42E01E, mp4a.40.2\"",
                "video/mp4",
                "",
            ],
            FormatHint::WebM => &[
                "video/webm; codecs=\"vp9, opus\"",
                "video/webm",
                "video/mp4",
                "",
            ],
            FormatHint::QuickTime => &["video/quicktime", "video/mp4", ""],
            FormatHint::Avi => &["video/x-msvideo", "video/mp4", ""],
            FormatHint::Matroska => &["video/x-matroska", "video/webm", "video/mp4", ""],
        };

        let mut seen = Vec::with_capacity(raw.len());
        for mime in raw {
            if !seen.iter().any(|s: &String| s == mime) {
                seen.push((*mime).to_string());
            }
        }
        Self(seen)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first candidate, used as the initial type assertion.
    pub fn primary(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }
}
