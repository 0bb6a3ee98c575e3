//! Accessibility probing: one small range request to classify reachability
//! and header correctness before a playback strategy is committed to.
//!
//! The probe is advisory, not authoritative. A `reachable` result does not
//! guarantee playback succeeds, and a suspect result never blocks an attempt;
//! it only pre-seeds the diagnostic classifier's priors. Accordingly, any
//! ambiguity resolves optimistically.

use async_trait::async_trait;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN, RANGE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::ResolverConfig;

/// Classified outcome of the accessibility probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The resource answered with a success status.
    pub reachable: bool,
    /// The response did not clear cross-origin policy for the configured origin.
    pub cors_blocked: bool,
    /// The request failed at the transport level (unreachable host, timeout).
    pub network_error: bool,
    /// `Content-Type` as declared by the server, verbatim.
    pub content_type_declared: Option<String>,
    /// The declared content type is missing or not a plausible video type.
    pub content_type_suspect: bool,
}

impl Default for ProbeResult {
    /// The optimistic result used when the probe never ran or never settled.
    fn default() -> Self {
        Self {
            reachable: true,
            cors_blocked: false,
            network_error: false,
            content_type_declared: None,
            content_type_suspect: false,
        }
    }
}

/// Probing seam, so callers that already know the environment (and tests)
/// can substitute the HTTP prober.
#[async_trait]
pub trait AccessibilityProber: Send + Sync {
    async fn probe(&self, url: &Url) -> ProbeResult;
}

/// The default prober: one small range GET per session.
pub struct HttpProber {
    client: reqwest::Client,
    config: ResolverConfig,
}

impl HttpProber {
    pub fn new(client: reqwest::Client, config: ResolverConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl AccessibilityProber for HttpProber {
    async fn probe(&self, url: &Url) -> ProbeResult {
        probe_url(&self.client, &self.config, url).await
    }
}

/// Issue the probe request and classify the outcome.
///
/// Classification rules, in priority order:
/// 1. cross-origin policy failure -> `cors_blocked`
/// 2. transport failure -> `network_error`
/// 3. non-success status -> `reachable = false`
/// 4. missing or non-video declared type -> `content_type_suspect`
///
/// Anything that fits none of these is a soft pass.
pub async fn probe_url(client: &reqwest::Client, config: &ResolverConfig, url: &Url) -> ProbeResult {
    let mut request = client
        .get(url.clone())
        .timeout(config.probe_timeout)
        .header(
            RANGE,
            format!("bytes=0-{}", config.probe_range_bytes.saturating_sub(1)),
        );

    if let Some(origin) = &config.origin {
        request = request.header(ORIGIN, origin.clone());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                warn!(url = %url, error = %e, "probe transport failure");
                return ProbeResult {
                    network_error: true,
                    reachable: false,
                    ..ProbeResult::default()
                };
            }
            // Unclassifiable failure: soft pass, never block on prober ambiguity.
            debug!(url = %url, error = %e, "probe failed ambiguously, passing");
            return ProbeResult::default();
        }
    };

    if let Some(origin) = &config.origin
        && !allows_origin(&response, origin)
    {
        debug!(url = %url, origin, "probe response does not clear cross-origin policy");
        return ProbeResult {
            cors_blocked: true,
            ..ProbeResult::default()
        };
    }

    if !response.status().is_success() {
        debug!(url = %url, status = %response.status(), "probe got non-success status");
        return ProbeResult {
            reachable: false,
            ..ProbeResult::default()
        };
    }

    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let suspect = !declared
        .as_deref()
        .is_some_and(|ct| is_plausible_video_type(ct));

    if suspect {
        debug!(url = %url, content_type = ?declared, "declared content type is suspect");
    }

    ProbeResult {
        reachable: true,
        cors_blocked: false,
        network_error: false,
        content_type_declared: declared,
        content_type_suspect: suspect,
    }
}

fn allows_origin(response: &reqwest::Response, origin: &str) -> bool {
    match response
        .headers()
        .get(ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok())
    {
        Some("*") => true,
        Some(allowed) => allowed.eq_ignore_ascii_case(origin),
        None => false,
    }
}

/// Whether a declared content type could legitimately front video bytes.
///
/// `application/octet-stream` is accepted because storage services default to
/// it for any object; anything else non-`video/*` is treated as a
/// misconfigured bucket or a signing proxy rewriting headers.
pub fn is_plausible_video_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("video/")
        || essence == "application/octet-stream"
        || essence == "application/vnd.apple.mpegurl"
        || essence == "application/x-mpegurl"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_optimistic() {
        let result = ProbeResult::default();
        assert!(result.reachable);
        assert!(!result.cors_blocked);
        assert!(!result.network_error);
        assert!(!result.content_type_suspect);
    }

    #[test]
    fn plausible_video_types() {
        assert!(is_plausible_video_type("video/mp4"));
        assert!(is_plausible_video_type("video/webm; codecs=\"vp9\""));
        assert!(is_plausible_video_type("application/octet-stream"));
        assert!(is_plausible_video_type("Application/vnd.apple.mpegURL"));
    }

    #[test]
    fn implausible_video_types() {
        assert!(!is_plausible_video_type("text/html"));
        assert!(!is_plausible_video_type("application/xml"));
        assert!(!is_plausible_video_type("binary/octet-stream; charset=utf-8"));
        assert!(!is_plausible_video_type(""));
    }
}
