use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{ResolveError, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Byte range requested by the accessibility probe and the sniffing surface.
pub const PROBE_RANGE_BYTES: u64 = 1024;

/// Configurable options for the playback resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Timeout for the probe request. The probe is advisory, so this is kept
    /// short: a slow probe must never delay the first playback attempt.
    pub probe_timeout: Duration,

    /// How long diagnosis waits for a still-running probe before classifying
    /// with the optimistic default result.
    pub probe_grace: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum time between receiving data chunks)
    pub read_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Request origin used to evaluate cross-origin response headers.
    ///
    /// When set, the probe sends it as `Origin` and expects the response to
    /// allow it; when `None`, cross-origin policy is not evaluated at all.
    pub origin: Option<String>,

    /// How many bytes the probe asks for.
    pub probe_range_bytes: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            probe_grace: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: ResolverConfig::get_default_headers(),
            origin: None,
            probe_range_bytes: PROBE_RANGE_BYTES,
        }
    }
}

impl ResolverConfig {
    /// Set the request origin used for cross-origin evaluation.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Add a header sent on every request.
    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }

    /// Build the shared HTTP client from this configuration.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let redirect = if self.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(self.headers.clone())
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .redirect(redirect)
            .build()
            .map_err(|e| ResolveError::Configuration {
                reason: format!("failed to build HTTP client: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_client() {
        let config = ResolverConfig::default();
        assert!(config.build_client().is_ok());
        assert!(config.origin.is_none());
    }

    #[test]
    fn builder_methods_apply() {
        let config = ResolverConfig::default()
            .with_origin("https://videos.example.com")
            .with_probe_timeout(Duration::from_secs(1));

        assert_eq!(config.origin.as_deref(), Some("https://videos.example.com"));
        assert_eq!(config.probe_timeout, Duration::from_secs(1));
    }
}
