//! Syntactic validation of media URLs. Pure, no I/O.

use url::Url;

/// Host substrings that identify object-storage endpoints.
///
/// For these hosts a URL without an object key (a bare bucket root) can never
/// serve media, so it is rejected before any network activity.
const STORAGE_HOST_MARKERS: &[&str] = &[
    ".s3.",
    ".s3-",
    "s3.amazonaws.com",
    "storage.googleapis.com",
    ".blob.core.windows.net",
    ".digitaloceanspaces.com",
    ".r2.cloudflarestorage.com",
];

/// Outcome of validating a raw media reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(Url),
    Invalid { reason: String },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Validate a raw media URL string.
///
/// Checks: non-empty, parses as an absolute URL, http(s) scheme, and a
/// non-empty object path for storage-style hosts. Reachability is the
/// prober's job, not this function's.
pub fn validate_media_url(input: &str) -> Validation {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Validation::Invalid {
            reason: "empty URL".to_string(),
        };
    }

    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(e) => {
            return Validation::Invalid {
                reason: format!("not an absolute URL: {e}"),
            };
        }
    };

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Validation::Invalid {
                reason: format!("unsupported scheme `{other}`"),
            };
        }
    }

    let Some(host) = url.host_str() else {
        return Validation::Invalid {
            reason: "URL has no host".to_string(),
        };
    };

    if is_storage_host(host) && url.path().trim_matches('/').is_empty() {
        return Validation::Invalid {
            reason: "missing object key".to_string(),
        };
    }

    Validation::Valid(url)
}

fn is_storage_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    STORAGE_HOST_MARKERS
        .iter()
        .any(|marker| host.contains(marker))
}
