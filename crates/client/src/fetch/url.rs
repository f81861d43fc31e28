//! Endpoint URL resolution.
//!
//! A relative endpoint is joined below the configured domain and API path;
//! an absolute `http(s)://` endpoint is used as-is.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("no domain configured for relative endpoint `{0}`")]
    NoDomain(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether an endpoint is an absolute http(s) URL.
pub fn is_absolute(endpoint: &str) -> bool {
    let lower = endpoint.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve an entity endpoint against domain and API path.
///
/// Each part is trimmed of surrounding slashes before joining, so
/// `https://host/` + `/api/` + `/celebrity` yields `https://host/api/celebrity`.
pub fn endpoint_url(domain: &str, api_path: &str, endpoint: &str) -> Result<url::Url, UrlError> {
    if is_absolute(endpoint) {
        return canonicalize(endpoint);
    }

    let domain = domain.trim().trim_end_matches('/');
    if domain.is_empty() {
        return Err(UrlError::NoDomain(endpoint.to_string()));
    }

    let joined = [domain, api_path.trim().trim_matches('/'), endpoint.trim().trim_matches('/')]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    canonicalize(&joined)
}
