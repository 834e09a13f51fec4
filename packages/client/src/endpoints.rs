//! URL construction for the backend services.

use reqwest::Url;

use crate::error::{ClientError, Result};

fn parse(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))
}

/// Append path segments to `base`, percent-encoding each one.
pub fn with_segments(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = parse(base)?;
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(format!("{base}: cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `GET {base}/api/submission/{id}`
pub fn submission_url(base: &str, id: &str) -> Result<Url> {
    with_segments(base, &["api", "submission", id])
}

/// `GET {base}/api/problems/{id}`
pub fn problem_url(base: &str, id: &str) -> Result<Url> {
    with_segments(base, &["api", "problems", id])
}

/// Stream URL for a submission from a template containing `{id}`.
pub fn submission_stream_url(template: &str, id: &str) -> Result<Url> {
    let encoded: String = id
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect();
    parse(&template.replace("{id}", &encoded))
}

/// Resolve a server-provided stream URL, which may be relative to the API
/// base or use an http scheme for a WebSocket endpoint.
pub fn resolve_stream_url(api_base: &str, candidate: &str) -> Result<Url> {
    let mut url = match Url::parse(candidate) {
        Ok(url) => url,
        Err(_) => parse(api_base)?
            .join(candidate)
            .map_err(|e| ClientError::InvalidUrl(format!("{candidate}: {e}")))?,
    };
    let scheme = match url.scheme() {
        "http" => Some("ws"),
        "https" => Some("wss"),
        _ => None,
    };
    if let Some(scheme) = scheme {
        url.set_scheme(scheme)
            .map_err(|_| ClientError::InvalidUrl(format!("{candidate}: cannot use {scheme}")))?;
    }
    Ok(url)
}

/// Contest titles are keyed with whitespace runs collapsed to `_`.
pub fn contest_stream_key(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("_")
}

/// `{base}/{escaped title}/`
pub fn leaderboard_stream_url(base: &str, title: &str) -> Result<Url> {
    let key = contest_stream_key(title);
    if key.is_empty() {
        return Err(ClientError::MissingIdentifier);
    }
    with_segments(base, &[key.as_str(), ""])
}
