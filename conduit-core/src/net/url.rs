//! URL composition helpers shared by every provider adapter.

/// Joins `base` and `path`, trimming exactly one trailing slash from `base`
/// and one leading slash from `path`.
pub fn combine(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{base}/{path}")
}

/// Left-folds [`combine`] over more than two segments.
pub fn combine_all(segments: &[&str]) -> String {
    let mut iter = segments.iter();
    let first = match iter.next() {
        Some(s) => s.to_string(),
        None => return String::new(),
    };
    iter.fold(first, |acc, seg| combine(&acc, seg))
}

/// Appends `key=value` to `url`'s query string, preserving an existing `?`
/// or introducing one. Empty keys or values are skipped. Both key and value
/// are percent-encoded.
pub fn append_query_string(url: &str, key: &str, value: &str) -> String {
    if key.is_empty() || value.is_empty() {
        return url.to_string();
    }

    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    let encoded_key = utf8_percent_encode(key, NON_ALPHANUMERIC).to_string();
    let encoded_value = utf8_percent_encode(value, NON_ALPHANUMERIC).to_string();
    let pair = format!("{encoded_key}={encoded_value}");

    if url.contains('?') {
        format!("{url}&{pair}")
    } else {
        format!("{url}?{pair}")
    }
}

/// Adds `segment` (e.g. `/v1`) to `url` iff it is not already present,
/// case-insensitively.
pub fn ensure_segment(url: &str, segment: &str) -> String {
    let segment = segment.trim_start_matches('/');
    if url.to_lowercase().contains(&format!("/{}", segment.to_lowercase())) {
        url.to_string()
    } else {
        combine(url, segment)
    }
}

/// Maps `http`/`https` to `ws`/`wss`, passes through existing `ws`/`wss`
/// unchanged, and rejects any other scheme.
pub fn to_websocket_url(url: &str) -> Result<String, String> {
    if let Some(rest) = url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(url.to_string())
    } else {
        Err(format!("unsupported URL scheme for websocket conversion: {url}"))
    }
}
