use url::Url;

/// Query parameters that may carry a card token in a scanned lookup URL
const TOKEN_PARAMS: [&str; 2] = ["code", "token"];

/// Extracts a card token from scanner or camera input.
///
/// Accepts either a bare token or an `http(s)` lookup URL carrying the token
/// as a `code`/`token` query parameter or as a `/u/<token>` path. Returns
/// `None` for blank input and for URLs that carry no token.
pub fn extract_token(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => token_from_url(&url),
        _ => Some(raw.to_string()),
    }
}

fn token_from_url(url: &Url) -> Option<String> {
    for param in TOKEN_PARAMS {
        let value = url
            .query_pairs()
            .find(|(key, _)| key == param)
            .map(|(_, value)| value.trim().to_string());

        if let Some(value) = value.filter(|v| !v.is_empty()) {
            return Some(value);
        }
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., "u", token] => Some(token.to_string()),
        _ => None,
    }
}
