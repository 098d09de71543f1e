use http::HeaderMap;
use http::header::COOKIE;

/// Extract the value of the `cookie_name` cookie from a raw `Cookie` header.
///
/// Tokenizer rules:
/// - pairs are separated by `;` and trimmed; pairs without `=` or with an
///   empty name are skipped
/// - names match exactly (case-sensitive)
/// - the value is everything after the first `=`, with one pair of
///   surrounding double quotes removed
/// - the first pair with a matching name wins, even if its value is empty
/// - an empty value is reported as absent
pub fn extract_token<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    find_cookie(cookie_header, cookie_name).filter(|value| !value.is_empty())
}

/// Extract the session token from every `Cookie` field in `headers`.
///
/// Fields are scanned in order and the first field that names the cookie
/// decides. Fields that are not visible ASCII are skipped.
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for field in headers.get_all(COOKIE) {
        let Ok(raw) = field.to_str() else {
            tracing::debug!("Skipping cookie header that is not visible ASCII");
            continue;
        };

        if let Some(value) = find_cookie(raw, cookie_name) {
            if value.is_empty() {
                tracing::debug!("Cookie '{}' present but empty", cookie_name);
                return None;
            }
            return Some(value.to_string());
        }
    }

    tracing::debug!("No '{}' cookie found in request", cookie_name);
    None
}

fn find_cookie<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name, value.trim()))
        })
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| unquote(value))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
