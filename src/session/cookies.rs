//! `Cookie` request header parsing.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::COOKIE;

/// Parses every `Cookie` header into a name → value map.
///
/// Pairs without `=` are skipped, surrounding double quotes are removed,
/// and when a name repeats the first occurrence wins.
#[must_use]
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            cookies
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    cookies
}

/// Returns a single cookie value.
#[must_use]
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    parse_cookies(headers).remove(name)
}
