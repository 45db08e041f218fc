//! Cookie header parsing and `Set-Cookie` formatting
//!
//! Only the subset of RFC 6265 the session filter needs: pairs separated by
//! `"; "`, key and value split on the first `=`. Values are opaque.

/// Find the value of cookie `name` in a `Cookie` header value
///
/// Returns `None` when the header is empty or has no pair named `name`.
/// The first matching pair wins. An empty value is still a match.
pub fn extract<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    if header.is_empty() {
        return None;
    }

    header
        .split("; ")
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Format a `name=value` cookie assignment
pub fn build_set_cookie(name: &str, value: &str) -> String {
    format!("{}={}", name, value)
}
