//! Storage-canonical URL rewriting and predicate escaping

use stratum_core_types::HostContext;

use crate::errors::{Result, StratumError};

/// Fixed internal prefix replacing the public origin in stored URLs
pub const STORAGE_PREFIX: &str = "urn:stratum:";

/// Rewrite a URL into its storage-canonical form.
///
/// Same-origin absolute URLs (`http://{host}/...` or `https://{host}/...`)
/// become `urn:stratum:/...`. Blank-node references (`_:` prefixed) and
/// cross-origin or non-HTTP URLs pass through unchanged. Relative URLs
/// are resolved against `base_url` first and must land on the public
/// origin; anything else is a validation error.
pub fn canonicalize_url(url: &str, host: &HostContext, base_url: &str) -> Result<String> {
    if url.starts_with("_:") {
        return Ok(url.to_string());
    }
    if let Some(path) = same_origin_path(url, host) {
        return Ok(format!("{}{}", STORAGE_PREFIX, path));
    }
    if has_scheme(url) {
        // absolute URL on a different host, or a non-HTTP scheme
        return Ok(url.to_string());
    }
    let absolute = join_relative(base_url, url);
    match same_origin_path(&absolute, host) {
        Some(path) => Ok(format!("{}{}", STORAGE_PREFIX, path)),
        None => Err(StratumError::validation(format!(
            "relative URL '{}' does not resolve to origin '{}' (base '{}')",
            url,
            host.hostname(),
            base_url
        ))),
    }
}

/// Restore a storage-canonical URL to its public form
pub fn restore_url(url: &str, host: &HostContext) -> String {
    match url.strip_prefix(STORAGE_PREFIX) {
        Some(path) => format!("{}{}", host.http_prefix(), path),
        None => url.to_string(),
    }
}

/// Escape a predicate name for use as a backend field path component.
/// The backend's path syntax reserves `.`, so literal dots are escaped.
pub fn escape_predicate(predicate: &str) -> String {
    predicate.replace('.', "%2E")
}

/// Inverse of `escape_predicate`
pub fn unescape_predicate(predicate: &str) -> String {
    predicate.replace("%2E", ".")
}

/// Escape a predicate for use in a query, additionally converting the
/// abstract `a->b` path notation into the backend's `a.b` form.
pub fn query_predicate_path(predicate: &str) -> String {
    escape_predicate(predicate).replace("->", ".")
}

/// Absolute path of `url` when it is on the public origin, with the
/// origin prefix stripped
fn same_origin_path<'a>(url: &'a str, host: &HostContext) -> Option<&'a str> {
    for prefix in [host.http_prefix(), host.https_prefix()] {
        if let Some(rest) = url.strip_prefix(&prefix) {
            if rest.starts_with('/') {
                return Some(rest);
            }
        }
    }
    None
}

/// True when the string carries a URL scheme
fn has_scheme(url: &str) -> bool {
    let mut chars = url.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' => {}
            _ => return false,
        }
    }
    false
}

/// Minimal relative-reference resolution against an absolute base URL
fn join_relative(base: &str, rel: &str) -> String {
    if rel.is_empty() {
        return base.to_string();
    }
    let authority_end = base
        .find("://")
        .map(|i| {
            let after = i + 3;
            base[after..]
                .find('/')
                .map(|j| after + j)
                .unwrap_or(base.len())
        })
        .unwrap_or(0);
    if rel.starts_with('/') {
        return format!("{}{}", &base[..authority_end], rel);
    }
    match base.rfind('/') {
        Some(i) if i >= authority_end => format!("{}/{}", &base[..i], rel),
        _ => format!("{}/{}", base, rel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostContext {
        HostContext::new("example.com:3000")
    }

    #[test]
    fn test_same_origin_urls_become_storage_relative() {
        let base = "http://example.com:3000/acme/tasks/1.1";
        assert_eq!(
            canonicalize_url("http://example.com:3000/acme/tasks/1.2", &host(), base).unwrap(),
            "urn:stratum:/acme/tasks/1.2"
        );
        assert_eq!(
            canonicalize_url("https://example.com:3000/acme/tasks/1.2", &host(), base).unwrap(),
            "urn:stratum:/acme/tasks/1.2"
        );
    }

    #[test]
    fn test_cross_origin_and_non_http_pass_through() {
        let base = "http://example.com:3000/acme/tasks/1.1";
        for url in [
            "http://other.org/x",
            "mailto:someone@example.com",
            "urn:ietf:rfc:3986",
        ] {
            assert_eq!(canonicalize_url(url, &host(), base).unwrap(), url);
        }
    }

    #[test]
    fn test_blank_node_refs_pass_through() {
        let base = "http://example.com:3000/acme/tasks/1.1";
        assert_eq!(canonicalize_url("_:b1", &host(), base).unwrap(), "_:b1");
    }

    #[test]
    fn test_relative_urls_resolve_against_base() {
        let base = "http://example.com:3000/acme/tasks/1.1";
        assert_eq!(
            canonicalize_url("", &host(), base).unwrap(),
            "urn:stratum:/acme/tasks/1.1"
        );
        assert_eq!(
            canonicalize_url("1.2", &host(), base).unwrap(),
            "urn:stratum:/acme/tasks/1.2"
        );
        assert_eq!(
            canonicalize_url("/acme/other/9", &host(), base).unwrap(),
            "urn:stratum:/acme/other/9"
        );
    }

    #[test]
    fn test_relative_url_off_origin_is_rejected() {
        let base = "http://elsewhere.net/acme/tasks/1.1";
        let err = canonicalize_url("1.2", &host(), base).unwrap_err();
        assert_eq!(err.code(), "ERR_VALIDATION");
    }

    #[test]
    fn test_restore_is_inverse_for_http() {
        let restored = restore_url("urn:stratum:/acme/tasks/1.2", &host());
        assert_eq!(restored, "http://example.com:3000/acme/tasks/1.2");
        assert_eq!(restore_url("http://other.org/x", &host()), "http://other.org/x");
    }

    #[test]
    fn test_predicate_escaping() {
        assert_eq!(escape_predicate("http://a/ns#p.q"), "http://a/ns#p%2Eq");
        assert_eq!(unescape_predicate("http://a/ns#p%2Eq"), "http://a/ns#p.q");
        assert_eq!(query_predicate_path("http://a/p->http://a/q"), "http://a/p.http://a/q");
    }
}
