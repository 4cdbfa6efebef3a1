//! Registrable-domain and subdomain helpers.
//!
//! Endpoint rules are scoped to registrable domains ("example.com", not
//! "api.example.com"), so every classification and redaction lookup starts
//! by reducing a host or URL to that form. Full public-suffix resolution is
//! out of scope; a compact table of common multi-part suffixes covers the
//! hosting domains the collector protocol exercises.

use url::Url;

/// Multi-part public suffixes recognized in addition to the generic
/// single-label TLD rule.
const MULTI_PART_SUFFIXES: &[&str] = &[
    "co.uk",
    "org.uk",
    "ac.uk",
    "gov.uk",
    "co.jp",
    "co.nz",
    "co.in",
    "co.za",
    "com.au",
    "net.au",
    "org.au",
    "com.br",
    "com.mx",
    "com.cn",
    "amazonaws.com",
    "azurewebsites.net",
    "cloudfront.net",
    "fly.dev",
    "github.io",
    "herokuapp.com",
    "onrender.com",
];

/// Extracts the registrable domain from a host string or a full URL.
///
/// `"api.example.com"` yields `"example.com"`; `"my-app.herokuapp.com"`
/// yields `"my-app.herokuapp.com"`. Single-label hosts and IP literals are
/// returned unchanged. Returns an empty string when no host can be
/// extracted.
pub fn registrable_domain(input: &str) -> String {
    let host = host_of(input);
    if host.is_empty() || is_ip_literal(&host) {
        return host;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host;
    }

    // A registrable domain is one label more than its public suffix.
    let last_two = labels[labels.len() - 2..].join(".");
    let take = if MULTI_PART_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    labels[labels.len() - take..].join(".")
}

/// Extracts the subdomain (labels left of the registrable domain) from a
/// host string or a full URL. Empty when there is none.
pub fn subdomain(input: &str) -> String {
    let host = host_of(input);
    let domain = registrable_domain(&host);
    if domain.is_empty() || host == domain {
        return String::new();
    }
    host.trim_end_matches(&domain)
        .trim_end_matches('.')
        .to_string()
}

/// Reduces a host string or URL to a bare lowercase host without port.
fn host_of(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    if input.contains("://") {
        return Url::parse(input)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
            .to_ascii_lowercase();
    }

    // Bare authority, possibly with a path or port attached.
    let host = input.split('/').next().unwrap_or("");
    let host = strip_port(host);
    host.to_ascii_lowercase()
}

/// Strips a trailing `:port`, leaving IPv6 bracket literals intact.
fn strip_port(authority: &str) -> &str {
    if let Some(end) = authority.rfind(']') {
        // IPv6 literal: [::1]:8080
        return &authority[..=end];
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}

fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[')
        || host
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrable_domain_from_host() {
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("api.example.com"), "example.com");
        assert_eq!(registrable_domain("a.b.example.com"), "example.com");
        assert_eq!(registrable_domain("ignored.example"), "ignored.example");
    }

    #[test]
    fn registrable_domain_multi_part_suffix() {
        assert_eq!(registrable_domain("shop.example.co.uk"), "example.co.uk");
        assert_eq!(
            registrable_domain("supergood-testbed.herokuapp.com"),
            "supergood-testbed.herokuapp.com"
        );
    }

    #[test]
    fn registrable_domain_from_url() {
        assert_eq!(
            registrable_domain("https://api.example.com/v1/x?y=1"),
            "example.com"
        );
        assert_eq!(registrable_domain("http://localhost:8080/echo"), "localhost");
    }

    #[test]
    fn registrable_domain_strips_port() {
        assert_eq!(registrable_domain("api.example.com:8443"), "example.com");
        assert_eq!(registrable_domain("127.0.0.1:3000"), "127.0.0.1");
    }

    #[test]
    fn registrable_domain_ip_literals_unchanged() {
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
        assert_eq!(registrable_domain("[::1]:9000"), "[::1]");
    }

    #[test]
    fn registrable_domain_empty_input() {
        assert_eq!(registrable_domain(""), "");
    }

    #[test]
    fn subdomain_from_host() {
        assert_eq!(subdomain("api.example.com"), "api");
        assert_eq!(subdomain("a.b.example.com"), "a.b");
        assert_eq!(subdomain("example.com"), "");
        assert_eq!(subdomain("localhost"), "");
    }

    #[test]
    fn subdomain_from_url() {
        assert_eq!(subdomain("https://api.example.com/v1"), "api");
        assert_eq!(subdomain("https://example.com/v1"), "");
    }

    #[test]
    fn host_is_lowercased() {
        assert_eq!(registrable_domain("API.Example.COM"), "example.com");
    }
}
