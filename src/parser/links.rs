//! URL validation and normalisation for subscription links.

use std::net::IpAddr;

use anyhow::{Context, Result};
use url::{Host, Url};

/// Converts a URL to its ASCII form
///
/// International domain names are converted to punycode by the URL parser.
pub fn to_ascii_url(s: &str) -> Result<String> {
    let url = Url::parse(s.trim()).with_context(|| format!("Invalid URL: {}", s.trim()))?;
    Ok(url.to_string())
}

/// Checks that `s` is an absolute http(s) URL with a host
pub fn is_valid_url(s: &str) -> bool {
    match Url::parse(s.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

/// Checks whether a line is a subscription link rather than a descriptor
///
/// HTTPS links always qualify. Plain HTTP is only accepted for loopback
/// hosts, which covers locally running subscription converters.
pub fn is_valid_subscription_url(s: &str) -> bool {
    let Ok(url) = Url::parse(s.trim()) else {
        return false;
    };
    match url.scheme() {
        "https" => url.host().is_some(),
        "http" => url.host().is_some_and(|host| is_loopback(&host)),
        _ => false,
    }
}

fn is_loopback(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => domain.eq_ignore_ascii_case("localhost"),
        Host::Ipv4(ip) => IpAddr::V4(*ip).is_loopback(),
        Host::Ipv6(ip) => IpAddr::V6(*ip).is_loopback(),
    }
}

/// Appends a query parameter, keeping any query already present
pub fn with_query_param(url: &str, key: &str, value: &str) -> Result<String> {
    let mut url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    url.query_pairs_mut().append_pair(key, value);
    Ok(url.to_string())
}
