//! Destination checks for remote fetches.
//!
//! Refuses non-HTTP schemes, hosts outside the configured allowlist, and
//! private or loopback destinations, including hostnames that resolve to one.

use hoard_core::{FetchError, RemoteFetchConfig};
use reqwest::Url;
use std::net::{IpAddr, Ipv6Addr};
use tokio::net::lookup_host;

/// Parse `url` and check it is safe to fetch under `config`.
pub async fn validate_url(url: &str, config: &RemoteFetchConfig) -> Result<Url, FetchError> {
    let parsed =
        Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    validate_parsed(&parsed, config).await?;
    Ok(parsed)
}

/// Same checks for an already-parsed URL, used for every redirect hop.
pub async fn validate_parsed(url: &Url, config: &RemoteFetchConfig) -> Result<(), FetchError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FetchError::InvalidUrl(
            "URL must start with http:// or https://".to_string(),
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl("URL must have a host".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();

    if let Some(allowed) = config.url_allowlist.as_deref() {
        let is_allowed = allowed.iter().any(|domain| {
            let domain = domain.to_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        });
        if !is_allowed {
            return Err(FetchError::Blocked(format!(
                "hostname '{}' is not in the allowed list",
                host
            )));
        }
    }

    if config.allow_private_urls {
        return Ok(());
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(FetchError::Blocked(
                "private or internal addresses are not allowed".to_string(),
            ));
        }
        return Ok(());
    }

    if is_internal_hostname(&host) {
        return Err(FetchError::Blocked(
            "localhost and internal hostnames are not allowed".to_string(),
        ));
    }

    let port = url.port_or_known_default().unwrap_or(80);
    match lookup_host((host.as_str(), port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_private_ip(&addr.ip()) {
                    return Err(FetchError::Blocked(format!(
                        "hostname resolves to private address {}",
                        addr.ip()
                    )));
                }
            }
        }
        Err(e) => {
            // The request itself will fail to connect.
            tracing::warn!(host = %host, error = %e, "Failed to resolve hostname for URL validation");
        }
    }

    Ok(())
}

fn is_internal_hostname(host: &str) -> bool {
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
        || host.ends_with(".corp")
}

/// Loopback, RFC 1918, link-local, multicast, unspecified and unique-local ranges.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private()
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_multicast()
                || ipv4.is_unspecified()
                || ipv4.octets()[0] == 0
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

/// fe80::/10
fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

/// fc00::/7
fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
