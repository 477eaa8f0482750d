use std::net::IpAddr;

use axum::http::HeaderMap;
use ipnet::IpNet;

/// Where a request came from, as recorded on entries and logins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: Option<String>,
}

pub fn extract(
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    trusted_proxies: &[IpNet],
) -> ClientInfo {
    let ip = extract_ip(headers, peer_addr, trusted_proxies);
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    ClientInfo { ip, user_agent }
}

fn extract_ip(
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    trusted_proxies: &[IpNet],
) -> String {
    let peer = peer_addr.unwrap_or(IpAddr::from([127, 0, 0, 1]));

    // Only trust X-Forwarded-For if the direct connection is from a trusted proxy
    if trusted_proxies.iter().any(|net| net.contains(&peer)) {
        if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            // Take the first (leftmost) IP that isn't a trusted proxy
            for ip_str in xff.split(',').map(|s| s.trim()) {
                if let Ok(ip) = ip_str.parse::<IpAddr>() {
                    if !trusted_proxies.iter().any(|net| net.contains(&ip)) {
                        return ip.to_string();
                    }
                }
            }
        }
    }

    peer.to_string()
}
