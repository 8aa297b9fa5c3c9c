use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

/// Set by Cloudflare to the original visitor address.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the originating client IP.
///
/// With `trust_forwarded`, `CF-Connecting-IP` wins, then the left-most
/// `X-Forwarded-For` entry. Anything unparsable falls back to the socket peer.
pub fn resolve_client_ip(headers: &HeaderMap, peer: SocketAddr, trust_forwarded: bool) -> IpAddr {
    if trust_forwarded {
        if let Some(ip) = header_ip(headers, CF_CONNECTING_IP) {
            return ip;
        }
        if let Some(ip) = header_ip(headers, X_FORWARDED_FOR) {
            return ip;
        }
    }
    peer.ip()
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let raw = headers.get(name)?.to_str().ok()?;
    raw.split(',').next()?.trim().parse().ok()
}
