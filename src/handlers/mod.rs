//! HTTP handlers

pub mod auth;
pub mod health;
pub mod query;

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Resolve the client IP: first hop of X-Forwarded-For when present
/// (deployments behind a proxy), otherwise the socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.1:443".parse().unwrap()
    }

    #[test]
    fn test_forwarded_header_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        assert_eq!(client_ip(&HeaderMap::new(), peer()), "192.0.2.1");
    }
}
