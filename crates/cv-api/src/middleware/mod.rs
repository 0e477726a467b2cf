//! HTTP middleware: rate limiting, security headers, challenge-session gate

pub mod rate_limit;
pub mod security_headers;
pub mod session_gate;

pub use rate_limit::rate_limit_middleware;
pub use security_headers::security_headers_middleware;
pub use session_gate::{session_gate_middleware, SessionStatus};

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Select the client key for rate limiting and challenge verification.
///
/// Preference order: trusted proxy header, then the peer address, then a
/// constant sentinel for sourceless requests (tests, unix sockets).
pub fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    for header in ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or(value).trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anon".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_proxy_header_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.9"));
        let peer = ConnectInfo("10.0.0.1:1234".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(&peer)), "203.0.113.9");
    }

    #[test]
    fn test_forwarded_list_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, None), "198.51.100.7");
    }

    #[test]
    fn test_peer_address_fallback() {
        let peer = ConnectInfo("10.0.0.1:1234".parse().unwrap());
        assert_eq!(client_ip(&HeaderMap::new(), Some(&peer)), "10.0.0.1");
    }

    #[test]
    fn test_sentinel_for_unknown_clients() {
        assert_eq!(client_ip(&HeaderMap::new(), None), "anon");
    }
}
