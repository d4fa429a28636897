//! Client IP resolution behind trusted reverse proxies.
//!
//! The socket peer is the client unless the peer is a configured trusted
//! proxy. Only then are forwarding headers consulted, in this order:
//!
//! 1. `CF-Connecting-IP`
//! 2. `X-Real-IP`
//! 3. `X-Forwarded-For` (first entry of the comma-separated chain)
//!
//! A header value is accepted only if it parses as an IP address outside
//! [`RESERVED_RANGES`]; otherwise the next header is tried and, failing all,
//! the peer address is kept.
//!
//! # Security
//!
//! Forwarding headers are trivially spoofable. Keep `TRUSTED_PROXIES` limited
//! to proxies that overwrite (not append to) these headers.
//!
//! ```nginx
//! proxy_set_header X-Real-IP $remote_addr;
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, Response};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::context::RequestContext;

/// Forwarding headers in priority order.
pub const FORWARDING_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-real-ip", "x-forwarded-for"];

/// Networks a forwarded client address may not come from.
pub const RESERVED_RANGES: [CidrRange; 5] = [
    CidrRange::v4(Ipv4Addr::new(10, 0, 0, 0), 8),
    CidrRange::v4(Ipv4Addr::new(172, 16, 0, 0), 12),
    CidrRange::v4(Ipv4Addr::new(192, 168, 0, 0), 16),
    CidrRange::v4(Ipv4Addr::new(127, 0, 0, 0), 8),
    CidrRange::v6(Ipv6Addr::LOCALHOST, 128),
];

// =============================================================================
// CIDR Matching
// =============================================================================

/// Parsed CIDR network range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    pub const fn v4(network: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            network: IpAddr::V4(network),
            prefix_len,
        }
    }

    pub const fn v6(network: Ipv6Addr, prefix_len: u8) -> Self {
        Self {
            network: IpAddr::V6(network),
            prefix_len,
        }
    }

    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "::1/128").
    /// A bare address is treated as /32 or /128.
    ///
    /// Returns `None` if the format is invalid.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();
        let (addr, prefix) = match cidr.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (cidr, None),
        };

        let network = addr.parse::<IpAddr>().ok()?.to_canonical();
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().ok()?,
            None => max_prefix,
        };

        if prefix_len > max_prefix {
            return None;
        }

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Check if an IP address is contained within this CIDR range.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u32::from(*net) & mask) == (u32::from(addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u128::from(*net) & mask) == (u128::from(addr) & mask)
            }
            _ => false,
        }
    }
}

/// Whether `ip` falls inside one of the [`RESERVED_RANGES`].
pub fn is_reserved(ip: &IpAddr) -> bool {
    RESERVED_RANGES.iter().any(|range| range.contains(ip))
}

/// Set of proxies whose forwarding headers are honoured.
///
/// Unlike an allow-all default, an empty set trusts nobody.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    ranges: Vec<CidrRange>,
}

impl TrustedProxies {
    /// Build from CIDR strings or bare addresses.
    ///
    /// Invalid entries are logged as warnings and skipped.
    pub fn new(entries: &[String]) -> Self {
        let ranges = entries
            .iter()
            .filter_map(|entry| {
                let parsed = CidrRange::parse(entry);
                if parsed.is_none() {
                    warn!(entry = %entry, "Invalid entry in TRUSTED_PROXIES, skipping");
                }
                parsed
            })
            .collect();

        Self { ranges }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// First usable client address from the forwarding headers.
fn forwarded_client_ip(headers: &HeaderMap) -> Option<(&'static str, IpAddr)> {
    FORWARDING_HEADERS.iter().find_map(|&name| {
        let value = headers.get(name)?.to_str().ok()?;
        let first = value.split(',').next()?.trim();
        let ip = first.parse::<IpAddr>().ok()?.to_canonical();
        if is_reserved(&ip) {
            debug!(header = name, client_ip = %ip, "Ignoring reserved forwarded address");
            return None;
        }
        Some((name, ip))
    })
}

/// Resolve the client address for a request arriving from `peer`.
///
/// Headers are consulted only when `peer` is a trusted proxy.
pub fn resolve_client_ip(
    peer: Option<IpAddr>,
    headers: &HeaderMap,
    trusted: &TrustedProxies,
) -> Option<IpAddr> {
    let peer = peer.map(|ip| ip.to_canonical())?;

    if !trusted.is_trusted(&peer) {
        return Some(peer);
    }

    match forwarded_client_ip(headers) {
        Some((header, ip)) => {
            debug!(peer = %peer, header, client_ip = %ip, "Resolved client IP from trusted proxy");
            Some(ip)
        }
        None => Some(peer),
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Layer attaching the resolved client IP to the [`RequestContext`].
///
/// The peer address comes from `ConnectInfo<SocketAddr>`, so the app must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone)]
pub struct ClientIpLayer {
    trusted: Arc<TrustedProxies>,
}

impl ClientIpLayer {
    pub fn new(trusted: TrustedProxies) -> Self {
        Self {
            trusted: Arc::new(trusted),
        }
    }
}

impl<S> Layer<S> for ClientIpLayer {
    type Service = ClientIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientIpService {
            inner,
            trusted: self.trusted.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ClientIpService<S> {
    inner: S,
    trusted: Arc<TrustedProxies>,
}

impl<S> Service<Request<Body>> for ClientIpService<S>
where
    S: Service<Request<Body>, Response = Response<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        if let Some(ip) = resolve_client_ip(peer, req.headers(), &self.trusted) {
            RequestContext::update(req.extensions_mut(), |ctx| ctx.with_client_ip(ip));
        }

        self.inner.call(req)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn default_proxies() -> TrustedProxies {
        TrustedProxies::new(&["10.0.0.1".to_string(), "192.168.1.1".to_string()])
    }

    // ==========================================================================
    // CIDR Range Tests
    // ==========================================================================

    #[test]
    fn test_cidr_parse() {
        assert_eq!(CidrRange::parse("10.0.0.0/8").unwrap().prefix_len, 8);
        assert_eq!(CidrRange::parse("::1/128").unwrap().prefix_len, 128);
        assert_eq!(CidrRange::parse("192.168.1.1").unwrap().prefix_len, 32);
        assert!(CidrRange::parse("not-an-ip").is_none());
        assert!(CidrRange::parse("10.0.0.0/33").is_none());
        assert!(CidrRange::parse("10.0.0.0/x").is_none());
    }

    #[test]
    fn test_cidr_contains_ipv4() {
        let cidr = CidrRange::parse("172.16.0.0/12").unwrap();

        assert!(cidr.contains(&ip("172.16.0.1")));
        assert!(cidr.contains(&ip("172.31.255.255")));
        assert!(!cidr.contains(&ip("172.32.0.1")));
        assert!(!cidr.contains(&ip("::1")));
    }

    #[test]
    fn test_cidr_zero_prefix_matches_everything() {
        let cidr = CidrRange::parse("0.0.0.0/0").unwrap();
        assert!(cidr.contains(&ip("8.8.8.8")));
    }

    #[test]
    fn test_cidr_matches_ipv4_mapped_ipv6() {
        let cidr = CidrRange::parse("10.0.0.0/8").unwrap();
        assert!(cidr.contains(&ip("::ffff:10.1.2.3")));
    }

    #[test]
    fn test_reserved_ranges() {
        assert!(is_reserved(&ip("10.4.4.4")));
        assert!(is_reserved(&ip("172.20.0.1")));
        assert!(is_reserved(&ip("192.168.9.9")));
        assert!(is_reserved(&ip("127.0.0.1")));
        assert!(is_reserved(&ip("::1")));
        assert!(!is_reserved(&ip("203.0.113.7")));
        assert!(!is_reserved(&ip("2001:db8::1")));
    }

    #[test]
    fn test_empty_trusted_set_trusts_nobody() {
        let trusted = TrustedProxies::new(&[]);
        assert!(trusted.is_empty());
        assert!(!trusted.is_trusted(&ip("10.0.0.1")));
    }

    #[test]
    fn test_invalid_trusted_entries_skipped() {
        let trusted = TrustedProxies::new(&["bogus".to_string(), "10.0.0.0/8".to_string()]);
        assert_eq!(trusted.len(), 1);
    }

    // ==========================================================================
    // Resolution Tests
    // ==========================================================================

    #[test]
    fn test_untrusted_peer_ignores_headers() {
        let resolved = resolve_client_ip(
            Some(ip("203.0.113.9")),
            &headers(&[("x-real-ip", "198.51.100.1")]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("203.0.113.9")));
    }

    #[test]
    fn test_trusted_peer_uses_real_ip() {
        let resolved = resolve_client_ip(
            Some(ip("10.0.0.1")),
            &headers(&[("x-real-ip", "203.0.113.7")]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("203.0.113.7")));
    }

    #[test]
    fn test_trusted_peer_keeps_peer_for_reserved_forwarded() {
        let resolved = resolve_client_ip(
            Some(ip("10.0.0.1")),
            &headers(&[("x-forwarded-for", "192.168.5.5, 203.0.113.7")]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("10.0.0.1")));
    }

    #[test]
    fn test_header_priority() {
        let resolved = resolve_client_ip(
            Some(ip("192.168.1.1")),
            &headers(&[
                ("x-forwarded-for", "198.51.100.3"),
                ("x-real-ip", "198.51.100.2"),
                ("cf-connecting-ip", "198.51.100.1"),
            ]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("198.51.100.1")));
    }

    #[test]
    fn test_falls_through_to_next_header() {
        let resolved = resolve_client_ip(
            Some(ip("10.0.0.1")),
            &headers(&[
                ("cf-connecting-ip", "garbage"),
                ("x-real-ip", "127.0.0.1"),
                ("x-forwarded-for", " 198.51.100.3 , 10.0.0.1"),
            ]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("198.51.100.3")));
    }

    #[test]
    fn test_forwarded_ipv6() {
        let resolved = resolve_client_ip(
            Some(ip("10.0.0.1")),
            &headers(&[("x-forwarded-for", "2001:db8::7")]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("2001:db8::7")));
    }

    #[test]
    fn test_forwarded_with_port_is_rejected() {
        let resolved = resolve_client_ip(
            Some(ip("10.0.0.1")),
            &headers(&[("x-forwarded-for", "203.0.113.7:8080")]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("10.0.0.1")));
    }

    #[test]
    fn test_mapped_peer_is_canonicalized() {
        let resolved = resolve_client_ip(
            Some(ip("::ffff:10.0.0.1")),
            &headers(&[("x-real-ip", "203.0.113.7")]),
            &default_proxies(),
        );
        assert_eq!(resolved, Some(ip("203.0.113.7")));
    }

    #[test]
    fn test_no_peer_resolves_nothing() {
        let resolved = resolve_client_ip(
            None,
            &headers(&[("x-real-ip", "203.0.113.7")]),
            &default_proxies(),
        );
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_layer_attaches_client_ip() {
        use axum::Router;
        use axum::routing::get;
        use tower::ServiceExt;

        let app = Router::new()
            .route(
                "/",
                get(|ctx: RequestContext| async move {
                    ctx.client_ip.map(|ip| ip.to_string()).unwrap_or_default()
                }),
            )
            .layer(ClientIpLayer::new(default_proxies()));

        let mut req = Request::builder()
            .uri("/")
            .header("x-real-ip", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));

        let response = app.oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"203.0.113.7");
    }
}
