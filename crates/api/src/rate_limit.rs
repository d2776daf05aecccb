//! Per-client-IP rate limiting using governor.
//!
//! Three independent limiters share the same window length:
//! - `auth`: login attempts
//! - `general`: every authenticated API request
//! - `sensitive`: account administration
//!
//! A limiter allowing `n` requests per window bursts up to `n` and refills
//! one slot per full window, so a client never gets more than `n` requests
//! inside any window.
//!
//! Clients are keyed on the socket peer unless proxy headers are trusted.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::app::errors;
use crate::config::RateLimitConfig;

type KeyedLimiter<C> =
    RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// A keyed limiter for one endpoint category.
#[derive(Clone)]
pub struct IpRateLimiter<C: Clock = DefaultClock> {
    name: &'static str,
    limiter: Arc<KeyedLimiter<C>>,
    clock: C,
    trust_proxy_headers: bool,
}

impl IpRateLimiter {
    pub fn new(name: &'static str, requests: NonZeroU32, window: Duration) -> Self {
        Self::with_clock(name, requests, window, DefaultClock::default())
    }
}

impl<C: Clock + Clone> IpRateLimiter<C> {
    pub fn with_clock(name: &'static str, requests: NonZeroU32, window: Duration, clock: C) -> Self {
        let quota = Quota::with_period(window)
            .unwrap_or_else(|| Quota::per_second(requests))
            .allow_burst(requests);
        Self {
            name,
            limiter: Arc::new(RateLimiter::new(quota, DefaultKeyedStateStore::default(), clock.clone())),
            clock,
            trust_proxy_headers: false,
        }
    }

    pub fn trusting_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// `Err(retry_after)` when the client is over its quota.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }
}

/// The three limiters of the API.
#[derive(Clone)]
pub struct RateLimiters {
    pub auth: IpRateLimiter,
    pub general: IpRateLimiter,
    pub sensitive: IpRateLimiter,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = |name, requests| {
            IpRateLimiter::new(name, requests, config.window)
                .trusting_proxy_headers(config.trust_proxy_headers)
        };
        Self {
            auth: limiter("auth", config.auth),
            general: limiter("general", config.general),
            sensitive: limiter("sensitive", config.sensitive),
        }
    }
}

pub async fn rate_limit(State(limiter): State<IpRateLimiter>, req: Request, next: Next) -> Response {
    let ip = client_ip(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
        limiter.trust_proxy_headers,
    );

    match limiter.check(ip) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            let retry_after = wait.as_secs().max(1);
            tracing::warn!(limiter = limiter.name, %ip, retry_after, "rate limit exceeded");

            let mut res = errors::json_error(
                StatusCode::TOO_MANY_REQUESTS,
                errors::RATE_LIMITED,
                format!("too many requests, retry in {retry_after}s"),
            );
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            res
        }
    }
}

/// Client address. With `trust_proxy_headers`: first `X-Forwarded-For` hop,
/// then `X-Real-IP`, then the socket peer. Otherwise the socket peer only.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> IpAddr {
    if trust_proxy_headers {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }

        if let Some(ip) = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }
    }

    peer.map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use governor::clock::FakeRelativeClock;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(900);

    fn limiter(n: u32) -> (IpRateLimiter<FakeRelativeClock>, FakeRelativeClock) {
        let clock = FakeRelativeClock::default();
        let l = IpRateLimiter::with_clock("test", NonZeroU32::new(n).unwrap(), WINDOW, clock.clone());
        (l, clock)
    }

    #[test]
    fn allows_burst_then_rejects() {
        let (l, _) = limiter(5);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..5 {
            assert!(l.check(ip).is_ok());
        }
        let wait = l.check(ip).unwrap_err();
        assert!(wait > Duration::from_secs(800), "slots refill once per window, got {wait:?}");
    }

    #[test]
    fn sixth_attempt_stays_rejected_for_the_whole_window() {
        let (l, clock) = limiter(5);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..5 {
            assert!(l.check(ip).is_ok());
        }

        for step in [180, 180, 180, 180, 179] {
            clock.advance(Duration::from_secs(step));
            assert!(l.check(ip).is_err(), "accepted a sixth attempt inside the window");
        }

        clock.advance(Duration::from_secs(1));
        assert!(l.check(ip).is_ok());
        assert!(l.check(ip).is_err());
    }

    #[test]
    fn clients_are_limited_independently() {
        let (l, _) = limiter(1);
        assert!(l.check("10.0.0.1".parse().unwrap()).is_ok());
        assert!(l.check("10.0.0.1".parse().unwrap()).is_err());
        assert!(l.check("10.0.0.2".parse().unwrap()).is_ok());
    }

    fn proxied_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        headers
    }

    #[test]
    fn proxy_headers_are_ignored_unless_trusted() {
        let peer = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)));
        let localhost: IpAddr = "127.0.0.1".parse().unwrap();

        assert_eq!(client_ip(&proxied_headers(), Some(&peer), false), localhost);
        assert_eq!(client_ip(&proxied_headers(), None, false), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn trusted_forwarded_header_wins_over_peer() {
        let mut headers = proxied_headers();
        let peer = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)));

        assert_eq!(client_ip(&headers, Some(&peer), true), "203.0.113.7".parse::<IpAddr>().unwrap());

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(&headers, Some(&peer), true), "198.51.100.1".parse::<IpAddr>().unwrap());

        assert_eq!(client_ip(&HeaderMap::new(), Some(&peer), true), "127.0.0.1".parse::<IpAddr>().unwrap());
    }
}
