//! Sign-in rate limiting with governor and `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Keys requests by peer address, or by `X-Forwarded-For` behind a proxy.
#[derive(Clone, Copy)]
pub struct PeerIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for PeerIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Sign-in limiter: `max_attempts` in a burst, then one more every 12 seconds.
///
/// # Panics
///
/// Panics if `max_attempts` is zero; configuration rejects that.
#[must_use]
pub fn login_rate_limiter(max_attempts: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(PeerIpKeyExtractor)
        .per_second(12)
        .burst_size(max_attempts)
        .finish()
        .expect("login limiter burst is non-zero");
    GovernorLayer::new(Arc::new(config))
}
