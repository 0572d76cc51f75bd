//! Client IP extraction.
//!
//! The pages call the API over loopback on behalf of browsers, so a loopback
//! peer may name the real client in `X-Forwarded-For`. Any other peer is
//! taken at its word.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

use crate::client::FORWARDED_FOR;

/// Trait for types that provide access to HTTP headers and extensions.
/// Implemented for both `Parts` and `Request` so middleware and extractors
/// share one lookup.
pub trait HasHeadersAndExtensions {
    fn headers(&self) -> &axum::http::HeaderMap;
    fn extensions(&self) -> &axum::http::Extensions;
}

impl HasHeadersAndExtensions for Parts {
    fn headers(&self) -> &axum::http::HeaderMap {
        &self.headers
    }
    fn extensions(&self) -> &axum::http::Extensions {
        &self.extensions
    }
}

impl<B> HasHeadersAndExtensions for axum::extract::Request<B> {
    fn headers(&self) -> &axum::http::HeaderMap {
        axum::extract::Request::headers(self)
    }
    fn extensions(&self) -> &axum::http::Extensions {
        axum::extract::Request::extensions(self)
    }
}

/// First address in `X-Forwarded-For`, if it parses.
fn forwarded_ip<T: HasHeadersAndExtensions>(source: &T) -> Option<IpAddr> {
    source
        .headers()
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Address the request is made for, or `"unknown"` when the router runs
/// without connect info (e.g. driven directly in tests).
pub fn client_ip<T: HasHeadersAndExtensions>(source: &T) -> String {
    let Some(peer) = source
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
    else {
        return "unknown".to_string();
    };

    if peer.is_loopback() {
        if let Some(forwarded) = forwarded_ip(source) {
            return forwarded.to_string();
        }
    }
    peer.to_string()
}

/// Extractor for [`client_ip`].
pub struct ClientIp(pub String);

impl ClientIp {
    /// The address, unless it could not be determined.
    pub fn known(&self) -> Option<&str> {
        (self.0 != "unknown").then_some(self.0.as_str())
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(parts)))
    }
}
