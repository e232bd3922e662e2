//! Client address resolution.
//!
//! Resolves the address logged as `client.address`: `x-real-ip`, then the
//! first hop of `x-forwarded-for`, then the TCP peer, else `unknown`.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolved client address, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

/// Pick the client address from proxy headers or the peer address.
pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header(X_REAL_IP) {
        return ip.to_string();
    }
    if let Some(first) = header(X_FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    match peer {
        Some(addr) => addr.to_string(),
        None => "unknown".to_string(),
    }
}

pub async fn resolve_client_addr(mut request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let addr = resolve(request.headers(), peer);
    request.extensions_mut().insert(ClientAddr(addr));
    next.run(request).await
}
