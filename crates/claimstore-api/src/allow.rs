//! Peer allow-list for submission routes.

use std::{
  collections::HashSet,
  net::{IpAddr, SocketAddr},
  sync::Arc,
};

use axum::{
  extract::{ConnectInfo, Request, State},
  middleware::Next,
  response::Response,
};

use crate::error::ApiError;

/// The set of peer addresses allowed through [`require_allowed`].
#[derive(Debug, Clone)]
pub struct AllowList(Arc<HashSet<IpAddr>>);

impl AllowList {
  pub fn new(ips: impl IntoIterator<Item = IpAddr>) -> Self {
    Self(Arc::new(ips.into_iter().map(|ip| ip.to_canonical()).collect()))
  }

  /// IPv4-mapped IPv6 peers match their IPv4 entry.
  pub fn allows(&self, ip: IpAddr) -> bool { self.0.contains(&ip.to_canonical()) }
}

/// Middleware rejecting requests whose peer is not on the list. A request
/// without connection info is rejected too.
pub async fn require_allowed(
  State(allow): State<AllowList>,
  request: Request,
  next: Next,
) -> Result<Response, ApiError> {
  let peer = request
    .extensions()
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip());

  match peer {
    Some(ip) if allow.allows(ip) => Ok(next.run(request).await),
    Some(ip) => {
      tracing::warn!(%ip, "submission from peer outside the allow-list");
      Err(ApiError::Forbidden(format!("{ip} is not allowed to submit")))
    }
    None => Err(ApiError::Forbidden("peer address unknown".into())),
  }
}
