//! JSON REST API for the ClaimStore.
//!
//! Exposes an axum [`Router`] backed by any [`claimstore_core::store::ClaimStore`].
//! Submissions (`POST`) are limited to an IP allow-list; reads are open.
//! TLS and transport concerns are the caller's responsibility.
//!
//! The allow-list reads the peer address from [`ConnectInfo`], so the router
//! must be served with
//! `into_make_service_with_connect_info::<SocketAddr>()`.
//!
//! [`ConnectInfo`]: axum::extract::ConnectInfo

pub mod allow;
pub mod claims;
pub mod eqids;
pub mod error;
pub mod registry;

use std::{net::IpAddr, sync::Arc};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use claimstore_core::store::ClaimStore;

pub use allow::AllowList;
pub use error::ApiError;

/// Router settings that come from the server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Peers allowed to submit claims and subscriptions.
  pub allowed_ips:      Vec<IpAddr>,
  /// Page size for `GET /claims` when `per_page` is not given.
  pub default_per_page: usize,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      allowed_ips:      vec![IpAddr::from([127, 0, 0, 1])],
      default_per_page: 100,
    }
  }
}

/// Shared handler state.
pub struct AppState<S> {
  pub store:            Arc<S>,
  pub default_per_page: usize,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), default_per_page: self.default_per_page }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, config: ApiConfig) -> Router<()>
where
  S: ClaimStore + 'static,
{
  let state = AppState { store, default_per_page: config.default_per_page };
  let guard = middleware::from_fn_with_state(
    AllowList::new(config.allowed_ips),
    allow::require_allowed,
  );

  Router::new()
    // Submissions
    .route("/subscribe", post(registry::subscribe::<S>).route_layer(guard.clone()))
    .route(
      "/claims",
      post(claims::create::<S>).route_layer(guard).get(claims::list::<S>),
    )
    // Registry
    .route("/claimants", get(registry::claimants::<S>))
    .route("/identifiers", get(registry::identifier_types::<S>))
    .route("/predicates", get(registry::predicates::<S>))
    // Equivalence index
    .route("/eqids", get(eqids::list::<S>))
    .route("/eqids/{eqid}", get(eqids::get_one::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
