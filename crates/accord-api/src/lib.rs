//! JSON (HAL-style) REST API for Accord version listings.
//!
//! Exposes an axum [`Router`] backed by any
//! [`accord_core::store::BrokerStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility; an authentication gate in
//! front of this router is trusted entirely.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = accord_api::api_router(store.clone(), "http://broker.example");
//! ```

pub mod error;
pub mod pacts;
pub mod representation;
pub mod versions;

use std::sync::Arc;

use axum::{Router, routing::get};
use accord_core::store::BrokerStore;

pub use error::ApiError;

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct ApiState<S> {
  pub store:    Arc<S>,
  /// Absolute prefix for every `_links` href in responses.
  pub base_url: Arc<String>,
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(store: Arc<S>, base_url: impl Into<String>) -> Router<()>
where
  S: BrokerStore + Clone + Send + Sync + 'static,
{
  let state = ApiState { store, base_url: Arc::new(base_url.into()) };
  Router::new()
    .route(
      "/pacticipants/{pacticipant}/versions",
      get(versions::list::<S>),
    )
    .route(
      "/pacticipants/{pacticipant}/branches/{branch}/versions",
      get(versions::list_for_branch::<S>),
    )
    .route(
      "/pacticipants/{pacticipant}/tags/{tag}/versions",
      get(versions::list_for_tag::<S>),
    )
    .route(
      "/pacts/provider/{provider}/consumer/{consumer}/branch/{branch}/latest",
      get(pacts::latest_for_branch::<S>),
    )
    .with_state(state)
}
