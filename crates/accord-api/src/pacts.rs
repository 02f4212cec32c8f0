//! Handler for the latest-pact-on-branch endpoint.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/pacts/provider/:provider/consumer/:consumer/branch/:branch/latest` | Current branch pact |

use axum::{
  Json,
  extract::{Path, State},
};
use accord_core::store::BrokerStore;

use crate::{ApiState, error::ApiError, representation};

/// `GET /pacts/provider/:provider/consumer/:consumer/branch/:branch/latest`
///
/// Serves the pact content published by the newest branch member that has
/// a publication to the provider.
pub async fn latest_for_branch<S>(
  State(state): State<ApiState<S>>,
  Path((provider, consumer, branch)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BrokerStore,
{
  let pact = state
    .store
    .latest_pact_for_branch(&consumer, &provider, &branch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(representation::branch_pact_document(
    &state.base_url,
    &consumer,
    &provider,
    &pact,
  )))
}
