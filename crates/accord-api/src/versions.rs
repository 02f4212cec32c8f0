//! Handlers for the version listing endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/pacticipants/:name/versions` | All versions |
//! | `GET`  | `/pacticipants/:name/branches/:branch/versions` | Branch members |
//! | `GET`  | `/pacticipants/:name/tags/:tag/versions` | Tagged versions |
//!
//! All three accept `pageNumber`/`pageSize` (aliases `page`/`size`).
//! Pagination is 1-based; omitting both parameters returns everything in
//! one implicit page without a `page` section in the body.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use accord_core::{
  query::{DEFAULT_PAGE_SIZE, PageParams, VersionSelector},
  store::BrokerStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError, representation};

// ─── Pagination parameters ────────────────────────────────────────────────────

/// Raw query parameters, kept as strings so that non-numeric input can
/// be rejected with 400 while out-of-range numbers are merely clamped.
#[derive(Debug, Default, Deserialize)]
pub struct RawPageParams {
  #[serde(rename = "pageNumber")]
  pub page_number: Option<String>,
  #[serde(rename = "pageSize")]
  pub page_size:   Option<String>,
  pub page:        Option<String>,
  pub size:        Option<String>,
}

fn parse_numeric(name: &str, value: Option<&str>) -> Result<Option<i64>, ApiError> {
  match value {
    None => Ok(None),
    Some(s) => s.trim().parse::<i64>().map(Some).map_err(|_| {
      ApiError::BadRequest(format!("{name} must be an integer, got {s:?}"))
    }),
  }
}

/// `None` when the request carried no pagination parameter at all.
fn resolve_page(raw: &RawPageParams) -> Result<Option<PageParams>, ApiError> {
  let number = raw.page_number.as_deref().or(raw.page.as_deref());
  let size = raw.page_size.as_deref().or(raw.size.as_deref());
  if number.is_none() && size.is_none() {
    return Ok(None);
  }
  let number = parse_numeric("pageNumber", number)?.unwrap_or(1);
  let size =
    parse_numeric("pageSize", size)?.unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
  Ok(Some(PageParams::new(number, size)))
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn respond<S>(
  state: &ApiState<S>,
  selector: VersionSelector,
  raw: &RawPageParams,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BrokerStore,
{
  let page = resolve_page(raw)?;
  let result = state
    .store
    .list_versions(&selector, page)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(representation::versions_document(
    &state.base_url,
    &selector,
    &result,
  )))
}

/// `GET /pacticipants/:pacticipant/versions`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Path(pacticipant): Path<String>,
  Query(raw): Query<RawPageParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BrokerStore,
{
  let selector = VersionSelector::for_pacticipant(pacticipant);
  respond(&state, selector, &raw).await
}

/// `GET /pacticipants/:pacticipant/branches/:branch/versions`
pub async fn list_for_branch<S>(
  State(state): State<ApiState<S>>,
  Path((pacticipant, branch)): Path<(String, String)>,
  Query(raw): Query<RawPageParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BrokerStore,
{
  let selector = VersionSelector::for_pacticipant(pacticipant).on_branch(branch);
  respond(&state, selector, &raw).await
}

/// `GET /pacticipants/:pacticipant/tags/:tag/versions`
pub async fn list_for_tag<S>(
  State(state): State<ApiState<S>>,
  Path((pacticipant, tag)): Path<(String, String)>,
  Query(raw): Query<RawPageParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BrokerStore,
{
  let selector = VersionSelector::for_pacticipant(pacticipant).with_tag(tag);
  respond(&state, selector, &raw).await
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(
    page_number: Option<&str>,
    page_size: Option<&str>,
    page: Option<&str>,
    size: Option<&str>,
  ) -> RawPageParams {
    RawPageParams {
      page_number: page_number.map(str::to_owned),
      page_size:   page_size.map(str::to_owned),
      page:        page.map(str::to_owned),
      size:        size.map(str::to_owned),
    }
  }

  #[test]
  fn no_parameters_means_unpaged() {
    assert!(resolve_page(&raw(None, None, None, None)).unwrap().is_none());
  }

  #[test]
  fn long_and_short_aliases_are_equivalent() {
    let long = resolve_page(&raw(Some("2"), Some("10"), None, None)).unwrap();
    let short = resolve_page(&raw(None, None, Some("2"), Some("10"))).unwrap();
    assert_eq!(long, short);
  }

  #[test]
  fn long_form_wins_over_the_alias() {
    let page = resolve_page(&raw(Some("3"), None, Some("7"), None))
      .unwrap()
      .unwrap();
    assert_eq!(page.number(), 3);
  }

  #[test]
  fn size_alone_defaults_the_page_number() {
    let page = resolve_page(&raw(None, Some("5"), None, None))
      .unwrap()
      .unwrap();
    assert_eq!(page.number(), 1);
    assert_eq!(page.size(), 5);
  }

  #[test]
  fn page_alone_defaults_the_size() {
    let page = resolve_page(&raw(Some("2"), None, None, None))
      .unwrap()
      .unwrap();
    assert_eq!(page.size(), DEFAULT_PAGE_SIZE);
  }

  #[test]
  fn out_of_range_values_are_clamped_not_rejected() {
    let page = resolve_page(&raw(Some("0"), Some("5000"), None, None))
      .unwrap()
      .unwrap();
    assert_eq!(page.number(), 1);
    assert_eq!(page.size(), 100);
  }

  #[test]
  fn non_numeric_input_is_rejected() {
    let err = resolve_page(&raw(Some("abc"), None, None, None)).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let err = resolve_page(&raw(None, Some("2x"), None, None)).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
  }
}
