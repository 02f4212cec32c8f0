//! Query descriptors and the paginated result envelope for version
//! listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on page size. Larger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size applied when pagination is explicit but no size was given.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ─── Selector ────────────────────────────────────────────────────────────────

/// Which versions to list. The branch and tag filters are independent
/// membership filters and may be combined in one selector.
#[derive(Debug, Clone)]
pub struct VersionSelector {
  pub pacticipant: String,
  pub branch:      Option<String>,
  pub tag:         Option<String>,
}

impl VersionSelector {
  pub fn for_pacticipant(name: impl Into<String>) -> Self {
    Self { pacticipant: name.into(), branch: None, tag: None }
  }

  pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
    self.branch = Some(branch.into());
    self
  }

  pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
    self.tag = Some(tag.into());
    self
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// A validated, clamped pagination request. Pages are 1-based.
///
/// Out-of-range numeric input is clamped into range rather than
/// rejected; rejecting is reserved for non-numeric input, which the
/// transport layer handles before this type is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
  number: u32,
  size:   u32,
}

impl PageParams {
  /// Build from raw numeric input: `number < 1` becomes 1, `size` is
  /// forced into `1..=MAX_PAGE_SIZE`.
  pub fn new(number: i64, size: i64) -> Self {
    Self {
      number: number.clamp(1, i64::from(u32::MAX)) as u32,
      size:   size.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32,
    }
  }

  pub fn number(&self) -> u32 {
    self.number
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  /// Row offset of the first entry on this page.
  pub fn offset(&self) -> u64 {
    u64::from(self.number - 1) * u64::from(self.size)
  }
}

impl Default for PageParams {
  fn default() -> Self {
    Self { number: 1, size: DEFAULT_PAGE_SIZE }
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// A pact-publication link attached to a version. Only the current
/// (highest) revision per provider is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PactRef {
  pub provider: String,
  pub sha:      String,
  pub revision: i64,
}

/// A deployed/released-environment link attached to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRef {
  pub environment:      String,
  pub target:           Option<String>,
  pub currently_active: bool,
}

/// One version row decorated with its derived metadata. Every collection
/// defaults to empty when the version has no matching records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDetails {
  pub id:         i64,
  pub number:     String,
  pub created_at: DateTime<Utc>,
  /// Names of branches this version belongs to, sorted.
  pub branches:   Vec<String>,
  /// Tags for which this version is the current head, sorted.
  pub head_tags:  Vec<String>,
  pub pacts:      Vec<PactRef>,
  pub deployed:   Vec<EnvironmentRef>,
  pub released:   Vec<EnvironmentRef>,
}

/// The pagination position a listing was served at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
  pub number: u32,
  pub size:   u32,
}

/// The ordered result of a version listing.
///
/// `page` is `None` when the request carried no pagination parameters;
/// such a listing returns every matching version in one implicit page
/// and the transport layer omits the page section entirely.
#[derive(Debug, Clone)]
pub struct VersionPage {
  pub entries: Vec<VersionDetails>,
  pub total:   u64,
  pub page:    Option<PageInfo>,
}

impl VersionPage {
  /// Number of pages at the served size; `None` when unpaged.
  pub fn total_pages(&self) -> Option<u64> {
    self.page.map(|p| self.total.div_ceil(u64::from(p.size)))
  }

  /// True iff a later page exists: `page * size < total`.
  pub fn has_next(&self) -> bool {
    match self.page {
      Some(p) => u64::from(p.number) * u64::from(p.size) < self.total,
      None => false,
    }
  }

  /// True iff an earlier page exists: `page > 1`.
  pub fn has_prev(&self) -> bool {
    matches!(self.page, Some(p) if p.number > 1)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_params_clamp_low_values_to_one() {
    let p = PageParams::new(0, -5);
    assert_eq!(p.number(), 1);
    assert_eq!(p.size(), 1);
  }

  #[test]
  fn page_params_clamp_size_to_cap() {
    let p = PageParams::new(2, 5000);
    assert_eq!(p.number(), 2);
    assert_eq!(p.size(), MAX_PAGE_SIZE);
  }

  #[test]
  fn page_params_offset_is_zero_based() {
    assert_eq!(PageParams::new(1, 20).offset(), 0);
    assert_eq!(PageParams::new(3, 20).offset(), 40);
  }

  #[test]
  fn default_page_is_first_page_at_default_size() {
    let p = PageParams::default();
    assert_eq!(p.number(), 1);
    assert_eq!(p.size(), DEFAULT_PAGE_SIZE);
  }

  fn paged(total: u64, number: u32, size: u32) -> VersionPage {
    VersionPage {
      entries: Vec::new(),
      total,
      page: Some(PageInfo { number, size }),
    }
  }

  #[test]
  fn next_present_iff_more_rows_remain() {
    assert!(paged(50, 1, 20).has_next());
    assert!(paged(50, 2, 20).has_next());
    assert!(!paged(50, 3, 20).has_next());
    assert!(!paged(40, 2, 20).has_next());
  }

  #[test]
  fn prev_present_iff_past_first_page() {
    assert!(!paged(50, 1, 20).has_prev());
    assert!(paged(50, 2, 20).has_prev());
  }

  #[test]
  fn total_pages_rounds_up() {
    assert_eq!(paged(50, 1, 20).total_pages(), Some(3));
    assert_eq!(paged(40, 1, 20).total_pages(), Some(2));
    assert_eq!(paged(0, 1, 20).total_pages(), Some(0));
  }

  #[test]
  fn unpaged_listing_has_no_navigation() {
    let page = VersionPage { entries: Vec::new(), total: 7, page: None };
    assert_eq!(page.total_pages(), None);
    assert!(!page.has_next());
    assert!(!page.has_prev());
  }
}
