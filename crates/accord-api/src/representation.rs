//! HAL rendering of version listings.
//!
//! The document embeds the version array under `_embedded.versions`,
//! mirrors it as a `_links.pb:versions` link array, and carries
//! pagination navigation links plus a `page` object — the latter only
//! when the request paginated explicitly.

use accord_core::{
  pact::BranchPact,
  query::{VersionDetails, VersionPage, VersionSelector},
};
use serde_json::{Value, json};

/// Render a whole listing response body.
pub fn versions_document(
  base_url: &str,
  selector: &VersionSelector,
  page: &VersionPage,
) -> Value {
  let listing = listing_path(selector);
  let versions: Vec<Value> = page
    .entries
    .iter()
    .map(|v| version_entry(base_url, &selector.pacticipant, v))
    .collect();

  let mut links = json!({
    "self": { "href": format!("{base_url}{listing}") },
    "pb:versions": page.entries.iter().map(|v| json!({
      "href": version_href(base_url, &selector.pacticipant, &v.number),
      "title": "Version",
      "name": v.number,
    })).collect::<Vec<_>>(),
  });

  let mut body = json!({
    "_embedded": { "versions": versions },
  });

  if let Some(info) = page.page {
    let paged = |number: u64| {
      json!({ "href": format!(
        "{base_url}{listing}?pageNumber={number}&pageSize={}", info.size
      ) })
    };
    let last_page = page.total_pages().unwrap_or(0).max(1);
    links["first"] = paged(1);
    links["last"] = paged(last_page);
    if page.has_next() {
      links["next"] = paged(u64::from(info.number) + 1);
    }
    if page.has_prev() {
      links["prev"] = paged(u64::from(info.number) - 1);
    }
    body["page"] = json!({
      "pageNumber": info.number,
      "pageSize": info.size,
      "total": page.total,
      "totalPages": page.total_pages(),
    });
  }

  body["_links"] = links;
  body
}

fn listing_path(selector: &VersionSelector) -> String {
  let pacticipant = &selector.pacticipant;
  match (&selector.branch, &selector.tag) {
    (Some(branch), _) => {
      format!("/pacticipants/{pacticipant}/branches/{branch}/versions")
    }
    (None, Some(tag)) => {
      format!("/pacticipants/{pacticipant}/tags/{tag}/versions")
    }
    (None, None) => format!("/pacticipants/{pacticipant}/versions"),
  }
}

fn version_href(base_url: &str, pacticipant: &str, number: &str) -> String {
  format!("{base_url}/pacticipants/{pacticipant}/versions/{number}")
}

fn version_entry(base_url: &str, pacticipant: &str, v: &VersionDetails) -> Value {
  json!({
    "number": v.number,
    "createdAt": v.created_at.to_rfc3339(),
    "branches": v.branches,
    "tags": v.head_tags,
    "_links": {
      "self": {
        "href": version_href(base_url, pacticipant, &v.number),
        "title": "Version",
        "name": v.number,
      },
      "pb:pact-versions": v.pacts.iter().map(|p| json!({
        "href": format!(
          "{base_url}/pacts/provider/{}/consumer/{pacticipant}/pact-version/{}",
          p.provider, p.sha
        ),
        "title": "Pact",
        "name": p.provider,
      })).collect::<Vec<_>>(),
      "pb:deployed-environments": v.deployed.iter().map(|d| json!({
        "href": format!("{base_url}/environments/{}", d.environment),
        "title": "Deployed environment",
        "name": d.environment,
        "target": d.target,
      })).collect::<Vec<_>>(),
      "pb:released-environments": v.released.iter().map(|r| json!({
        "href": format!("{base_url}/environments/{}", r.environment),
        "title": "Released environment",
        "name": r.environment,
      })).collect::<Vec<_>>(),
    },
  })
}

/// Render a branch's current pact: the stored content itself, with a
/// `_links.self` pointing at the consumer version it was published by.
pub fn branch_pact_document(
  base_url: &str,
  consumer: &str,
  provider: &str,
  pact: &BranchPact,
) -> Value {
  let mut body = pact.content.clone();
  if let Some(object) = body.as_object_mut() {
    object.insert(
      "_links".to_owned(),
      json!({
        "self": {
          "href": format!(
            "{base_url}/pacts/provider/{provider}/consumer/{consumer}/version/{}",
            pact.consumer_version
          ),
          "name": pact.consumer_version,
        },
        "pb:pact-version": {
          "href": format!(
            "{base_url}/pacts/provider/{provider}/consumer/{consumer}/pact-version/{}",
            pact.sha
          ),
        },
      }),
    );
  }
  body
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use accord_core::query::{PageInfo, VersionPage, VersionSelector};
  use chrono::Utc;

  use super::*;

  fn details(id: i64, number: &str) -> VersionDetails {
    VersionDetails {
      id,
      number: number.to_owned(),
      created_at: Utc::now(),
      branches: vec!["main".to_owned()],
      head_tags: Vec::new(),
      pacts: Vec::new(),
      deployed: Vec::new(),
      released: Vec::new(),
    }
  }

  #[test]
  fn unpaged_document_omits_the_page_section() {
    let page = VersionPage {
      entries: vec![details(1, "1")],
      total:   1,
      page:    None,
    };
    let selector = VersionSelector::for_pacticipant("Foo");
    let body = versions_document("http://broker.test", &selector, &page);

    assert!(body.get("page").is_none());
    assert!(body["_links"].get("next").is_none());
    assert_eq!(body["_embedded"]["versions"].as_array().unwrap().len(), 1);
  }

  #[test]
  fn paged_document_carries_page_and_navigation() {
    let page = VersionPage {
      entries: vec![details(1, "1"), details(2, "2")],
      total:   3,
      page:    Some(PageInfo { number: 1, size: 2 }),
    };
    let selector = VersionSelector::for_pacticipant("Foo").on_branch("main");
    let body = versions_document("http://broker.test", &selector, &page);

    assert_eq!(body["page"]["pageNumber"], 1);
    assert_eq!(body["page"]["total"], 3);
    assert_eq!(body["page"]["totalPages"], 2);
    assert!(body["_links"].get("next").is_some());
    assert!(body["_links"].get("prev").is_none());
    assert!(body["_links"].get("first").is_some());
    let last_href = body["_links"]["last"]["href"].as_str().unwrap();
    assert!(last_href.contains("pageNumber=2"), "{last_href}");
    let self_href = body["_links"]["self"]["href"].as_str().unwrap();
    assert!(self_href.contains("/branches/main/versions"), "{self_href}");
  }

  #[test]
  fn last_link_carries_the_full_page_count() {
    let page = VersionPage {
      entries: vec![details(1, "1")],
      total:   u64::from(u32::MAX) + 5,
      page:    Some(PageInfo { number: 1, size: 1 }),
    };
    let selector = VersionSelector::for_pacticipant("Foo");
    let body = versions_document("http://broker.test", &selector, &page);

    let last_href = body["_links"]["last"]["href"].as_str().unwrap();
    let expected = format!("pageNumber={}", u64::from(u32::MAX) + 5);
    assert!(last_href.contains(&expected), "{last_href}");
  }

  #[test]
  fn branch_pact_document_is_the_content_plus_links() {
    let pact = BranchPact {
      consumer_version: "2".to_owned(),
      sha:              "abc123".to_owned(),
      revision:         1,
      content:          serde_json::json!({
        "interactions": [{ "description": "a request for an alligator" }],
      }),
    };
    let body =
      branch_pact_document("http://broker.test", "Consumer", "Provider", &pact);

    assert_eq!(body["interactions"][0]["description"], "a request for an alligator");
    let self_href = body["_links"]["self"]["href"].as_str().unwrap();
    assert!(self_href.ends_with("/version/2"), "{self_href}");
    let pv_href = body["_links"]["pb:pact-version"]["href"].as_str().unwrap();
    assert!(pv_href.ends_with("/pact-version/abc123"), "{pv_href}");
  }

  #[test]
  fn last_page_has_prev_but_no_next() {
    let page = VersionPage {
      entries: vec![details(3, "3")],
      total:   3,
      page:    Some(PageInfo { number: 2, size: 2 }),
    };
    let selector = VersionSelector::for_pacticipant("Foo");
    let body = versions_document("http://broker.test", &selector, &page);

    assert!(body["_links"].get("next").is_none());
    assert!(body["_links"].get("prev").is_some());
  }
}
