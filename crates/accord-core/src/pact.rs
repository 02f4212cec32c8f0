//! Pact publications — links from a consumer version to a provider and an
//! immutable, content-addressed pact document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One publication event. Republishing the same (consumer version,
/// provider) pair produces a new row with a higher `revision_number`;
/// only the highest revision is "current".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PactPublication {
  pub id:                  i64,
  pub consumer_version_id: i64,
  pub provider_id:         i64,
  pub pact_version_id:     i64,
  pub revision_number:     i64,
  pub created_at:          DateTime<Utc>,
}

/// Input for publishing a pact. The provider is created on first sight;
/// the consumer and its version must already exist.
#[derive(Debug, Clone)]
pub struct NewPact {
  pub consumer:         String,
  pub consumer_version: String,
  pub provider:         String,
  pub content:          serde_json::Value,
}

/// The current pact on a branch: the document published by the newest
/// branch member that has a publication to the provider, at its highest
/// revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPact {
  pub consumer_version: String,
  pub sha:              String,
  pub revision:         i64,
  pub content:          serde_json::Value,
}
