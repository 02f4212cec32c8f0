//! Versions and the branch groupings scoped to one pacticipant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable, ordered revision of a pacticipant's artifact.
///
/// `id` is assigned by the store in creation order and is the sole basis
/// for ordering and "latest" computations. `number` is unique per
/// pacticipant only, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
  pub id:             i64,
  pub pacticipant_id: i64,
  pub number:         String,
  pub created_at:     DateTime<Utc>,
}

/// A named grouping of versions scoped to one pacticipant. Membership is
/// append-only; the branch head is the most-recently-created member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
  pub id:             i64,
  pub pacticipant_id: i64,
  pub name:           String,
  pub created_at:     DateTime<Utc>,
}

/// Input for creating a version, optionally placing it on a branch and
/// attaching tags in the same operation.
#[derive(Debug, Clone)]
pub struct NewVersion {
  pub pacticipant: String,
  pub number:      String,
  pub branch:      Option<String>,
  pub tags:        Vec<String>,
}

impl NewVersion {
  pub fn new(
    pacticipant: impl Into<String>,
    number: impl Into<String>,
  ) -> Self {
    Self {
      pacticipant: pacticipant.into(),
      number:      number.into(),
      branch:      None,
      tags:        Vec::new(),
    }
  }

  pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
    self.branch = Some(branch.into());
    self
  }

  pub fn tagged(mut self, tag: impl Into<String>) -> Self {
    self.tags.push(tag.into());
    self
  }
}
