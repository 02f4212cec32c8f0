//! Environments and deployed/released version records.
//!
//! At most one record per activation scope carries the active flag at any
//! instant. The store flips the prior record inactive in the same
//! transaction that activates the new one; record creation is the only
//! way a record becomes active, and deactivation the only other
//! transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named deployment target (e.g. "test", "prod").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
  pub id:         i64,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

/// A record of a version being deployed to an environment. Activation
/// scope: (pacticipant, environment, target).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedVersion {
  pub id:                 i64,
  pub uuid:               Uuid,
  pub pacticipant_id:     i64,
  pub version_id:         i64,
  pub environment_id:     i64,
  /// Optional application instance within the environment. Records with
  /// distinct targets activate independently.
  pub target:             Option<String>,
  pub currently_deployed: bool,
  pub created_at:         DateTime<Utc>,
}

/// A record of a version being released to an environment. Activation
/// scope: (pacticipant, environment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasedVersion {
  pub id:                 i64,
  pub uuid:               Uuid,
  pub pacticipant_id:     i64,
  pub version_id:         i64,
  pub environment_id:     i64,
  pub currently_released: bool,
  pub created_at:         DateTime<Utc>,
}

/// Input for recording a deployment.
#[derive(Debug, Clone)]
pub struct NewDeployment {
  pub pacticipant: String,
  pub version:     String,
  pub environment: String,
  pub target:      Option<String>,
}

/// Input for recording a release.
#[derive(Debug, Clone)]
pub struct NewRelease {
  pub pacticipant: String,
  pub version:     String,
  pub environment: String,
}
