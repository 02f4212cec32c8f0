//! Pacticipant — a named participant (consumer or provider) in contract
//! relationships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named application taking part in contract relationships. A
/// pacticipant owns its versions, branches, tags, and deployment records.
/// Names are unique across the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pacticipant {
  pub id:         i64,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}
