//! Error type for `accord-store-sqlite`.

use std::time::Duration;

use accord_core::{Fault, FaultKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("pacticipant not found: {0}")]
  PacticipantNotFound(String),

  #[error("branch {branch:?} not found for pacticipant {pacticipant:?}")]
  BranchNotFound { pacticipant: String, branch: String },

  #[error("tag {tag:?} not found for pacticipant {pacticipant:?}")]
  TagNotFound { pacticipant: String, tag: String },

  #[error("version {number:?} not found for pacticipant {pacticipant:?}")]
  VersionNotFound { pacticipant: String, number: String },

  #[error("environment not found: {0}")]
  EnvironmentNotFound(String),

  #[error(
    "no pact found for provider {provider:?} on branch {branch:?} of consumer {consumer:?}"
  )]
  PactNotFound {
    consumer: String,
    provider: String,
    branch:   String,
  },

  /// The read path exceeded its bound. Surfaced to the caller for its
  /// own retry decision; never retried here.
  #[error("query timed out after {0:?}")]
  QueryTimeout(Duration),
}

impl Fault for Error {
  fn fault_kind(&self) -> FaultKind {
    match self {
      Error::PacticipantNotFound(_)
      | Error::BranchNotFound { .. }
      | Error::TagNotFound { .. }
      | Error::VersionNotFound { .. }
      | Error::EnvironmentNotFound(_)
      | Error::PactNotFound { .. } => FaultKind::NotFound,
      Error::QueryTimeout(_) => FaultKind::Timeout,
      _ => FaultKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
