//! Fault classification for backend errors.
//!
//! Transport layers (HTTP, CLI) need to choose a response class for any
//! backend error without naming the backend crate. Backends implement
//! [`Fault`] on their error enum; the API layer matches on [`FaultKind`].

/// Coarse error classification, one variant per response class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
  /// A named pacticipant, branch, tag, version, or environment does not
  /// exist. Maps to 404. Not retryable.
  NotFound,
  /// Malformed caller input (e.g. non-numeric pagination). Maps to 400.
  InvalidParameter,
  /// A storage query exceeded its bound. Maps to 503; the caller may
  /// retry. Never retried internally.
  Timeout,
  /// Stored data contradicts a documented invariant (e.g. two active
  /// deployment records in one scope). Logged for operator remediation.
  InvariantViolation,
  /// Everything else.
  Internal,
}

/// Implemented by storage error types so transport layers can classify
/// them generically.
pub trait Fault {
  fn fault_kind(&self) -> FaultKind;
}
