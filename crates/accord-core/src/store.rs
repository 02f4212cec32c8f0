//! The `BrokerStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `accord-store-sqlite`). Higher layers (`accord-api`, `accord-server`)
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  deployment::{
    DeployedVersion, Environment, NewDeployment, NewRelease, ReleasedVersion,
  },
  error::Fault,
  pact::{BranchPact, NewPact, PactPublication},
  pacticipant::Pacticipant,
  query::{PageParams, VersionPage, VersionSelector},
  version::{NewVersion, Version},
};

/// Abstraction over an Accord storage backend.
///
/// Versions and their branch/tag memberships are append-only. The only
/// mutation in the model is the deployed/released activation flip, which
/// each backend must make atomic per scope.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait BrokerStore: Send + Sync {
  type Error: std::error::Error + Fault + Send + Sync + 'static;

  // ── Pacticipants ──────────────────────────────────────────────────────

  /// Create a pacticipant with a unique name.
  fn create_pacticipant<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Pacticipant, Self::Error>> + Send + 'a;

  /// Look up a pacticipant by name. Returns `None` if not found.
  fn find_pacticipant<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Pacticipant>, Self::Error>> + Send + 'a;

  // ── Versions, branches, tags — append-only writes ─────────────────────

  /// Create a version for an existing pacticipant, optionally appending
  /// branch membership and tags. Idempotent per (pacticipant, number):
  /// recreating an existing version appends the new memberships to it.
  fn create_version(
    &self,
    input: NewVersion,
  ) -> impl Future<Output = Result<Version, Self::Error>> + Send + '_;

  /// Attach a tag to an existing version. Append-only; tagging twice is
  /// a no-op.
  fn tag_version<'a>(
    &'a self,
    pacticipant: &'a str,
    number: &'a str,
    tag: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Pacts ─────────────────────────────────────────────────────────────

  /// Publish a pact from an existing consumer version to a provider
  /// (created on first sight). Republishing the same pair bumps the
  /// revision number.
  fn publish_pact(
    &self,
    input: NewPact,
  ) -> impl Future<Output = Result<PactPublication, Self::Error>> + Send + '_;

  /// Fetch the current pact on a branch: find the newest branch member
  /// with a publication to `provider` and return that publication's
  /// content at its highest revision. Branch members without a
  /// publication are skipped.
  fn latest_pact_for_branch<'a>(
    &'a self,
    consumer: &'a str,
    provider: &'a str,
    branch: &'a str,
  ) -> impl Future<Output = Result<BranchPact, Self::Error>> + Send + 'a;

  // ── Environments and activation ───────────────────────────────────────

  /// Create a deployment environment with a unique name.
  fn create_environment<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Environment, Self::Error>> + Send + 'a;

  /// Record a deployment and activate it: within one transaction, any
  /// currently-deployed record for the same (pacticipant, environment,
  /// target) scope is deactivated, then the new record is inserted
  /// active.
  fn record_deployment(
    &self,
    input: NewDeployment,
  ) -> impl Future<Output = Result<DeployedVersion, Self::Error>> + Send + '_;

  /// Record a release and activate it; same semantics as
  /// [`record_deployment`](Self::record_deployment) with scope
  /// (pacticipant, environment).
  fn record_release(
    &self,
    input: NewRelease,
  ) -> impl Future<Output = Result<ReleasedVersion, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// List versions matching `selector`, ordered by creation (id
  /// ascending), each decorated with branch names, head-tag names, pact
  /// publication links, and active deployed/released-environment links.
  ///
  /// The whole read executes against one consistent snapshot, and the
  /// number of storage queries issued is a small constant independent of
  /// the page size.
  fn list_versions<'a>(
    &'a self,
    selector: &'a VersionSelector,
    page: Option<PageParams>,
  ) -> impl Future<Output = Result<VersionPage, Self::Error>> + Send + 'a;
}
