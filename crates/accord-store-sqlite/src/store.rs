//! [`SqliteStore`] — the SQLite implementation of [`BrokerStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use accord_core::{
  deployment::{
    DeployedVersion, Environment, NewDeployment, NewRelease, ReleasedVersion,
  },
  pact::{BranchPact, NewPact, PactPublication},
  pacticipant::Pacticipant,
  query::{PageParams, VersionPage, VersionSelector},
  store::BrokerStore,
  version::{NewVersion, Version},
};

use crate::{
  Error, Result,
  encode::{decode_dt, encode_dt, encode_uuid},
  observer::{ObserverHandle, QueryObserver, note},
  schema::SCHEMA,
};

/// Default bound on the read path.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Accord broker store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// calls are serialized onto the connection's worker thread, which also
/// serializes concurrent activation flips per scope.
#[derive(Clone)]
pub struct SqliteStore {
  conn:                     tokio_rusqlite::Connection,
  pub(crate) observer:      ObserverHandle,
  pub(crate) read_timeout:  Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self {
      conn,
      observer: None,
      read_timeout: DEFAULT_READ_TIMEOUT,
    };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self {
      conn,
      observer: None,
      read_timeout: DEFAULT_READ_TIMEOUT,
    };
    store.init_schema().await?;
    Ok(store)
  }

  /// Attach a [`QueryObserver`]; every statement executed from then on
  /// is reported to it before running.
  pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
    self.observer = Some(observer);
    self
  }

  /// Override the read-path timeout (default 30 s).
  pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
    self.read_timeout = timeout;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection {
    &self.conn
  }

  // ── Name-to-id lookups ────────────────────────────────────────────────────

  async fn pacticipant_id(&self, name: &str) -> Result<Option<i64>> {
    let observer = self.observer.clone();
    let name = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        let sql = "SELECT id FROM pacticipants WHERE name = ?1";
        note(&observer, sql);
        Ok(
          conn
            .query_row(sql, rusqlite::params![name], |r| r.get::<_, i64>(0))
            .optional()?,
        )
      })
      .await?;
    Ok(id)
  }

  async fn version_id(
    &self,
    pacticipant_id: i64,
    number: &str,
  ) -> Result<Option<i64>> {
    let observer = self.observer.clone();
    let number = number.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        let sql =
          "SELECT id FROM versions WHERE pacticipant_id = ?1 AND number = ?2";
        note(&observer, sql);
        Ok(
          conn
            .query_row(sql, rusqlite::params![pacticipant_id, number], |r| {
              r.get::<_, i64>(0)
            })
            .optional()?,
        )
      })
      .await?;
    Ok(id)
  }

  async fn branch_id(
    &self,
    pacticipant_id: i64,
    name: &str,
  ) -> Result<Option<i64>> {
    let observer = self.observer.clone();
    let name = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        let sql =
          "SELECT id FROM branches WHERE pacticipant_id = ?1 AND name = ?2";
        note(&observer, sql);
        Ok(
          conn
            .query_row(sql, rusqlite::params![pacticipant_id, name], |r| {
              r.get::<_, i64>(0)
            })
            .optional()?,
        )
      })
      .await?;
    Ok(id)
  }

  async fn environment_id(&self, name: &str) -> Result<Option<i64>> {
    let observer = self.observer.clone();
    let name = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        let sql = "SELECT id FROM environments WHERE name = ?1";
        note(&observer, sql);
        Ok(
          conn
            .query_row(sql, rusqlite::params![name], |r| r.get::<_, i64>(0))
            .optional()?,
        )
      })
      .await?;
    Ok(id)
  }

  /// Resolve the ids a deployment/release record needs, failing with the
  /// most specific `*NotFound`.
  async fn resolve_record_scope(
    &self,
    pacticipant: &str,
    version: &str,
    environment: &str,
  ) -> Result<(i64, i64, i64)> {
    let pacticipant_id = self
      .pacticipant_id(pacticipant)
      .await?
      .ok_or_else(|| Error::PacticipantNotFound(pacticipant.to_owned()))?;
    let version_id = self
      .version_id(pacticipant_id, version)
      .await?
      .ok_or_else(|| Error::VersionNotFound {
        pacticipant: pacticipant.to_owned(),
        number:      version.to_owned(),
      })?;
    let environment_id = self
      .environment_id(environment)
      .await?
      .ok_or_else(|| Error::EnvironmentNotFound(environment.to_owned()))?;
    Ok((pacticipant_id, version_id, environment_id))
  }
}

// ─── BrokerStore impl ────────────────────────────────────────────────────────

impl BrokerStore for SqliteStore {
  type Error = Error;

  // ── Pacticipants ──────────────────────────────────────────────────────────

  async fn create_pacticipant(&self, name: &str) -> Result<Pacticipant> {
    let observer = self.observer.clone();
    let created_at = Utc::now();
    let name_owned = name.to_owned();
    let at_str = encode_dt(created_at);

    let id = self
      .conn
      .call(move |conn| {
        let sql = "INSERT INTO pacticipants (name, created_at) VALUES (?1, ?2)";
        note(&observer, sql);
        conn.execute(sql, rusqlite::params![name_owned, at_str])?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Pacticipant { id, name: name.to_owned(), created_at })
  }

  async fn find_pacticipant(&self, name: &str) -> Result<Option<Pacticipant>> {
    let observer = self.observer.clone();
    let name = name.to_owned();

    let raw: Option<(i64, String, String)> = self
      .conn
      .call(move |conn| {
        let sql =
          "SELECT id, name, created_at FROM pacticipants WHERE name = ?1";
        note(&observer, sql);
        Ok(
          conn
            .query_row(sql, rusqlite::params![name], |row| {
              Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, name, at)| {
        Ok(Pacticipant { id, name, created_at: decode_dt(&at)? })
      })
      .transpose()
  }

  // ── Versions, branches, tags ──────────────────────────────────────────────

  async fn create_version(&self, input: NewVersion) -> Result<Version> {
    let pacticipant_id = self
      .pacticipant_id(&input.pacticipant)
      .await?
      .ok_or_else(|| Error::PacticipantNotFound(input.pacticipant.clone()))?;

    let observer = self.observer.clone();
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let number = input.number.clone();
    let branch = input.branch.clone();
    let tags = input.tags.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Idempotent per (pacticipant, number): reuse the row if the
        // version was already published.
        let select =
          "SELECT id FROM versions WHERE pacticipant_id = ?1 AND number = ?2";
        note(&observer, select);
        let existing: Option<i64> = tx
          .query_row(select, rusqlite::params![pacticipant_id, number], |r| {
            r.get(0)
          })
          .optional()?;

        let version_id = match existing {
          Some(id) => id,
          None => {
            let insert = "INSERT INTO versions (pacticipant_id, number, created_at)
               VALUES (?1, ?2, ?3)";
            note(&observer, insert);
            tx.execute(insert, rusqlite::params![pacticipant_id, number, at_str])?;
            tx.last_insert_rowid()
          }
        };

        if let Some(branch_name) = &branch {
          let ensure_branch = "INSERT OR IGNORE INTO branches (pacticipant_id, name, created_at)
             VALUES (?1, ?2, ?3)";
          note(&observer, ensure_branch);
          tx.execute(
            ensure_branch,
            rusqlite::params![pacticipant_id, branch_name, at_str],
          )?;

          let branch_id_sql =
            "SELECT id FROM branches WHERE pacticipant_id = ?1 AND name = ?2";
          note(&observer, branch_id_sql);
          let branch_id: i64 = tx.query_row(
            branch_id_sql,
            rusqlite::params![pacticipant_id, branch_name],
            |r| r.get(0),
          )?;

          let membership = "INSERT OR IGNORE INTO branch_versions (branch_id, version_id, created_at)
             VALUES (?1, ?2, ?3)";
          note(&observer, membership);
          tx.execute(
            membership,
            rusqlite::params![branch_id, version_id, at_str],
          )?;
        }

        for tag in &tags {
          let tag_sql = "INSERT OR IGNORE INTO tags (pacticipant_id, version_id, name, created_at)
             VALUES (?1, ?2, ?3, ?4)";
          note(&observer, tag_sql);
          tx.execute(
            tag_sql,
            rusqlite::params![pacticipant_id, version_id, tag, at_str],
          )?;
        }

        tx.commit()?;
        Ok(version_id)
      })
      .await?;

    Ok(Version {
      id,
      pacticipant_id,
      number: input.number,
      created_at,
    })
  }

  async fn tag_version(
    &self,
    pacticipant: &str,
    number: &str,
    tag: &str,
  ) -> Result<()> {
    let pacticipant_id = self
      .pacticipant_id(pacticipant)
      .await?
      .ok_or_else(|| Error::PacticipantNotFound(pacticipant.to_owned()))?;
    let version_id = self
      .version_id(pacticipant_id, number)
      .await?
      .ok_or_else(|| Error::VersionNotFound {
        pacticipant: pacticipant.to_owned(),
        number:      number.to_owned(),
      })?;

    let observer = self.observer.clone();
    let tag = tag.to_owned();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let sql = "INSERT OR IGNORE INTO tags (pacticipant_id, version_id, name, created_at)
           VALUES (?1, ?2, ?3, ?4)";
        note(&observer, sql);
        conn.execute(
          sql,
          rusqlite::params![pacticipant_id, version_id, tag, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Pacts ─────────────────────────────────────────────────────────────────

  async fn publish_pact(&self, input: NewPact) -> Result<PactPublication> {
    let consumer_id = self
      .pacticipant_id(&input.consumer)
      .await?
      .ok_or_else(|| Error::PacticipantNotFound(input.consumer.clone()))?;
    let consumer_version_id = self
      .version_id(consumer_id, &input.consumer_version)
      .await?
      .ok_or_else(|| Error::VersionNotFound {
        pacticipant: input.consumer.clone(),
        number:      input.consumer_version.clone(),
      })?;

    let content = serde_json::to_string(&input.content)?;
    let sha = format!("{:x}", Sha256::digest(content.as_bytes()));

    let observer = self.observer.clone();
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let provider = input.provider.clone();

    let (id, provider_id, pact_version_id, revision_number) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Providers are created on first sight.
        let ensure_provider =
          "INSERT OR IGNORE INTO pacticipants (name, created_at) VALUES (?1, ?2)";
        note(&observer, ensure_provider);
        tx.execute(ensure_provider, rusqlite::params![provider, at_str])?;

        let provider_id_sql = "SELECT id FROM pacticipants WHERE name = ?1";
        note(&observer, provider_id_sql);
        let provider_id: i64 =
          tx.query_row(provider_id_sql, rusqlite::params![provider], |r| {
            r.get(0)
          })?;

        // Content-addressed pact document; identical content is shared.
        let ensure_pact_version =
          "INSERT OR IGNORE INTO pact_versions (sha, content, created_at)
           VALUES (?1, ?2, ?3)";
        note(&observer, ensure_pact_version);
        tx.execute(
          ensure_pact_version,
          rusqlite::params![sha, content, at_str],
        )?;

        let pact_version_id_sql = "SELECT id FROM pact_versions WHERE sha = ?1";
        note(&observer, pact_version_id_sql);
        let pact_version_id: i64 =
          tx.query_row(pact_version_id_sql, rusqlite::params![sha], |r| {
            r.get(0)
          })?;

        let next_revision_sql =
          "SELECT COALESCE(MAX(revision_number), 0) + 1 FROM pact_publications
           WHERE consumer_version_id = ?1 AND provider_id = ?2";
        note(&observer, next_revision_sql);
        let revision_number: i64 = tx.query_row(
          next_revision_sql,
          rusqlite::params![consumer_version_id, provider_id],
          |r| r.get(0),
        )?;

        let insert = "INSERT INTO pact_publications
           (consumer_version_id, provider_id, pact_version_id, revision_number, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)";
        note(&observer, insert);
        tx.execute(
          insert,
          rusqlite::params![
            consumer_version_id,
            provider_id,
            pact_version_id,
            revision_number,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok((id, provider_id, pact_version_id, revision_number))
      })
      .await?;

    Ok(PactPublication {
      id,
      consumer_version_id,
      provider_id,
      pact_version_id,
      revision_number,
      created_at,
    })
  }

  async fn latest_pact_for_branch(
    &self,
    consumer: &str,
    provider: &str,
    branch: &str,
  ) -> Result<BranchPact> {
    let consumer_id = self
      .pacticipant_id(consumer)
      .await?
      .ok_or_else(|| Error::PacticipantNotFound(consumer.to_owned()))?;
    let provider_id = self
      .pacticipant_id(provider)
      .await?
      .ok_or_else(|| Error::PacticipantNotFound(provider.to_owned()))?;
    let branch_id = self
      .branch_id(consumer_id, branch)
      .await?
      .ok_or_else(|| Error::BranchNotFound {
        pacticipant: consumer.to_owned(),
        branch:      branch.to_owned(),
      })?;

    let observer = self.observer.clone();
    let raw: Option<(String, String, String, i64)> = self
      .conn
      .call(move |conn| {
        // Newest branch member carrying a publication to this provider;
        // members without one are skipped.
        let sql = "SELECT v.number, pv.sha, pv.content, pp.revision_number
           FROM versions v
           JOIN branch_versions bv ON bv.version_id = v.id
           JOIN pact_publications pp ON pp.consumer_version_id = v.id
           JOIN pact_versions pv ON pv.id = pp.pact_version_id
           WHERE bv.branch_id = ?1 AND pp.provider_id = ?2
           ORDER BY v.id DESC, pp.revision_number DESC
           LIMIT 1";
        note(&observer, sql);
        Ok(
          conn
            .query_row(sql, rusqlite::params![branch_id, provider_id], |row| {
              Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?,
        )
      })
      .await?;

    match raw {
      None => Err(Error::PactNotFound {
        consumer: consumer.to_owned(),
        provider: provider.to_owned(),
        branch:   branch.to_owned(),
      }),
      Some((consumer_version, sha, content, revision)) => Ok(BranchPact {
        consumer_version,
        sha,
        revision,
        content: serde_json::from_str(&content)?,
      }),
    }
  }

  // ── Environments and activation ───────────────────────────────────────────

  async fn create_environment(&self, name: &str) -> Result<Environment> {
    let observer = self.observer.clone();
    let created_at = Utc::now();
    let name_owned = name.to_owned();
    let at_str = encode_dt(created_at);

    let id = self
      .conn
      .call(move |conn| {
        let sql = "INSERT INTO environments (name, created_at) VALUES (?1, ?2)";
        note(&observer, sql);
        conn.execute(sql, rusqlite::params![name_owned, at_str])?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Environment { id, name: name.to_owned(), created_at })
  }

  async fn record_deployment(
    &self,
    input: NewDeployment,
  ) -> Result<DeployedVersion> {
    let (pacticipant_id, version_id, environment_id) = self
      .resolve_record_scope(&input.pacticipant, &input.version, &input.environment)
      .await?;

    let observer = self.observer.clone();
    let uuid = Uuid::new_v4();
    let uuid_str = encode_uuid(uuid);
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let target = input.target.clone();

    let id = self
      .conn
      .call(move |conn| {
        // The flip is the only mutation in this subsystem: deactivate
        // whatever is active for the scope, then insert the new record
        // active, atomically.
        let tx = conn.transaction()?;

        let deactivate = "UPDATE deployed_versions SET currently_deployed = 0
           WHERE pacticipant_id = ?1 AND environment_id = ?2 AND target IS ?3
             AND currently_deployed = 1";
        note(&observer, deactivate);
        tx.execute(
          deactivate,
          rusqlite::params![pacticipant_id, environment_id, target],
        )?;

        let insert = "INSERT INTO deployed_versions
           (uuid, pacticipant_id, version_id, environment_id, target, currently_deployed, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)";
        note(&observer, insert);
        tx.execute(
          insert,
          rusqlite::params![
            uuid_str,
            pacticipant_id,
            version_id,
            environment_id,
            target,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(DeployedVersion {
      id,
      uuid,
      pacticipant_id,
      version_id,
      environment_id,
      target: input.target,
      currently_deployed: true,
      created_at,
    })
  }

  async fn record_release(&self, input: NewRelease) -> Result<ReleasedVersion> {
    let (pacticipant_id, version_id, environment_id) = self
      .resolve_record_scope(&input.pacticipant, &input.version, &input.environment)
      .await?;

    let observer = self.observer.clone();
    let uuid = Uuid::new_v4();
    let uuid_str = encode_uuid(uuid);
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let deactivate = "UPDATE released_versions SET currently_released = 0
           WHERE pacticipant_id = ?1 AND environment_id = ?2
             AND currently_released = 1";
        note(&observer, deactivate);
        tx.execute(deactivate, rusqlite::params![pacticipant_id, environment_id])?;

        let insert = "INSERT INTO released_versions
           (uuid, pacticipant_id, version_id, environment_id, currently_released, created_at)
           VALUES (?1, ?2, ?3, ?4, 1, ?5)";
        note(&observer, insert);
        tx.execute(
          insert,
          rusqlite::params![
            uuid_str,
            pacticipant_id,
            version_id,
            environment_id,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(ReleasedVersion {
      id,
      uuid,
      pacticipant_id,
      version_id,
      environment_id,
      currently_released: true,
      created_at,
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_versions(
    &self,
    selector: &VersionSelector,
    page: Option<PageParams>,
  ) -> Result<VersionPage> {
    self.list_versions_snapshot(selector, page).await
  }
}
