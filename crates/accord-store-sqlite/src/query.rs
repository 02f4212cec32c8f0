//! The version listing read engine.
//!
//! One request runs as one transaction on the connection's worker
//! thread: name resolution, one count, one page select, then five
//! enrichment queries keyed by the page's id set. The query count is a
//! small constant independent of page size — associations are never
//! loaded per row.

use std::collections::{BTreeMap, HashMap, HashSet};

use rusqlite::{
  OptionalExtension as _, Transaction, params_from_iter, types::Value,
};

use accord_core::query::{
  EnvironmentRef, PactRef, PageInfo, PageParams, VersionDetails, VersionPage,
  VersionSelector,
};

use crate::{
  Error, Result, SqliteStore,
  encode::decode_dt,
  observer::{ObserverHandle, note},
};

// ─── Listing outcome ─────────────────────────────────────────────────────────

/// What the transaction found. Name-resolution misses are data, not
/// errors, inside the closure; the caller maps them to `*NotFound` with
/// the original names attached.
enum Listing {
  PacticipantMissing,
  BranchMissing,
  TagMissing,
  Page { rows: Vec<RawDetails>, total: u64 },
}

/// A fully-enriched row, dates still in their stored text form.
struct RawDetails {
  id:         i64,
  number:     String,
  created_at: String,
  branches:   Vec<String>,
  head_tags:  Vec<String>,
  pacts:      Vec<PactRef>,
  deployed:   Vec<EnvironmentRef>,
  released:   Vec<EnvironmentRef>,
}

impl SqliteStore {
  /// Execute the whole listing pipeline against one snapshot.
  pub(crate) async fn list_versions_snapshot(
    &self,
    selector: &VersionSelector,
    page: Option<PageParams>,
  ) -> Result<VersionPage> {
    let observer = self.observer.clone();
    let pacticipant = selector.pacticipant.clone();
    let branch = selector.branch.clone();
    let tag = selector.tag.clone();

    let call = self.connection().call(move |conn| {
      let tx = conn.transaction()?;
      let listing =
        run_listing(&tx, &observer, &pacticipant, branch.as_deref(), tag.as_deref(), page)?;
      tx.commit()?;
      Ok(listing)
    });

    let timeout = self.read_timeout;
    let listing = tokio::time::timeout(timeout, call)
      .await
      .map_err(|_| Error::QueryTimeout(timeout))??;

    match listing {
      Listing::PacticipantMissing => {
        Err(Error::PacticipantNotFound(selector.pacticipant.clone()))
      }
      Listing::BranchMissing => Err(Error::BranchNotFound {
        pacticipant: selector.pacticipant.clone(),
        branch:      selector.branch.clone().unwrap_or_default(),
      }),
      Listing::TagMissing => Err(Error::TagNotFound {
        pacticipant: selector.pacticipant.clone(),
        tag:         selector.tag.clone().unwrap_or_default(),
      }),
      Listing::Page { rows, total } => {
        let entries = rows
          .into_iter()
          .map(|raw| {
            Ok(VersionDetails {
              id:         raw.id,
              number:     raw.number,
              created_at: decode_dt(&raw.created_at)?,
              branches:   raw.branches,
              head_tags:  raw.head_tags,
              pacts:      raw.pacts,
              deployed:   raw.deployed,
              released:   raw.released,
            })
          })
          .collect::<Result<Vec<_>>>()?;

        Ok(VersionPage {
          entries,
          total,
          page: page.map(|p| PageInfo { number: p.number(), size: p.size() }),
        })
      }
    }
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

fn run_listing(
  tx: &Transaction<'_>,
  observer: &ObserverHandle,
  pacticipant: &str,
  branch: Option<&str>,
  tag: Option<&str>,
  page: Option<PageParams>,
) -> rusqlite::Result<Listing> {
  // Resolve the filter names to ids; any miss short-circuits.
  let sql = "SELECT id FROM pacticipants WHERE name = ?1";
  note(observer, sql);
  let pacticipant_id: Option<i64> = tx
    .query_row(sql, rusqlite::params![pacticipant], |r| r.get(0))
    .optional()?;
  let Some(pacticipant_id) = pacticipant_id else {
    return Ok(Listing::PacticipantMissing);
  };

  let branch_id = match branch {
    None => None,
    Some(name) => {
      let sql = "SELECT id FROM branches WHERE pacticipant_id = ?1 AND name = ?2";
      note(observer, sql);
      let id: Option<i64> = tx
        .query_row(sql, rusqlite::params![pacticipant_id, name], |r| r.get(0))
        .optional()?;
      match id {
        Some(id) => Some(id),
        None => return Ok(Listing::BranchMissing),
      }
    }
  };

  if let Some(name) = tag {
    let sql =
      "SELECT 1 FROM tags WHERE pacticipant_id = ?1 AND name = ?2 LIMIT 1";
    note(observer, sql);
    let exists: Option<i64> = tx
      .query_row(sql, rusqlite::params![pacticipant_id, name], |r| r.get(0))
      .optional()?;
    if exists.is_none() {
      return Ok(Listing::TagMissing);
    }
  }

  // Membership filters use EXISTS, not joins, so rows never duplicate.
  let mut conds = vec!["v.pacticipant_id = ?".to_owned()];
  let mut filter_params = vec![Value::Integer(pacticipant_id)];
  if let Some(branch_id) = branch_id {
    conds.push(
      "EXISTS (SELECT 1 FROM branch_versions bv
         WHERE bv.version_id = v.id AND bv.branch_id = ?)"
        .to_owned(),
    );
    filter_params.push(Value::Integer(branch_id));
  }
  if let Some(tag_name) = tag {
    conds.push(
      "EXISTS (SELECT 1 FROM tags t
         WHERE t.version_id = v.id AND t.name = ?)"
        .to_owned(),
    );
    filter_params.push(Value::Text(tag_name.to_owned()));
  }
  let where_clause = conds.join(" AND ");

  let count_sql = format!("SELECT COUNT(*) FROM versions v WHERE {where_clause}");
  note(observer, &count_sql);
  let total: u64 = tx.query_row(
    &count_sql,
    params_from_iter(filter_params.iter()),
    |r| r.get::<_, i64>(0).map(|n| n as u64),
  )?;

  // Creation order; id is the creation sequence, so it is also the
  // deterministic tie-break.
  let mut page_sql = format!(
    "SELECT v.id, v.number, v.created_at FROM versions v
     WHERE {where_clause} ORDER BY v.id ASC"
  );
  let mut page_params = filter_params;
  if let Some(p) = page {
    page_sql.push_str(" LIMIT ? OFFSET ?");
    page_params.push(Value::Integer(i64::from(p.size())));
    page_params.push(Value::Integer(p.offset() as i64));
  }
  note(observer, &page_sql);
  let mut stmt = tx.prepare(&page_sql)?;
  let base_rows: Vec<(i64, String, String)> = stmt
    .query_map(params_from_iter(page_params.iter()), |row| {
      Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  if base_rows.is_empty() {
    return Ok(Listing::Page { rows: Vec::new(), total });
  }

  let ids: Vec<i64> = base_rows.iter().map(|(id, _, _)| *id).collect();
  let enrichment = fetch_enrichment(tx, observer, pacticipant_id, &ids)?;

  let rows = base_rows
    .into_iter()
    .map(|(id, number, created_at)| RawDetails {
      id,
      number,
      created_at,
      branches:  enrichment.branches.get(&id).cloned().unwrap_or_default(),
      head_tags: enrichment.head_tags.get(&id).cloned().unwrap_or_default(),
      pacts:     enrichment.pacts.get(&id).cloned().unwrap_or_default(),
      deployed:  enrichment.deployed.get(&id).cloned().unwrap_or_default(),
      released:  enrichment.released.get(&id).cloned().unwrap_or_default(),
    })
    .collect();

  Ok(Listing::Page { rows, total })
}

// ─── Batched enrichment ──────────────────────────────────────────────────────

#[derive(Default)]
struct Enrichment {
  branches:  HashMap<i64, Vec<String>>,
  head_tags: HashMap<i64, Vec<String>>,
  pacts:     HashMap<i64, Vec<PactRef>>,
  deployed:  HashMap<i64, Vec<EnvironmentRef>>,
  released:  HashMap<i64, Vec<EnvironmentRef>>,
}

/// One query per metadata aspect, each keyed by the page's id set.
fn fetch_enrichment(
  tx: &Transaction<'_>,
  observer: &ObserverHandle,
  pacticipant_id: i64,
  ids: &[i64],
) -> rusqlite::Result<Enrichment> {
  let ph = placeholders(ids.len());
  let id_values: Vec<Value> = ids.iter().map(|id| Value::Integer(*id)).collect();
  let mut enrichment = Enrichment::default();

  // Branch memberships.
  let sql = format!(
    "SELECT bv.version_id, b.name
     FROM branch_versions bv JOIN branches b ON b.id = bv.branch_id
     WHERE bv.version_id IN ({ph})
     ORDER BY bv.version_id, b.name"
  );
  note(observer, &sql);
  let mut stmt = tx.prepare(&sql)?;
  let rows = stmt.query_map(params_from_iter(id_values.iter()), |row| {
    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
  })?;
  for row in rows {
    let (version_id, name) = row?;
    enrichment.branches.entry(version_id).or_default().push(name);
  }

  // Head tags: one aggregate over the tag names touched by the page. A
  // page version carries a tag name only when it is that tag's current
  // head, i.e. the greatest version id holding the tag.
  let sql = format!(
    "SELECT t.name, MAX(t.version_id)
     FROM tags t
     WHERE t.pacticipant_id = ?
       AND t.name IN (SELECT DISTINCT name FROM tags WHERE version_id IN ({ph}))
     GROUP BY t.name"
  );
  note(observer, &sql);
  let mut head_params = vec![Value::Integer(pacticipant_id)];
  head_params.extend(id_values.iter().cloned());
  let mut stmt = tx.prepare(&sql)?;
  let rows = stmt.query_map(params_from_iter(head_params.iter()), |row| {
    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
  })?;
  for row in rows {
    let (name, head_version_id) = row?;
    enrichment
      .head_tags
      .entry(head_version_id)
      .or_default()
      .push(name);
  }
  for tags in enrichment.head_tags.values_mut() {
    tags.sort();
  }

  // Pact publication links, folded to the highest revision per
  // (version, provider).
  let sql = format!(
    "SELECT pp.consumer_version_id, p.name, pv.sha, pp.revision_number
     FROM pact_publications pp
     JOIN pacticipants p ON p.id = pp.provider_id
     JOIN pact_versions pv ON pv.id = pp.pact_version_id
     WHERE pp.consumer_version_id IN ({ph})"
  );
  note(observer, &sql);
  let mut stmt = tx.prepare(&sql)?;
  let rows = stmt.query_map(params_from_iter(id_values.iter()), |row| {
    Ok((
      row.get::<_, i64>(0)?,
      row.get::<_, String>(1)?,
      row.get::<_, String>(2)?,
      row.get::<_, i64>(3)?,
    ))
  })?;
  let mut current: HashMap<i64, BTreeMap<String, PactRef>> = HashMap::new();
  for row in rows {
    let (version_id, provider, sha, revision) = row?;
    let per_provider = current.entry(version_id).or_default();
    match per_provider.get(&provider) {
      Some(existing) if existing.revision >= revision => {}
      _ => {
        per_provider
          .insert(provider.clone(), PactRef { provider, sha, revision });
      }
    }
  }
  for (version_id, per_provider) in current {
    enrichment
      .pacts
      .insert(version_id, per_provider.into_values().collect());
  }

  // Currently-deployed environment links. More than one active record in
  // one (environment, target) scope contradicts the activation
  // invariant: all findings are still returned, the condition is logged.
  let sql = format!(
    "SELECT dv.version_id, e.name, dv.target
     FROM deployed_versions dv
     JOIN environments e ON e.id = dv.environment_id
     WHERE dv.version_id IN ({ph}) AND dv.currently_deployed = 1
     ORDER BY dv.version_id, e.name, dv.target"
  );
  note(observer, &sql);
  let mut stmt = tx.prepare(&sql)?;
  let rows = stmt.query_map(params_from_iter(id_values.iter()), |row| {
    Ok((
      row.get::<_, i64>(0)?,
      row.get::<_, String>(1)?,
      row.get::<_, Option<String>>(2)?,
    ))
  })?;
  let mut seen_scopes: HashSet<(String, Option<String>)> = HashSet::new();
  for row in rows {
    let (version_id, environment, target) = row?;
    if !seen_scopes.insert((environment.clone(), target.clone())) {
      tracing::warn!(
        pacticipant_id,
        environment,
        ?target,
        "multiple active deployed versions found for one scope"
      );
    }
    enrichment.deployed.entry(version_id).or_default().push(
      EnvironmentRef { environment, target, currently_active: true },
    );
  }

  // Currently-released environment links.
  let sql = format!(
    "SELECT rv.version_id, e.name
     FROM released_versions rv
     JOIN environments e ON e.id = rv.environment_id
     WHERE rv.version_id IN ({ph}) AND rv.currently_released = 1
     ORDER BY rv.version_id, e.name"
  );
  note(observer, &sql);
  let mut stmt = tx.prepare(&sql)?;
  let rows = stmt.query_map(params_from_iter(id_values.iter()), |row| {
    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
  })?;
  for row in rows {
    let (version_id, environment) = row?;
    enrichment.released.entry(version_id).or_default().push(
      EnvironmentRef { environment, target: None, currently_active: true },
    );
  }

  Ok(enrichment)
}

fn placeholders(n: usize) -> String {
  vec!["?"; n].join(", ")
}
