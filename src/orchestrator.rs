use std::collections::HashSet;

use anyhow::{Context, Result};
use log::{info, warn};
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::ids::{MatchExternalId, MatchRowId};
use crate::model::{Competitor, MergedMatchMetadata, ResolvedPlayer, UnresolvedDiagnostic};
use crate::overrides::{OverrideTable, SheetOverrideTable};
use crate::reconciler::SourceReconciler;
use crate::resolver::{IdentityResolver, diagnostic_for};
use crate::run_cache::{RunCache, Sources};
use crate::store::{self, MatchStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Reconcile every stored match, not only those with open problems.
    pub force: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub matches_total: usize,
    pub matches_considered: usize,
    pub matches_committed: usize,
    pub matches_failed: usize,
    pub roster_size: usize,
    pub roster_from_store: bool,
    pub stale_overrides: usize,
    /// Matches revisited because the roster or an override changed since
    /// they were last committed.
    pub inputs_changed: usize,
    pub unresolved: Vec<UnresolvedDiagnostic>,
    pub source_failures: Vec<String>,
    pub errors: Vec<String>,
}

/// One full pass: fetch the external sources once, then resolve, reconcile and
/// commit each match that needs it, one transaction per match.
pub fn run_reconciliation(
    conn: &mut Connection,
    sources: &Sources<'_>,
    overrides: &OverrideTable,
    sheet_overrides: &SheetOverrideTable,
    opts: RunOptions,
) -> Result<RunSummary> {
    let cache = RunCache::prefetch(sources);
    run_with_cache(conn, &cache, overrides, sheet_overrides, opts)
}

pub fn run_with_cache(
    conn: &mut Connection,
    cache: &RunCache,
    overrides: &OverrideTable,
    sheet_overrides: &SheetOverrideTable,
    opts: RunOptions,
) -> Result<RunSummary> {
    let run_id = store::start_run(conn)?;
    let mut summary = RunSummary {
        source_failures: cache.failures(),
        ..Default::default()
    };

    let roster = load_roster(conn, cache, &mut summary)?;
    summary.roster_size = roster.len();

    let known = known_external_ids(conn, cache)?;
    let mut overrides = overrides.clone();
    let mut sheet_overrides = sheet_overrides.clone();
    summary.stale_overrides = overrides.retain_known(&known) + sheet_overrides.retain_known(&known);

    let resolver = IdentityResolver::new(&roster, &overrides);
    let reconciler = SourceReconciler::new(cache, &sheet_overrides, &roster);

    let digest = inputs_digest(&roster, &overrides, &sheet_overrides);
    let statuses = store::match_statuses(conn, &digest)?;
    summary.matches_total = statuses.len();
    summary.inputs_changed = statuses.iter().filter(|s| s.inputs_changed).count();
    if summary.inputs_changed > 0 {
        info!(
            "roster or overrides changed, revisiting {} reconciled matches",
            summary.inputs_changed
        );
    }
    let pending = statuses
        .iter()
        .filter(|s| needs_work(s, opts, &overrides, &sheet_overrides))
        .map(|s| s.row_id)
        .collect::<Vec<_>>();
    summary.matches_considered = pending.len();

    for row_id in pending {
        match reconcile_match(conn, row_id, &resolver, &reconciler, &digest) {
            Ok((source_key, players)) => {
                summary.matches_committed += 1;
                summary.unresolved.extend(
                    players
                        .iter()
                        .filter_map(|p| diagnostic_for(p, Some(&source_key))),
                );
            }
            Err(err) => {
                warn!("match {row_id} left for the next run: {err:#}");
                summary.matches_failed += 1;
                summary.errors.push(format!("{row_id}: {err:#}"));
            }
        }
    }

    store::finish_run(conn, run_id, &summary)?;
    info!(
        "reconcile run {run_id}: {}/{} matches committed, {} failed, {} unresolved players",
        summary.matches_committed,
        summary.matches_considered,
        summary.matches_failed,
        summary.unresolved.len()
    );
    Ok(summary)
}

fn reconcile_match(
    conn: &mut Connection,
    row_id: MatchRowId,
    resolver: &IdentityResolver<'_>,
    reconciler: &SourceReconciler<'_>,
    digest: &str,
) -> Result<(String, Vec<ResolvedPlayer>)> {
    let stored = store::load_match(conn, row_id)?;
    let mut players = Vec::with_capacity(stored.players.len());
    for record in &stored.players {
        let lookup: &Connection = conn;
        players.push(
            resolver
                .resolve(lookup, row_id, record)
                .with_context(|| format!("resolve player {}", record.source_index))?,
        );
    }
    let meta: MergedMatchMetadata = reconciler.reconcile(stored.match_external_id, &players);
    store::commit_match(conn, row_id, &players, &meta, digest)?;
    Ok((stored.source_key, players))
}

fn load_roster(
    conn: &mut Connection,
    cache: &RunCache,
    summary: &mut RunSummary,
) -> Result<Vec<Competitor>> {
    if let Some(fetched) = cache.participants()
        && !fetched.is_empty()
    {
        if let Err(err) = store::upsert_competitors(conn, fetched) {
            warn!("could not persist roster, using it for this run only: {err:#}");
            summary.errors.push(format!("roster: {err:#}"));
        }
        return Ok(fetched.to_vec());
    }
    summary.roster_from_store = true;
    let stored = store::load_competitors(conn)?;
    if stored.is_empty() {
        warn!("no competitor roster available, every player will be unresolved unless overridden");
    }
    Ok(stored)
}

fn needs_work(
    status: &MatchStatus,
    opts: RunOptions,
    overrides: &OverrideTable,
    sheet_overrides: &SheetOverrideTable,
) -> bool {
    if opts.force
        || !status.reconciled
        || status.inputs_changed
        || status.has_missing_metadata
        || status.has_unresolved_players
    {
        return true;
    }
    status.match_external_id.is_some_and(|id| {
        overrides.has_entries_for(id) || !sheet_overrides.games_for(id).is_empty()
    })
}

/// Digest of everything besides the match rows that decides a resolution:
/// the roster and the override entries in effect. Reasons and dates are
/// annotations and stay out of it.
pub fn inputs_digest(
    roster: &[Competitor],
    overrides: &OverrideTable,
    sheet_overrides: &SheetOverrideTable,
) -> String {
    let mut competitors = roster
        .iter()
        .map(|c| (c.competitor_id.get(), c.canonical_name.as_str()))
        .collect::<Vec<_>>();
    competitors.sort_unstable();

    let mut hasher = Sha256::new();
    for (id, name) in competitors {
        hasher.update(format!("competitor\t{id}\t{name}\n"));
    }
    for (match_id, name, entry) in overrides.entries() {
        hasher.update(format!(
            "override\t{match_id}\t{name}\t{}\n",
            entry.competitor_id
        ));
    }
    for (key, entry) in sheet_overrides.entries() {
        hasher.update(format!("sheet\t{key}\t{}\n", entry.match_external_id));
    }
    format!("{:x}", hasher.finalize())
}

/// Match ids either the store or the bracket service knows about. Overrides
/// naming anything else are stale.
pub fn known_external_ids(conn: &Connection, cache: &RunCache) -> Result<HashSet<MatchExternalId>> {
    let mut known = store::known_external_ids(conn)?;
    known.extend(cache.bracket_match_ids());
    Ok(known)
}
