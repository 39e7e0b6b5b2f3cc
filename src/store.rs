use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;

use crate::ids::{CompetitorId, MatchExternalId, MatchRowId, PlayerIndex};
use crate::ingest::{DecodedMatch, ImportOutcome};
use crate::model::{
    Competitor, MatchPlayerRecord, MergedMatchMetadata, ResolvedPlayer, UnresolvedDiagnostic,
};
use crate::orchestrator::RunSummary;
use crate::resolver::ExternalIdLookup;

const CACHE_DIR: &str = "bracket_ledger";
const DB_FILE: &str = "ledger.sqlite";

/// A match row together with the players decoded from its save file.
#[derive(Debug, Clone)]
pub struct StoredMatch {
    pub row_id: MatchRowId,
    pub source_key: String,
    pub source_name: String,
    pub match_external_id: Option<MatchExternalId>,
    pub players: Vec<MatchPlayerRecord>,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchStatus {
    pub row_id: MatchRowId,
    pub match_external_id: Option<MatchExternalId>,
    pub reconciled: bool,
    pub has_missing_metadata: bool,
    pub has_unresolved_players: bool,
    /// Last reconciled against a different roster or override set.
    pub inputs_changed: bool,
}

/// Reconciled state without any local row ids, in a stable order. Two
/// snapshots compare equal exactly when the reconciled output is the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub matches: Vec<SnapshotMatch>,
    pub players: Vec<SnapshotPlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotMatch {
    pub source_key: String,
    pub match_external_id: Option<i64>,
    pub round: Option<i32>,
    pub round_provenance: String,
    pub first_pick_player_index: Option<i64>,
    pub first_pick_competitor_id: Option<i64>,
    pub pick_provenance: String,
    pub sheet_game: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotPlayer {
    pub source_key: String,
    pub match_external_id: Option<i64>,
    pub player_index: i64,
    pub display_name: String,
    pub competitor_id: Option<i64>,
    pub resolution_confidence: String,
    pub resolution_detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    pub matches: usize,
    pub reconciled_matches: usize,
    pub players: usize,
    pub players_override: usize,
    pub players_normalized: usize,
    pub players_unresolved: usize,
    pub round_api: usize,
    pub round_missing: usize,
    pub pick_spreadsheet: usize,
    pub pick_override: usize,
    pub pick_missing: usize,
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(DB_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(DB_FILE))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS matches (
            match_row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_key TEXT NOT NULL UNIQUE,
            source_name TEXT NOT NULL,
            match_external_id INTEGER NULL,
            imported_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_external ON matches(match_external_id);

        CREATE TABLE IF NOT EXISTS match_players (
            match_row_id INTEGER NOT NULL REFERENCES matches(match_row_id) ON DELETE CASCADE,
            source_index INTEGER NOT NULL CHECK (source_index >= 0),
            display_name TEXT NOT NULL,
            choice TEXT NULL,
            PRIMARY KEY (match_row_id, source_index)
        );

        CREATE TABLE IF NOT EXISTS match_events (
            match_row_id INTEGER NOT NULL REFERENCES matches(match_row_id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            source_index INTEGER NULL,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            PRIMARY KEY (match_row_id, seq)
        );

        CREATE TABLE IF NOT EXISTS resolved_players (
            match_row_id INTEGER NOT NULL REFERENCES matches(match_row_id) ON DELETE CASCADE,
            player_index INTEGER NOT NULL CHECK (player_index >= 1),
            display_name TEXT NOT NULL,
            competitor_id INTEGER NULL,
            resolution_confidence TEXT NOT NULL,
            resolution_detail TEXT NOT NULL,
            PRIMARY KEY (match_row_id, player_index)
        );
        CREATE INDEX IF NOT EXISTS idx_resolved_confidence
            ON resolved_players(resolution_confidence);

        CREATE TABLE IF NOT EXISTS match_metadata (
            match_row_id INTEGER PRIMARY KEY REFERENCES matches(match_row_id) ON DELETE CASCADE,
            match_external_id INTEGER NULL,
            round INTEGER NULL,
            round_provenance TEXT NOT NULL,
            first_pick_player_index INTEGER NULL,
            first_pick_competitor_id INTEGER NULL,
            pick_provenance TEXT NOT NULL,
            sheet_game TEXT NULL,
            inputs_digest TEXT NULL
        );

        CREATE TABLE IF NOT EXISTS competitors (
            competitor_id INTEGER PRIMARY KEY,
            canonical_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reconcile_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            matches_considered INTEGER NOT NULL DEFAULT 0,
            matches_committed INTEGER NOT NULL DEFAULT 0,
            matches_failed INTEGER NOT NULL DEFAULT 0,
            unresolved_players INTEGER NOT NULL DEFAULT 0,
            errors_json TEXT NOT NULL DEFAULT '[]'
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Empties every table filled from save files or by reconciliation, ahead of
/// a rebuild. New imports get fresh row ids; the roster and run history stay.
pub fn reset(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction().context("begin reset transaction")?;
    tx.execute_batch(
        r#"
        DELETE FROM resolved_players;
        DELETE FROM match_metadata;
        DELETE FROM match_events;
        DELETE FROM match_players;
        DELETE FROM matches;
        "#,
    )
    .context("clear match tables")?;
    tx.commit().context("commit reset")?;
    Ok(())
}

/// Stores one decoded save file. Re-importing the same file is a no-op.
pub fn insert_match(
    conn: &mut Connection,
    source_key: &str,
    source_name: &str,
    decoded: &DecodedMatch,
) -> Result<ImportOutcome> {
    if let Some(existing) = find_match_by_source(conn, source_key)? {
        return Ok(ImportOutcome::AlreadyPresent(existing));
    }

    let tx = conn.transaction().context("begin import transaction")?;
    tx.execute(
        "INSERT INTO matches(source_key, source_name, match_external_id, imported_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            source_key,
            source_name,
            decoded.match_external_id.map(external_to_sql).transpose()?,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("insert match")?;
    let row_id = MatchRowId::from_rowid(tx.last_insert_rowid());

    for player in &decoded.players {
        tx.execute(
            "INSERT INTO match_players(match_row_id, source_index, display_name, choice)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row_id.rowid(),
                i64::from(player.source_index),
                player.display_name,
                player.choice,
            ],
        )
        .with_context(|| format!("insert player {}", player.source_index))?;
    }
    for (seq, event) in decoded.events.iter().enumerate() {
        let payload = serde_json::to_string(&event.payload).context("serialize event payload")?;
        tx.execute(
            "INSERT INTO match_events(match_row_id, seq, source_index, kind, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row_id.rowid(),
                seq as i64,
                event.source_index.map(i64::from),
                event.kind,
                payload,
            ],
        )
        .context("insert match event")?;
    }
    tx.commit().context("commit import transaction")?;
    Ok(ImportOutcome::Inserted(row_id))
}

pub fn find_match_by_source(conn: &Connection, source_key: &str) -> Result<Option<MatchRowId>> {
    conn.query_row(
        "SELECT match_row_id FROM matches WHERE source_key = ?1",
        params![source_key],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .context("look up match by source key")
    .map(|id| id.map(MatchRowId::from_rowid))
}

pub fn load_match(conn: &Connection, row_id: MatchRowId) -> Result<StoredMatch> {
    let (source_key, source_name, external) = conn
        .query_row(
            "SELECT source_key, source_name, match_external_id FROM matches WHERE match_row_id = ?1",
            params![row_id.rowid()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            },
        )
        .optional()
        .context("load match row")?
        .ok_or_else(|| anyhow!("match {row_id} not found"))?;
    let match_external_id = external.map(external_from_sql).transpose()?;

    let mut stmt = conn
        .prepare(
            "SELECT source_index, display_name, choice FROM match_players
             WHERE match_row_id = ?1 ORDER BY source_index ASC",
        )
        .context("prepare load players query")?;
    let rows = stmt
        .query_map(params![row_id.rowid()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .context("query match players")?;

    let mut players = Vec::new();
    for row in rows {
        let (source_index, display_name, choice) = row.context("decode player row")?;
        let source_index = u32::try_from(source_index)
            .with_context(|| format!("stored source index {source_index} out of range"))?;
        players.push(MatchPlayerRecord {
            source_index,
            display_name,
            choice,
            match_external_id,
        });
    }

    Ok(StoredMatch {
        row_id,
        source_key,
        source_name,
        match_external_id,
        players,
    })
}

/// Per-match work flags. `inputs_digest` is the digest of the current run's
/// roster and override tables; matches committed under another one are flagged.
pub fn match_statuses(conn: &Connection, inputs_digest: &str) -> Result<Vec<MatchStatus>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                m.match_row_id,
                m.match_external_id,
                md.match_row_id IS NOT NULL,
                COALESCE(md.round_provenance = 'missing' OR md.pick_provenance = 'missing', 0),
                EXISTS (
                    SELECT 1 FROM resolved_players rp
                    WHERE rp.match_row_id = m.match_row_id
                      AND rp.resolution_confidence = 'unresolved'
                ),
                md.match_row_id IS NOT NULL AND md.inputs_digest IS NOT ?1
            FROM matches m
            LEFT JOIN match_metadata md ON md.match_row_id = m.match_row_id
            ORDER BY m.source_key ASC
            "#,
        )
        .context("prepare match status query")?;
    let rows = stmt
        .query_map(params![inputs_digest], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, i64>(2)? != 0,
                row.get::<_, i64>(3)? != 0,
                row.get::<_, i64>(4)? != 0,
                row.get::<_, i64>(5)? != 0,
            ))
        })
        .context("query match statuses")?;

    let mut out = Vec::new();
    for row in rows {
        let (row_id, external, reconciled, missing, unresolved, inputs_changed) =
            row.context("decode match status row")?;
        out.push(MatchStatus {
            row_id: MatchRowId::from_rowid(row_id),
            match_external_id: external.map(external_from_sql).transpose()?,
            reconciled,
            has_missing_metadata: missing,
            has_unresolved_players: unresolved,
            inputs_changed,
        });
    }
    Ok(out)
}

pub fn known_external_ids(conn: &Connection) -> Result<HashSet<MatchExternalId>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT match_external_id FROM matches WHERE match_external_id IS NOT NULL")
        .context("prepare external id query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .context("query external ids")?;
    let mut out = HashSet::new();
    for row in rows {
        out.insert(external_from_sql(row.context("decode external id")?)?);
    }
    Ok(out)
}

/// Replaces one match's reconciled rows. Either every row lands or none do.
pub fn commit_match(
    conn: &mut Connection,
    row_id: MatchRowId,
    players: &[ResolvedPlayer],
    meta: &MergedMatchMetadata,
    inputs_digest: &str,
) -> Result<()> {
    let tx = conn.transaction().context("begin match transaction")?;
    tx.execute(
        "DELETE FROM resolved_players WHERE match_row_id = ?1",
        params![row_id.rowid()],
    )
    .context("clear resolved players")?;
    for player in players {
        upsert_player(&tx, row_id, player)?;
    }
    upsert_metadata(&tx, row_id, meta, inputs_digest)?;
    tx.commit().context("commit match transaction")?;
    Ok(())
}

fn upsert_player(tx: &Transaction<'_>, row_id: MatchRowId, p: &ResolvedPlayer) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO resolved_players (
            match_row_id, player_index, display_name, competitor_id,
            resolution_confidence, resolution_detail
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(match_row_id, player_index) DO UPDATE SET
            display_name = excluded.display_name,
            competitor_id = excluded.competitor_id,
            resolution_confidence = excluded.resolution_confidence,
            resolution_detail = excluded.resolution_detail
        "#,
        params![
            row_id.rowid(),
            i64::from(p.player_index.get()),
            p.display_name,
            p.competitor_id.map(competitor_to_sql).transpose()?,
            p.confidence.as_str(),
            p.detail.describe(),
        ],
    )
    .with_context(|| format!("upsert resolved player {}", p.player_index))?;
    Ok(())
}

fn upsert_metadata(
    tx: &Transaction<'_>,
    row_id: MatchRowId,
    m: &MergedMatchMetadata,
    inputs_digest: &str,
) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO match_metadata (
            match_row_id, match_external_id, round, round_provenance,
            first_pick_player_index, first_pick_competitor_id, pick_provenance, sheet_game,
            inputs_digest
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(match_row_id) DO UPDATE SET
            match_external_id = excluded.match_external_id,
            round = excluded.round,
            round_provenance = excluded.round_provenance,
            first_pick_player_index = excluded.first_pick_player_index,
            first_pick_competitor_id = excluded.first_pick_competitor_id,
            pick_provenance = excluded.pick_provenance,
            sheet_game = excluded.sheet_game,
            inputs_digest = excluded.inputs_digest
        "#,
        params![
            row_id.rowid(),
            m.match_external_id.map(external_to_sql).transpose()?,
            m.round,
            m.round_provenance.as_str(),
            m.first_pick.map(|p| i64::from(p.get())),
            m.first_pick_competitor.map(competitor_to_sql).transpose()?,
            m.pick_provenance.as_str(),
            m.sheet_game.map(|k| k.to_string()),
            inputs_digest,
        ],
    )
    .context("upsert match metadata")?;
    Ok(())
}

pub fn upsert_competitors(conn: &mut Connection, competitors: &[Competitor]) -> Result<usize> {
    let tx = conn.transaction().context("begin roster transaction")?;
    for c in competitors {
        tx.execute(
            "INSERT INTO competitors(competitor_id, canonical_name) VALUES (?1, ?2)
             ON CONFLICT(competitor_id) DO UPDATE SET canonical_name = excluded.canonical_name",
            params![competitor_to_sql(c.competitor_id)?, c.canonical_name],
        )
        .with_context(|| format!("upsert competitor {}", c.competitor_id))?;
    }
    tx.commit().context("commit roster transaction")?;
    Ok(competitors.len())
}

pub fn load_competitors(conn: &Connection) -> Result<Vec<Competitor>> {
    let mut stmt = conn
        .prepare("SELECT competitor_id, canonical_name FROM competitors ORDER BY competitor_id")
        .context("prepare roster query")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
        .context("query roster")?;
    let mut out = Vec::new();
    for row in rows {
        let (id, canonical_name) = row.context("decode competitor row")?;
        let id = u64::try_from(id).with_context(|| format!("competitor id {id} out of range"))?;
        out.push(Competitor {
            competitor_id: CompetitorId::new(id),
            canonical_name,
        });
    }
    Ok(out)
}

pub fn start_run(conn: &Connection) -> Result<i64> {
    conn.execute(
        "INSERT INTO reconcile_runs(started_at) VALUES (?1)",
        params![Utc::now().to_rfc3339()],
    )
    .context("insert reconcile run")?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_run(conn: &Connection, run_id: i64, summary: &RunSummary) -> Result<()> {
    let errors_json = serde_json::to_string(&summary.errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE reconcile_runs
         SET finished_at = ?1, matches_considered = ?2, matches_committed = ?3,
             matches_failed = ?4, unresolved_players = ?5, errors_json = ?6
         WHERE run_id = ?7",
        params![
            Utc::now().to_rfc3339(),
            summary.matches_considered as i64,
            summary.matches_committed as i64,
            summary.matches_failed as i64,
            summary.unresolved.len() as i64,
            errors_json,
            run_id,
        ],
    )
    .context("update reconcile run")?;
    Ok(())
}

pub fn snapshot(conn: &Connection) -> Result<Snapshot> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT m.source_key, md.match_external_id, md.round, md.round_provenance,
                   md.first_pick_player_index, md.first_pick_competitor_id,
                   md.pick_provenance, md.sheet_game
            FROM match_metadata md
            JOIN matches m ON m.match_row_id = md.match_row_id
            ORDER BY m.source_key ASC
            "#,
        )
        .context("prepare metadata snapshot")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SnapshotMatch {
                source_key: row.get(0)?,
                match_external_id: row.get(1)?,
                round: row.get(2)?,
                round_provenance: row.get(3)?,
                first_pick_player_index: row.get(4)?,
                first_pick_competitor_id: row.get(5)?,
                pick_provenance: row.get(6)?,
                sheet_game: row.get(7)?,
            })
        })
        .context("query metadata snapshot")?;
    let mut matches = Vec::new();
    for row in rows {
        matches.push(row.context("decode metadata snapshot row")?);
    }

    let mut stmt = conn
        .prepare(
            r#"
            SELECT m.source_key, m.match_external_id, rp.player_index, rp.display_name,
                   rp.competitor_id, rp.resolution_confidence, rp.resolution_detail
            FROM resolved_players rp
            JOIN matches m ON m.match_row_id = rp.match_row_id
            ORDER BY m.source_key ASC, rp.player_index ASC
            "#,
        )
        .context("prepare player snapshot")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SnapshotPlayer {
                source_key: row.get(0)?,
                match_external_id: row.get(1)?,
                player_index: row.get(2)?,
                display_name: row.get(3)?,
                competitor_id: row.get(4)?,
                resolution_confidence: row.get(5)?,
                resolution_detail: row.get(6)?,
            })
        })
        .context("query player snapshot")?;
    let mut players = Vec::new();
    for row in rows {
        players.push(row.context("decode player snapshot row")?);
    }

    Ok(Snapshot { matches, players })
}

pub fn coverage(conn: &Connection) -> Result<Coverage> {
    let count = |sql: &str| -> Result<usize> {
        let n = conn
            .query_row(sql, [], |row| row.get::<_, i64>(0))
            .with_context(|| format!("coverage query: {sql}"))?;
        Ok(usize::try_from(n).unwrap_or_default())
    };
    Ok(Coverage {
        matches: count("SELECT COUNT(*) FROM matches")?,
        reconciled_matches: count("SELECT COUNT(*) FROM match_metadata")?,
        players: count("SELECT COUNT(*) FROM resolved_players")?,
        players_override: count(
            "SELECT COUNT(*) FROM resolved_players WHERE resolution_confidence = 'override'",
        )?,
        players_normalized: count(
            "SELECT COUNT(*) FROM resolved_players WHERE resolution_confidence = 'normalized_match'",
        )?,
        players_unresolved: count(
            "SELECT COUNT(*) FROM resolved_players WHERE resolution_confidence = 'unresolved'",
        )?,
        round_api: count("SELECT COUNT(*) FROM match_metadata WHERE round_provenance = 'api'")?,
        round_missing: count(
            "SELECT COUNT(*) FROM match_metadata WHERE round_provenance = 'missing'",
        )?,
        pick_spreadsheet: count(
            "SELECT COUNT(*) FROM match_metadata WHERE pick_provenance = 'spreadsheet'",
        )?,
        pick_override: count(
            "SELECT COUNT(*) FROM match_metadata WHERE pick_provenance = 'override'",
        )?,
        pick_missing: count("SELECT COUNT(*) FROM match_metadata WHERE pick_provenance = 'missing'")?,
    })
}

/// Every player currently stored as unresolved, for override authoring.
pub fn load_unresolved(conn: &Connection) -> Result<Vec<UnresolvedDiagnostic>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT m.match_external_id, m.source_key, rp.player_index, rp.display_name,
                   rp.resolution_detail
            FROM resolved_players rp
            JOIN matches m ON m.match_row_id = rp.match_row_id
            WHERE rp.resolution_confidence = 'unresolved'
            ORDER BY m.source_key ASC, rp.player_index ASC
            "#,
        )
        .context("prepare unresolved query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<i64>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .context("query unresolved players")?;
    let mut out = Vec::new();
    for row in rows {
        let (external, source_key, player_index, display_name, reason) =
            row.context("decode unresolved row")?;
        out.push(UnresolvedDiagnostic {
            match_external_id: external.map(external_from_sql).transpose()?,
            source_key: Some(source_key),
            player_index: PlayerIndex::from_stored(player_index)?,
            display_name,
            reason,
        });
    }
    Ok(out)
}

impl ExternalIdLookup for Connection {
    fn external_id_for(&self, match_row_id: MatchRowId) -> Result<Option<MatchExternalId>> {
        let found = self
            .query_row(
                "SELECT match_external_id FROM matches WHERE match_row_id = ?1",
                params![match_row_id.rowid()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
            .context("look up match external id")?;
        found.flatten().map(external_from_sql).transpose()
    }
}

fn external_to_sql(id: MatchExternalId) -> Result<i64> {
    i64::try_from(id.get()).with_context(|| format!("match external id {id} exceeds sqlite range"))
}

fn external_from_sql(raw: i64) -> Result<MatchExternalId> {
    u64::try_from(raw)
        .map(MatchExternalId::new)
        .with_context(|| format!("stored match external id {raw} is negative"))
}

fn competitor_to_sql(id: CompetitorId) -> Result<i64> {
    i64::try_from(id.get()).with_context(|| format!("competitor id {id} exceeds sqlite range"))
}
