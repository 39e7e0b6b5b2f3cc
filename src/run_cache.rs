use std::collections::HashMap;

use log::{info, warn};

use crate::bracket::{BracketMatch, BracketSource};
use crate::ids::MatchExternalId;
use crate::model::Competitor;
use crate::sheet::{DraftGame, SheetSource, parse_draft_grid};

/// Result of one external fetch. A failure is remembered as text so every
/// match in the run can degrade the same way.
#[derive(Debug, Clone)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Failed(String),
}

impl<T> FetchOutcome<T> {
    pub fn fetched(&self) -> Option<&T> {
        match self {
            FetchOutcome::Fetched(value) => Some(value),
            FetchOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fetched(_) => None,
            FetchOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// External collaborators and the addresses to read from them.
pub struct Sources<'a> {
    pub bracket: &'a dyn BracketSource,
    pub sheet: &'a dyn SheetSource,
    pub tournament_id: Option<String>,
    pub sheet_id: Option<String>,
    pub sheet_range: Option<String>,
}

/// Everything fetched from outside for one reconciliation run.
///
/// Built once at the start of a run and passed explicitly to whoever needs
/// it; changes made to the external sources mid-run are not observed.
#[derive(Debug, Clone)]
pub struct RunCache {
    bracket_matches: FetchOutcome<HashMap<MatchExternalId, BracketMatch>>,
    participants: FetchOutcome<Vec<Competitor>>,
    draft_games: FetchOutcome<Vec<DraftGame>>,
}

impl RunCache {
    /// Performs each external call exactly once.
    pub fn prefetch(sources: &Sources<'_>) -> Self {
        let (bracket_matches, participants) = match sources.tournament_id.as_deref() {
            Some(tournament) => (
                outcome(
                    "bracket match list",
                    sources.bracket.list_matches(tournament),
                ),
                outcome(
                    "bracket participants",
                    sources.bracket.list_participants(tournament),
                ),
            ),
            None => (
                FetchOutcome::Failed("no tournament configured".to_string()),
                FetchOutcome::Failed("no tournament configured".to_string()),
            ),
        };
        let grid = match (sources.sheet_id.as_deref(), sources.sheet_range.as_deref()) {
            (Some(sheet_id), Some(range)) => {
                outcome("draft sheet", sources.sheet.read_range(sheet_id, range))
            }
            _ => FetchOutcome::Failed("no draft sheet configured".to_string()),
        };
        let draft_games = match grid {
            FetchOutcome::Fetched(grid) => FetchOutcome::Fetched(parse_draft_grid(&grid)),
            FetchOutcome::Failed(reason) => FetchOutcome::Failed(reason),
        };
        Self::from_parts(bracket_matches, participants, draft_games)
    }

    pub fn from_parts(
        bracket_matches: FetchOutcome<Vec<BracketMatch>>,
        participants: FetchOutcome<Vec<Competitor>>,
        draft_games: FetchOutcome<Vec<DraftGame>>,
    ) -> Self {
        let bracket_matches = match bracket_matches {
            FetchOutcome::Fetched(rows) => FetchOutcome::Fetched(index_matches(rows)),
            FetchOutcome::Failed(reason) => FetchOutcome::Failed(reason),
        };
        let cache = Self {
            bracket_matches,
            participants,
            draft_games,
        };
        info!(
            "run cache: {} bracket matches, {} participants, {} draft games",
            cache.bracket_matches.fetched().map_or(0, |m| m.len()),
            cache.participants.fetched().map_or(0, |p| p.len()),
            cache.draft_games.fetched().map_or(0, |g| g.len()),
        );
        cache
    }

    pub fn bracket_match(&self, id: MatchExternalId) -> Option<&BracketMatch> {
        self.bracket_matches.fetched()?.get(&id)
    }

    pub fn bracket_match_ids(&self) -> impl Iterator<Item = MatchExternalId> + '_ {
        self.bracket_matches
            .fetched()
            .into_iter()
            .flat_map(|m| m.keys().copied())
    }

    pub fn participants(&self) -> Option<&[Competitor]> {
        self.participants.fetched().map(|p| p.as_slice())
    }

    pub fn draft_games(&self) -> Option<&[DraftGame]> {
        self.draft_games.fetched().map(|g| g.as_slice())
    }

    /// Human-readable notes for every source that could not be read.
    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(reason) = self.bracket_matches.failure() {
            out.push(format!("bracket matches: {reason}"));
        }
        if let Some(reason) = self.participants.failure() {
            out.push(format!("participants: {reason}"));
        }
        if let Some(reason) = self.draft_games.failure() {
            out.push(format!("draft sheet: {reason}"));
        }
        out
    }
}

fn outcome<T>(what: &str, result: anyhow::Result<T>) -> FetchOutcome<T> {
    match result {
        Ok(value) => FetchOutcome::Fetched(value),
        Err(err) => {
            warn!("{what} unavailable, continuing without it: {err:#}");
            FetchOutcome::Failed(format!("{err:#}"))
        }
    }
}

fn index_matches(rows: Vec<BracketMatch>) -> HashMap<MatchExternalId, BracketMatch> {
    let mut out = HashMap::with_capacity(rows.len());
    for row in rows {
        let id = row.match_external_id;
        if out.contains_key(&id) {
            warn!("bracket service listed match {id} twice, keeping the first");
            continue;
        }
        out.insert(id, row);
    }
    out
}
