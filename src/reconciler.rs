use std::collections::HashMap;

use log::{debug, warn};

use crate::ids::{CompetitorId, MatchExternalId, PlayerIndex};
use crate::model::{Competitor, MergedMatchMetadata, Provenance, ResolvedPlayer, SheetGameKey};
use crate::normalize::{NameMatch, compare_names, normalize};
use crate::overrides::SheetOverrideTable;
use crate::run_cache::RunCache;
use crate::sheet::DraftGame;

/// Which match player sits in the sheet's left (first-pick) column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Straight,
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validation {
    Confirmed,
    Unknown,
    Contradicted,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'g> {
    game: &'g DraftGame,
    orientation: Orientation,
    validation: Validation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PickOrder {
    key: SheetGameKey,
    first_pick: PlayerIndex,
    first_pick_competitor: Option<CompetitorId>,
    provenance: Provenance,
}

/// Merges bracket-service and spreadsheet metadata onto one match.
pub struct SourceReconciler<'a> {
    cache: &'a RunCache,
    sheet_overrides: &'a SheetOverrideTable,
    canonical_names: HashMap<CompetitorId, String>,
}

impl<'a> SourceReconciler<'a> {
    pub fn new(
        cache: &'a RunCache,
        sheet_overrides: &'a SheetOverrideTable,
        competitors: &[Competitor],
    ) -> Self {
        let canonical_names = competitors
            .iter()
            .map(|c| (c.competitor_id, c.canonical_name.clone()))
            .collect();
        Self {
            cache,
            sheet_overrides,
            canonical_names,
        }
    }

    /// Never fails: anything a source cannot supply comes back `missing`.
    pub fn reconcile(
        &self,
        match_external_id: Option<MatchExternalId>,
        players: &[ResolvedPlayer],
    ) -> MergedMatchMetadata {
        let mut meta = MergedMatchMetadata::empty(match_external_id);

        if let Some(found) = match_external_id.and_then(|id| self.cache.bracket_match(id)) {
            meta.round = Some(found.round);
            meta.round_provenance = Provenance::Api;
        }

        if let Some(pick) = self.pick_order(match_external_id, meta.round, players) {
            meta.first_pick = Some(pick.first_pick);
            meta.first_pick_competitor = pick.first_pick_competitor;
            meta.pick_provenance = pick.provenance;
            meta.sheet_game = Some(pick.key);
        }
        meta
    }

    fn pick_order(
        &self,
        match_external_id: Option<MatchExternalId>,
        round: Option<i32>,
        players: &[ResolvedPlayer],
    ) -> Option<PickOrder> {
        let games = self.cache.draft_games()?;
        let [a, b] = players else {
            debug!(
                "pick order needs two players, match {:?} has {}",
                match_external_id,
                players.len()
            );
            return None;
        };
        let names_a = self.names_for(a);
        let names_b = self.names_for(b);

        let by_names = games
            .iter()
            .filter(|g| round.is_none_or(|r| g.key.round == r))
            .filter_map(|g| {
                let orientation = orient_by_names(g, &names_a, &names_b)?;
                Some(Candidate {
                    game: g,
                    orientation,
                    validation: validate(g, orientation, a, b),
                })
            })
            .collect::<Vec<_>>();
        // A tie or a contradicted game still leaves room for an operator override.
        if !by_names.is_empty()
            && let Some(order) =
                self.select(&by_names, a, b, Provenance::Spreadsheet, match_external_id)
        {
            return Some(order);
        }

        let match_id = match_external_id?;
        let by_override = self
            .sheet_overrides
            .games_for(match_id)
            .into_iter()
            .filter_map(|key| {
                let Some(game) = games.iter().find(|g| g.key == key) else {
                    warn!("sheet override {key} for match {match_id} names a game not in the sheet");
                    return None;
                };
                let Some(orientation) = orient_by_names(game, &names_a, &names_b)
                    .or_else(|| orient_by_picks(game, a, b))
                else {
                    warn!(
                        "sheet override {key} for match {match_id}: cannot tell which player picked first"
                    );
                    return None;
                };
                Some(Candidate {
                    game,
                    orientation,
                    validation: validate(game, orientation, a, b),
                })
            })
            .collect::<Vec<_>>();
        if by_override.is_empty() {
            return None;
        }
        self.select(&by_override, a, b, Provenance::Override, match_external_id)
    }

    fn select(
        &self,
        candidates: &[Candidate<'_>],
        a: &ResolvedPlayer,
        b: &ResolvedPlayer,
        provenance: Provenance,
        match_external_id: Option<MatchExternalId>,
    ) -> Option<PickOrder> {
        let with = |v: Validation| {
            candidates
                .iter()
                .filter(|c| c.validation == v)
                .collect::<Vec<_>>()
        };
        let confirmed = with(Validation::Confirmed);
        let preferred = if confirmed.is_empty() {
            with(Validation::Unknown)
        } else {
            confirmed
        };

        let chosen = match preferred.as_slice() {
            [one] => **one,
            [] => {
                let [only] = candidates else {
                    debug!(
                        "match {:?}: {} draft games match by name, none agree with recorded picks",
                        match_external_id,
                        candidates.len()
                    );
                    return None;
                };
                warn!(
                    "match {:?}: draft game {} (sheet row {}) picks {:?}/{:?} disagree with recorded choices {:?}/{:?}",
                    match_external_id,
                    only.game.key,
                    only.game.row,
                    only.game.left_pick,
                    only.game.right_pick,
                    a.choice,
                    b.choice
                );
                if provenance != Provenance::Override {
                    return None;
                }
                *only
            }
            many => {
                debug!(
                    "match {:?}: {} draft games fit equally well, pick order left missing",
                    match_external_id,
                    many.len()
                );
                return None;
            }
        };

        let first = match chosen.orientation {
            Orientation::Straight => a,
            Orientation::Reversed => b,
        };
        Some(PickOrder {
            key: chosen.game.key,
            first_pick: first.player_index,
            first_pick_competitor: first.competitor_id,
            provenance,
        })
    }

    fn names_for(&self, player: &ResolvedPlayer) -> Vec<String> {
        let mut names = vec![player.display_name.clone()];
        if let Some(canonical) = player
            .competitor_id
            .and_then(|id| self.canonical_names.get(&id))
        {
            names.push(canonical.clone());
        }
        names
    }
}

fn best_match(sheet_name: &str, names: &[String]) -> NameMatch {
    names
        .iter()
        .map(|n| compare_names(sheet_name, n))
        .max()
        .unwrap_or(NameMatch::None)
}

fn orient_by_names(game: &DraftGame, names_a: &[String], names_b: &[String]) -> Option<Orientation> {
    let straight = best_match(&game.left_name, names_a).min(best_match(&game.right_name, names_b));
    let reversed = best_match(&game.left_name, names_b).min(best_match(&game.right_name, names_a));
    match (straight, reversed) {
        (NameMatch::None, NameMatch::None) => None,
        (s, r) if s > r => Some(Orientation::Straight),
        (s, r) if r > s => Some(Orientation::Reversed),
        _ => None,
    }
}

fn orient_by_picks(game: &DraftGame, a: &ResolvedPlayer, b: &ResolvedPlayer) -> Option<Orientation> {
    match (
        validate(game, Orientation::Straight, a, b),
        validate(game, Orientation::Reversed, a, b),
    ) {
        (Validation::Confirmed, Validation::Contradicted) => Some(Orientation::Straight),
        (Validation::Contradicted, Validation::Confirmed) => Some(Orientation::Reversed),
        _ => None,
    }
}

/// Checks the drafted values against what each player actually played.
fn validate(
    game: &DraftGame,
    orientation: Orientation,
    a: &ResolvedPlayer,
    b: &ResolvedPlayer,
) -> Validation {
    let (left, right) = match orientation {
        Orientation::Straight => (a, b),
        Orientation::Reversed => (b, a),
    };
    let checks = [
        pick_agrees(&game.left_pick, left.choice.as_deref()),
        pick_agrees(&game.right_pick, right.choice.as_deref()),
    ];
    if checks.contains(&Some(false)) {
        Validation::Contradicted
    } else if checks.contains(&Some(true)) {
        Validation::Confirmed
    } else {
        Validation::Unknown
    }
}

fn pick_agrees(drafted: &str, recorded: Option<&str>) -> Option<bool> {
    let recorded = normalize(recorded?);
    let drafted = normalize(drafted);
    if recorded.is_empty() || drafted.is_empty() {
        return None;
    }
    Some(recorded == drafted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::BracketMatch;
    use crate::model::{NameResolution, ResolutionConfidence};
    use crate::run_cache::FetchOutcome;

    fn player(idx: u32, name: &str, choice: Option<&str>, id: Option<u64>) -> ResolvedPlayer {
        let competitor_id = id.map(CompetitorId::new);
        let detail = match competitor_id {
            Some(id) => NameResolution::Exact(id),
            None => NameResolution::None,
        };
        ResolvedPlayer {
            player_index: PlayerIndex::from_source_index(idx).expect("index"),
            display_name: name.to_string(),
            choice: choice.map(|c| c.to_string()),
            match_external_id: Some(MatchExternalId::new(9001)),
            competitor_id,
            confidence: detail.confidence(),
            detail,
        }
    }

    fn game(round: i32, n: u32, l: &str, lp: &str, r: &str, rp: &str) -> DraftGame {
        DraftGame {
            key: SheetGameKey { round, game: n },
            left_name: l.to_string(),
            left_pick: lp.to_string(),
            right_name: r.to_string(),
            right_pick: rp.to_string(),
            row: 0,
        }
    }

    fn roster() -> Vec<Competitor> {
        vec![
            Competitor {
                competitor_id: CompetitorId::new(4001),
                canonical_name: "Ninja".to_string(),
            },
            Competitor {
                competitor_id: CompetitorId::new(4002),
                canonical_name: "Fiddler".to_string(),
            },
        ]
    }

    fn cache(games: Vec<DraftGame>) -> RunCache {
        RunCache::from_parts(
            FetchOutcome::Fetched(vec![BracketMatch {
                match_external_id: MatchExternalId::new(9001),
                round: 3,
                competitors: vec![CompetitorId::new(4001), CompetitorId::new(4002)],
            }]),
            FetchOutcome::Fetched(roster()),
            FetchOutcome::Fetched(games),
        )
    }

    #[test]
    fn reversed_columns_still_match() {
        let cache = cache(vec![game(3, 1, "Fiddler", "Mongols", "Ninja", "Franks")]);
        let overrides = SheetOverrideTable::empty();
        let rec = SourceReconciler::new(&cache, &overrides, &roster());
        let players = [
            player(0, "Ninja", Some("Franks"), Some(4001)),
            player(1, "Fidlr", Some("Mongols"), Some(4002)),
        ];
        let meta = rec.reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta.round, Some(3));
        assert_eq!(meta.round_provenance, Provenance::Api);
        assert_eq!(meta.pick_provenance, Provenance::Spreadsheet);
        assert_eq!(meta.first_pick.map(|p| p.get()), Some(2));
        assert_eq!(meta.first_pick_competitor, Some(CompetitorId::new(4002)));
    }

    #[test]
    fn recorded_choices_pick_the_right_game_of_a_series() {
        let cache = cache(vec![
            game(3, 1, "Ninja", "Franks", "Fiddler", "Mongols"),
            game(3, 2, "Fiddler", "Britons", "Ninja", "Aztecs"),
            game(2, 1, "Ninja", "Goths", "Fiddler", "Huns"),
        ]);
        let overrides = SheetOverrideTable::empty();
        let rec = SourceReconciler::new(&cache, &overrides, &roster());
        let players = [
            player(0, "Ninja", Some("Aztecs"), Some(4001)),
            player(1, "Fiddler", Some("Britons"), Some(4002)),
        ];
        let meta = rec.reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta.sheet_game, Some(SheetGameKey { round: 3, game: 2 }));
        assert_eq!(meta.first_pick.map(|p| p.get()), Some(2));
    }

    #[test]
    fn contradicting_picks_degrade_to_missing() {
        let cache = cache(vec![game(3, 1, "Ninja", "Franks", "Fiddler", "Mongols")]);
        let overrides = SheetOverrideTable::empty();
        let rec = SourceReconciler::new(&cache, &overrides, &roster());
        let players = [
            player(0, "Ninja", Some("Celts"), Some(4001)),
            player(1, "Fiddler", Some("Mongols"), Some(4002)),
        ];
        let meta = rec.reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta.pick_provenance, Provenance::Missing);
        assert_eq!(meta.first_pick, None);
        assert_eq!(meta.round_provenance, Provenance::Api);
    }

    #[test]
    fn sheet_override_places_unrecognisable_names() {
        let cache = cache(vec![game(3, 4, "N1nj4", "Franks", "F1ddl3r", "Mongols")]);
        let overrides =
            SheetOverrideTable::from_json_str(r#"{"3:4": {"match_external_id": 9001}}"#);
        let rec = SourceReconciler::new(&cache, &overrides, &roster());
        let players = [
            player(0, "Fiddler", Some("Mongols"), Some(4002)),
            player(1, "Ninja", Some("Franks"), Some(4001)),
        ];
        let meta = rec.reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta.pick_provenance, Provenance::Override);
        assert_eq!(meta.sheet_game, Some(SheetGameKey { round: 3, game: 4 }));
        // Picks show the left column is Ninja, the second match player.
        assert_eq!(meta.first_pick.map(|p| p.get()), Some(2));
        assert_eq!(meta.first_pick_competitor, Some(CompetitorId::new(4001)));
    }

    #[test]
    fn sheet_override_breaks_a_tie_between_rematches() {
        let cache = cache(vec![
            game(3, 1, "Ninja", "Franks", "Fiddler", "Mongols"),
            game(3, 2, "Fiddler", "Britons", "Ninja", "Aztecs"),
        ]);
        let players = [
            player(0, "Ninja", None, Some(4001)),
            player(1, "Fidlr", None, Some(4002)),
        ];

        let none = SheetOverrideTable::empty();
        let meta = SourceReconciler::new(&cache, &none, &roster())
            .reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta.pick_provenance, Provenance::Missing);
        assert_eq!(meta.sheet_game, None);

        let overrides =
            SheetOverrideTable::from_json_str(r#"{"3:2": {"match_external_id": 9001}}"#);
        let meta = SourceReconciler::new(&cache, &overrides, &roster())
            .reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta.pick_provenance, Provenance::Override);
        assert_eq!(meta.sheet_game, Some(SheetGameKey { round: 3, game: 2 }));
        assert_eq!(meta.first_pick.map(|p| p.get()), Some(2));
        assert_eq!(meta.first_pick_competitor, Some(CompetitorId::new(4002)));
    }

    #[test]
    fn sheet_override_keeps_a_contradicted_game() {
        let cache = cache(vec![game(3, 1, "Ninja", "Franks", "Fiddler", "Mongols")]);
        let overrides =
            SheetOverrideTable::from_json_str(r#"{"3:1": {"match_external_id": 9001}}"#);
        let rec = SourceReconciler::new(&cache, &overrides, &roster());
        let players = [
            player(0, "Ninja", Some("Celts"), Some(4001)),
            player(1, "Fiddler", Some("Mongols"), Some(4002)),
        ];
        let meta = rec.reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta.pick_provenance, Provenance::Override);
        assert_eq!(meta.first_pick.map(|p| p.get()), Some(1));
    }

    #[test]
    fn unknown_match_and_missing_sheet_are_missing() {
        let cache = RunCache::from_parts(
            FetchOutcome::Failed("down".to_string()),
            FetchOutcome::Failed("down".to_string()),
            FetchOutcome::Failed("down".to_string()),
        );
        let overrides = SheetOverrideTable::empty();
        let rec = SourceReconciler::new(&cache, &overrides, &[]);
        let players = [
            player(0, "Ninja", None, None),
            player(1, "Fiddler", None, None),
        ];
        let meta = rec.reconcile(Some(MatchExternalId::new(9001)), &players);
        assert_eq!(meta, MergedMatchMetadata::empty(Some(MatchExternalId::new(9001))));
        assert_eq!(players[0].confidence, ResolutionConfidence::Unresolved);
    }
}
