use std::collections::HashMap;

use anyhow::Result;
use log::warn;

use crate::ids::{CompetitorId, MatchExternalId, MatchRowId, PlayerIndex};
use crate::model::{
    Competitor, MatchPlayerRecord, NameResolution, ResolutionConfidence, ResolvedPlayer,
    UnresolvedDiagnostic,
};
use crate::normalize::{NameMatch, compare_normalized, normalize};
use crate::overrides::OverrideTable;

pub const DIAGNOSTICS_TARGET: &str = "bracket_ledger::diagnostics";

/// Finds the bracket-service id of a stored match.
pub trait ExternalIdLookup {
    fn external_id_for(&self, match_row_id: MatchRowId) -> Result<Option<MatchExternalId>>;
}

impl ExternalIdLookup for HashMap<MatchRowId, MatchExternalId> {
    fn external_id_for(&self, match_row_id: MatchRowId) -> Result<Option<MatchExternalId>> {
        Ok(self.get(&match_row_id).copied())
    }
}

#[derive(Debug, Clone)]
struct RosterEntry {
    id: CompetitorId,
    norm: String,
}

pub struct IdentityResolver<'a> {
    roster: Vec<RosterEntry>,
    overrides: &'a OverrideTable,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(competitors: &[Competitor], overrides: &'a OverrideTable) -> Self {
        let roster = competitors
            .iter()
            .map(|c| RosterEntry {
                id: c.competitor_id,
                norm: normalize(&c.canonical_name),
            })
            .filter(|entry| !entry.norm.is_empty())
            .collect();
        Self { roster, overrides }
    }

    /// Ties one match player to a competitor. Failing to find one is not an
    /// error: the player comes back `unresolved` with the reason attached.
    pub fn resolve(
        &self,
        lookup: &impl ExternalIdLookup,
        match_row_id: MatchRowId,
        player: &MatchPlayerRecord,
    ) -> Result<ResolvedPlayer> {
        let player_index = PlayerIndex::from_source_index(player.source_index)?;
        let match_external_id = match lookup.external_id_for(match_row_id) {
            Ok(id) => id,
            Err(err) => {
                warn!("external id lookup failed for {match_row_id}, overrides unavailable: {err:#}");
                None
            }
        };

        let override_hit = match_external_id
            .and_then(|id| self.overrides.lookup(id, &player.display_name))
            .map(|entry| NameResolution::Override(entry.competitor_id));
        let detail = override_hit.unwrap_or_else(|| self.match_name(&player.display_name));

        let resolved = ResolvedPlayer {
            player_index,
            display_name: player.display_name.clone(),
            choice: player.choice.clone(),
            match_external_id,
            competitor_id: detail.competitor_id(),
            confidence: detail.confidence(),
            detail,
        };

        if resolved.confidence == ResolutionConfidence::Unresolved {
            warn!(
                target: DIAGNOSTICS_TARGET,
                "unresolved player match_external_id={} match_row={} player_index={} display_name={:?} reason={}",
                match_external_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                match_row_id,
                resolved.player_index,
                resolved.display_name,
                resolved.detail.describe()
            );
        }
        Ok(resolved)
    }

    /// Automatic matching only: a unique exact canonical match, else a unique
    /// substring match.
    pub fn match_name(&self, display_name: &str) -> NameResolution {
        let wanted = normalize(display_name);
        if wanted.is_empty() {
            return NameResolution::None;
        }

        let exact = self.candidates(&wanted, NameMatch::Exact);
        match exact.len() {
            1 => return NameResolution::Exact(exact[0]),
            0 => {}
            _ => return NameResolution::Ambiguous(exact),
        }

        let partial = self.candidates(&wanted, NameMatch::Substring);
        match partial.len() {
            0 => NameResolution::None,
            1 => NameResolution::SubstringUnique(partial[0]),
            _ => NameResolution::Ambiguous(partial),
        }
    }

    fn candidates(&self, wanted: &str, kind: NameMatch) -> Vec<CompetitorId> {
        let mut ids = self
            .roster
            .iter()
            .filter(|entry| compare_normalized(wanted, &entry.norm) == kind)
            .map(|entry| entry.id)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

pub fn diagnostic_for(
    player: &ResolvedPlayer,
    source_key: Option<&str>,
) -> Option<UnresolvedDiagnostic> {
    if player.confidence != ResolutionConfidence::Unresolved {
        return None;
    }
    Some(UnresolvedDiagnostic {
        match_external_id: player.match_external_id,
        source_key: source_key.map(|s| s.to_string()),
        player_index: player.player_index,
        display_name: player.display_name.clone(),
        reason: player.detail.describe(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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
            Competitor {
                competitor_id: CompetitorId::new(4003),
                canonical_name: "Ninjago".to_string(),
            },
        ]
    }

    fn player(idx: u32, name: &str) -> MatchPlayerRecord {
        MatchPlayerRecord {
            source_index: idx,
            display_name: name.to_string(),
            choice: None,
            match_external_id: Some(MatchExternalId::new(9001)),
        }
    }

    fn lookup() -> HashMap<MatchRowId, MatchExternalId> {
        HashMap::from([(MatchRowId::from_rowid(1), MatchExternalId::new(9001))])
    }

    #[test]
    fn exact_match_wins_over_substring() {
        let overrides = OverrideTable::empty();
        let resolver = IdentityResolver::new(&roster(), &overrides);
        // "ninja" is also a substring of "ninjago"; the exact hit decides.
        let out = resolver
            .resolve(&lookup(), MatchRowId::from_rowid(1), &player(0, "NINJA"))
            .expect("resolves");
        assert_eq!(out.competitor_id, Some(CompetitorId::new(4001)));
        assert_eq!(out.confidence, ResolutionConfidence::NormalizedMatch);
        assert_eq!(out.player_index.get(), 1);
    }

    #[test]
    fn unique_substring_is_a_normalized_match() {
        let overrides = OverrideTable::empty();
        let resolver = IdentityResolver::new(&roster(), &overrides);
        assert_eq!(
            resolver.match_name("fiddl"),
            NameResolution::SubstringUnique(CompetitorId::new(4002))
        );
    }

    #[test]
    fn several_substring_candidates_are_ambiguous() {
        let overrides = OverrideTable::empty();
        let resolver = IdentityResolver::new(&roster(), &overrides);
        let out = resolver
            .resolve(&lookup(), MatchRowId::from_rowid(1), &player(1, "nin"))
            .expect("resolves");
        assert_eq!(out.competitor_id, None);
        assert_eq!(out.confidence, ResolutionConfidence::Unresolved);
        assert_eq!(
            out.detail,
            NameResolution::Ambiguous(vec![CompetitorId::new(4001), CompetitorId::new(4003)])
        );
        assert!(diagnostic_for(&out, Some("abc")).is_some());
    }

    #[test]
    fn override_beats_exact_match() {
        let overrides =
            OverrideTable::from_json_str(r#"{"9001": {"Ninja": {"competitor_id": 4003}}}"#);
        let resolver = IdentityResolver::new(&roster(), &overrides);
        let out = resolver
            .resolve(&lookup(), MatchRowId::from_rowid(1), &player(0, "Ninja"))
            .expect("resolves");
        assert_eq!(out.competitor_id, Some(CompetitorId::new(4003)));
        assert_eq!(out.confidence, ResolutionConfidence::Override);
    }

    #[test]
    fn unknown_row_skips_overrides_but_still_matches_names() {
        let overrides =
            OverrideTable::from_json_str(r#"{"9001": {"Ninja": {"competitor_id": 4003}}}"#);
        let resolver = IdentityResolver::new(&roster(), &overrides);
        let out = resolver
            .resolve(&lookup(), MatchRowId::from_rowid(99), &player(0, "Ninja"))
            .expect("resolves");
        assert_eq!(out.match_external_id, None);
        assert_eq!(out.competitor_id, Some(CompetitorId::new(4001)));
        assert_eq!(out.detail, NameResolution::Exact(CompetitorId::new(4001)));
    }

    #[test]
    fn duplicate_roster_names_are_ambiguous() {
        let mut competitors = roster();
        competitors.push(Competitor {
            competitor_id: CompetitorId::new(4010),
            canonical_name: "ninja ".to_string(),
        });
        let overrides = OverrideTable::empty();
        let resolver = IdentityResolver::new(&competitors, &overrides);
        assert!(matches!(
            resolver.match_name("Ninja"),
            NameResolution::Ambiguous(ids) if ids.len() == 2
        ));
    }
}
