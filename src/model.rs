use std::fmt;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::ids::{CompetitorId, MatchExternalId, PlayerIndex};

/// One competitor's row in one match, as decoded from a save file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayerRecord {
    /// 0-based index exactly as the save format encodes it.
    pub source_index: u32,
    pub display_name: String,
    /// Draft value the player actually played with, when the save records it.
    pub choice: Option<String>,
    pub match_external_id: Option<MatchExternalId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub competitor_id: CompetitorId,
    pub canonical_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionConfidence {
    Override,
    NormalizedMatch,
    Unresolved,
}

impl ResolutionConfidence {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionConfidence::Override => "override",
            ResolutionConfidence::NormalizedMatch => "normalized_match",
            ResolutionConfidence::Unresolved => "unresolved",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "override" => Ok(ResolutionConfidence::Override),
            "normalized_match" => Ok(ResolutionConfidence::NormalizedMatch),
            "unresolved" => Ok(ResolutionConfidence::Unresolved),
            other => Err(anyhow!("unknown resolution confidence {other:?}")),
        }
    }
}

/// How a display name was tied (or not) to a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameResolution {
    Override(CompetitorId),
    Exact(CompetitorId),
    SubstringUnique(CompetitorId),
    Ambiguous(Vec<CompetitorId>),
    None,
}

impl NameResolution {
    pub fn competitor_id(&self) -> Option<CompetitorId> {
        match self {
            NameResolution::Override(id)
            | NameResolution::Exact(id)
            | NameResolution::SubstringUnique(id) => Some(*id),
            NameResolution::Ambiguous(_) | NameResolution::None => None,
        }
    }

    pub fn confidence(&self) -> ResolutionConfidence {
        match self {
            NameResolution::Override(_) => ResolutionConfidence::Override,
            NameResolution::Exact(_) | NameResolution::SubstringUnique(_) => {
                ResolutionConfidence::NormalizedMatch
            }
            NameResolution::Ambiguous(_) | NameResolution::None => {
                ResolutionConfidence::Unresolved
            }
        }
    }

    /// Short text stored next to the resolved player for operator review.
    pub fn describe(&self) -> String {
        match self {
            NameResolution::Override(_) => "override".to_string(),
            NameResolution::Exact(_) => "exact".to_string(),
            NameResolution::SubstringUnique(_) => "substring".to_string(),
            NameResolution::Ambiguous(ids) => {
                let ids = ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("ambiguous:{ids}")
            }
            NameResolution::None => "no_candidate".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlayer {
    pub player_index: PlayerIndex,
    pub display_name: String,
    pub choice: Option<String>,
    pub match_external_id: Option<MatchExternalId>,
    pub competitor_id: Option<CompetitorId>,
    pub confidence: ResolutionConfidence,
    pub detail: NameResolution,
}

/// Which source produced a merged field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Api,
    Spreadsheet,
    Override,
    Missing,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Api => "api",
            Provenance::Spreadsheet => "spreadsheet",
            Provenance::Override => "override",
            Provenance::Missing => "missing",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "api" => Ok(Provenance::Api),
            "spreadsheet" => Ok(Provenance::Spreadsheet),
            "override" => Ok(Provenance::Override),
            "missing" => Ok(Provenance::Missing),
            other => Err(anyhow!("unknown provenance {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketSide {
    Upper,
    Lower,
    Unknown,
}

impl BracketSide {
    /// Positive rounds are winners-bracket rounds, negative ones losers-bracket;
    /// zero or no round says nothing about the side.
    pub fn from_round(round: Option<i32>) -> Self {
        match round {
            Some(r) if r > 0 => BracketSide::Upper,
            Some(r) if r < 0 => BracketSide::Lower,
            _ => BracketSide::Unknown,
        }
    }

    pub fn is_upper(self) -> bool {
        self == BracketSide::Upper
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BracketSide::Upper => "upper",
            BracketSide::Lower => "lower",
            BracketSide::Unknown => "unknown",
        }
    }
}

/// Address of one game inside the draft spreadsheet: the round section it sits
/// in and its game number within that section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetGameKey {
    pub round: i32,
    pub game: u32,
}

impl SheetGameKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let (round, game) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| anyhow!("sheet game key {raw:?} is not <round>:<game>"))?;
        let round = round
            .trim()
            .parse::<i32>()
            .map_err(|_| anyhow!("sheet game key {raw:?} has a non-numeric round"))?;
        let game = game
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow!("sheet game key {raw:?} has a non-numeric game"))?;
        Ok(Self { round, game })
    }
}

impl fmt::Display for SheetGameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.round, self.game)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedMatchMetadata {
    pub match_external_id: Option<MatchExternalId>,
    pub round: Option<i32>,
    pub round_provenance: Provenance,
    pub first_pick: Option<PlayerIndex>,
    pub first_pick_competitor: Option<CompetitorId>,
    pub pick_provenance: Provenance,
    pub sheet_game: Option<SheetGameKey>,
}

impl MergedMatchMetadata {
    pub fn empty(match_external_id: Option<MatchExternalId>) -> Self {
        Self {
            match_external_id,
            round: None,
            round_provenance: Provenance::Missing,
            first_pick: None,
            first_pick_competitor: None,
            pick_provenance: Provenance::Missing,
            sheet_game: None,
        }
    }

    pub fn bracket_side(&self) -> BracketSide {
        BracketSide::from_round(self.round)
    }
}

/// Advisory record for a player the resolver could not tie to a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedDiagnostic {
    pub match_external_id: Option<MatchExternalId>,
    pub source_key: Option<String>,
    pub player_index: PlayerIndex,
    pub display_name: String,
    pub reason: String,
}
