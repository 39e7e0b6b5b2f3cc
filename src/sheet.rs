//! Draft spreadsheet access and layout parsing.
//!
//! The organizer's sheet has no schema: round sections start wherever a
//! header row says so, and a game row may spread its cells over any number of
//! merged or empty columns. Parsing scans for the two row kinds it knows and
//! skips everything else.

use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::Url;
use serde_json::Value;

use crate::http_client::fetch_text;
use crate::model::SheetGameKey;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

pub type Grid = Vec<Vec<String>>;

pub trait SheetSource {
    fn read_range(&self, sheet_id: &str, range: &str) -> Result<Grid>;
}

#[derive(Debug, Clone)]
pub struct HttpSheetClient {
    base_url: String,
    api_key: Option<String>,
}

impl HttpSheetClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self, sheet_id: &str, range: &str) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/"))
            .with_context(|| format!("invalid sheets api base {base:?}"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("sheets api base {base:?} cannot take a path"))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(sheet_id)
            .push("values")
            .push(range);
        if let Some(key) = self.api_key.as_deref() {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}

impl SheetSource for HttpSheetClient {
    fn read_range(&self, sheet_id: &str, range: &str) -> Result<Grid> {
        let url = self.endpoint(sheet_id, range)?;
        let body = fetch_text(url).context("draft sheet range")?;
        parse_values_json(&body)
    }
}

/// Reads the `values` grid of a Sheets values response. Non-string cells are
/// rendered as text.
pub fn parse_values_json(raw: &str) -> Result<Grid> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid sheets json")?;
    let Some(rows) = root.get("values") else {
        return Ok(Vec::new());
    };
    let Value::Array(rows) = rows else {
        return Err(anyhow!("sheets values is not an array"));
    };
    Ok(rows
        .iter()
        .map(|row| match row {
            Value::Array(cells) => cells.iter().map(cell_text).collect(),
            other => vec![cell_text(other)],
        })
        .collect())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One game row of the draft sheet. The left competitor picked first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftGame {
    pub key: SheetGameKey,
    pub left_name: String,
    pub left_pick: String,
    pub right_name: String,
    pub right_pick: String,
    /// 0-based row in the fetched range, for log messages.
    pub row: usize,
}

pub fn parse_draft_grid(grid: &[Vec<String>]) -> Vec<DraftGame> {
    let mut games = Vec::new();
    let mut round: Option<i32> = None;

    for (row_idx, row) in grid.iter().enumerate() {
        let mut cells = row
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty());
        let Some(first) = cells.next() else {
            continue;
        };

        if let Some(r) = parse_round_header(first) {
            round = Some(r);
            continue;
        }
        let Some(game) = parse_game_label(first) else {
            continue;
        };
        let Some(round) = round else {
            debug!("draft row {row_idx}: game {game} before any round header, skipped");
            continue;
        };

        let values = cells.filter(|c| !is_separator(c)).collect::<Vec<_>>();
        let [left_name, left_pick, right_name, right_pick] = values.as_slice() else {
            debug!(
                "draft row {row_idx}: round {round} game {game} has {} values, expected 4",
                values.len()
            );
            continue;
        };
        games.push(DraftGame {
            key: SheetGameKey { round, game },
            left_name: left_name.to_string(),
            left_pick: left_pick.to_string(),
            right_name: right_name.to_string(),
            right_pick: right_pick.to_string(),
            row: row_idx,
        });
    }
    games
}

fn parse_round_header(cell: &str) -> Option<i32> {
    let lower = cell.to_lowercase();
    let tokens = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    let mut rest = tokens.as_slice();
    let mut losers = false;
    if let Some((side, tail)) = rest.split_first() {
        match *side {
            "winners" | "winner" | "upper" => rest = tail,
            "losers" | "loser" | "lower" => {
                losers = true;
                rest = tail;
            }
            _ => {}
        }
    }
    if let Some((&"bracket", tail)) = rest.split_first() {
        rest = tail;
    }
    let [word, number, ..] = rest else {
        return None;
    };
    if *word != "round" {
        return None;
    }
    let n = number.parse::<i32>().ok()?;
    Some(if losers { -n.abs() } else { n })
}

fn parse_game_label(cell: &str) -> Option<u32> {
    let lower = cell.trim().to_lowercase();
    let digits = lower
        .strip_prefix("game")
        .or_else(|| lower.strip_prefix('g'))
        .or_else(|| lower.strip_prefix('#'))?
        .trim()
        .trim_end_matches([':', '.']);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_separator(cell: &str) -> bool {
    matches!(
        cell.to_ascii_lowercase().as_str(),
        "vs" | "vs." | "v" | "v." | "-"
    )
}
