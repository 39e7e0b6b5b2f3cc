use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use serde_json::{Map, Value, json};

use crate::ids::{CompetitorId, MatchExternalId};
use crate::model::{SheetGameKey, UnresolvedDiagnostic};
use crate::normalize::normalize;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub competitor_id: CompetitorId,
    pub reason: Option<String>,
    pub date_added: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOverrideEntry {
    pub match_external_id: MatchExternalId,
    pub reason: Option<String>,
    pub date_added: Option<NaiveDate>,
}

/// An override the loader or the stale check refused to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideIssue {
    pub key: String,
    pub display_name: Option<String>,
    pub problem: String,
}

/// Human-authored `(match_external_id, display_name) -> competitor` corrections.
///
/// Keys are bracket-service match ids, never local row ids, so the table
/// stays valid across any number of store rebuilds. An empty table is legal
/// and makes every lookup miss.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: BTreeMap<MatchExternalId, BTreeMap<String, OverrideEntry>>,
    issues: Vec<OverrideIssue>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the override file. A missing or unreadable file is a
    /// configuration problem: it is logged and yields an empty table.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(err) => {
                warn!(
                    "override file {} unreadable, continuing without overrides: {err}",
                    path.display()
                );
                let mut table = Self::empty();
                table.issues.push(OverrideIssue {
                    key: path.display().to_string(),
                    display_name: None,
                    problem: format!("unreadable: {err}"),
                });
                table
            }
        }
    }

    pub fn from_json_str(raw: &str) -> Self {
        let mut table = Self::empty();
        let root = match parse_root(raw) {
            Ok(root) => root,
            Err(err) => {
                warn!("override file is not a JSON object, continuing without overrides: {err:#}");
                table.issues.push(OverrideIssue {
                    key: String::new(),
                    display_name: None,
                    problem: format!("{err:#}"),
                });
                return table;
            }
        };

        for (key, by_name) in root {
            let match_id = match key.parse::<MatchExternalId>() {
                Ok(id) => id,
                Err(err) => {
                    table.skip(&key, None, format!("{err:#}"));
                    continue;
                }
            };
            let Value::Object(by_name) = by_name else {
                table.skip(&key, None, "expected an object of display names".to_string());
                continue;
            };
            for (display_name, raw_entry) in by_name {
                match parse_override_entry(&raw_entry) {
                    Ok(entry) => {
                        table
                            .entries
                            .entry(match_id)
                            .or_default()
                            .insert(display_name, entry);
                    }
                    Err(err) => table.skip(&key, Some(display_name), format!("{err:#}")),
                }
            }
        }

        debug!(
            "loaded {} player overrides across {} matches ({} skipped)",
            table.len(),
            table.entries.len(),
            table.issues.len()
        );
        table
    }

    /// Exact display-name key first, then a key with the same normalized form.
    pub fn lookup(&self, match_id: MatchExternalId, display_name: &str) -> Option<&OverrideEntry> {
        let by_name = self.entries.get(&match_id)?;
        if let Some(entry) = by_name.get(display_name) {
            return Some(entry);
        }
        let wanted = normalize(display_name);
        if wanted.is_empty() {
            return None;
        }
        by_name
            .iter()
            .find(|(name, _)| normalize(name) == wanted)
            .map(|(_, entry)| entry)
    }

    pub fn has_entries_for(&self, match_id: MatchExternalId) -> bool {
        self.entries.contains_key(&match_id)
    }

    pub fn match_ids(&self) -> impl Iterator<Item = MatchExternalId> + '_ {
        self.entries.keys().copied()
    }

    /// Every entry with its match id and display name as written, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (MatchExternalId, &str, &OverrideEntry)> + '_ {
        self.entries.iter().flat_map(|(match_id, by_name)| {
            by_name
                .iter()
                .map(move |(name, entry)| (*match_id, name.as_str(), entry))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn issues(&self) -> &[OverrideIssue] {
        &self.issues
    }

    /// Drops entries for matches the bracket service and the store no longer
    /// know. Does nothing when `known` is empty.
    pub fn retain_known(&mut self, known: &HashSet<MatchExternalId>) -> usize {
        if known.is_empty() {
            return 0;
        }
        let stale = self
            .entries
            .keys()
            .filter(|id| !known.contains(id))
            .copied()
            .collect::<Vec<_>>();
        for id in &stale {
            if let Some(by_name) = self.entries.remove(id) {
                for name in by_name.keys() {
                    self.skip(&id.to_string(), Some(name.clone()), "unknown match".to_string());
                }
            }
        }
        stale.len()
    }

    fn skip(&mut self, key: &str, display_name: Option<String>, problem: String) {
        warn!(
            "skipping override {key}/{}: {problem}",
            display_name.as_deref().unwrap_or("*")
        );
        self.issues.push(OverrideIssue {
            key: key.to_string(),
            display_name,
            problem,
        });
    }
}

/// Maps a spreadsheet game (round section + row-local game number) to the
/// bracket match it belongs to, for games name matching cannot place.
#[derive(Debug, Clone, Default)]
pub struct SheetOverrideTable {
    entries: BTreeMap<SheetGameKey, SheetOverrideEntry>,
    issues: Vec<OverrideIssue>,
}

impl SheetOverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(err) => {
                warn!(
                    "sheet override file {} unreadable, continuing without: {err}",
                    path.display()
                );
                Self::empty()
            }
        }
    }

    pub fn from_json_str(raw: &str) -> Self {
        let mut table = Self::empty();
        let root = match parse_root(raw) {
            Ok(root) => root,
            Err(err) => {
                warn!("sheet override file is not a JSON object: {err:#}");
                table.issues.push(OverrideIssue {
                    key: String::new(),
                    display_name: None,
                    problem: format!("{err:#}"),
                });
                return table;
            }
        };
        for (key, raw_entry) in root {
            let parsed = SheetGameKey::parse(&key)
                .and_then(|game| parse_sheet_entry(&raw_entry).map(|entry| (game, entry)));
            match parsed {
                Ok((game, entry)) => {
                    table.entries.insert(game, entry);
                }
                Err(err) => {
                    warn!("skipping sheet override {key}: {err:#}");
                    table.issues.push(OverrideIssue {
                        key,
                        display_name: None,
                        problem: format!("{err:#}"),
                    });
                }
            }
        }
        table
    }

    pub fn games_for(&self, match_id: MatchExternalId) -> Vec<SheetGameKey> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.match_external_id == match_id)
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn get(&self, key: SheetGameKey) -> Option<&SheetOverrideEntry> {
        self.entries.get(&key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (SheetGameKey, &SheetOverrideEntry)> + '_ {
        self.entries.iter().map(|(key, entry)| (*key, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn issues(&self) -> &[OverrideIssue] {
        &self.issues
    }

    pub fn retain_known(&mut self, known: &HashSet<MatchExternalId>) -> usize {
        if known.is_empty() {
            return 0;
        }
        let before = self.entries.len();
        let mut dropped = Vec::new();
        self.entries.retain(|key, entry| {
            let keep = known.contains(&entry.match_external_id);
            if !keep {
                dropped.push(OverrideIssue {
                    key: key.to_string(),
                    display_name: None,
                    problem: format!("unknown match {}", entry.match_external_id),
                });
            }
            keep
        });
        for issue in &dropped {
            warn!("skipping sheet override {}: {}", issue.key, issue.problem);
        }
        self.issues.extend(dropped);
        before - self.entries.len()
    }
}

/// Builds an override-file document listing every unresolved player, with a
/// blank competitor id for the operator to fill in.
pub fn unresolved_skeleton(diagnostics: &[UnresolvedDiagnostic]) -> Value {
    let today = Utc::now().date_naive().format(DATE_FORMAT).to_string();
    let mut by_match: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for diag in diagnostics {
        let Some(match_id) = diag.match_external_id else {
            continue;
        };
        by_match.entry(match_id.to_string()).or_default().insert(
            diag.display_name.clone(),
            json!({
                "competitor_id": Value::Null,
                "reason": diag.reason,
                "date_added": today,
            }),
        );
    }
    Value::Object(
        by_match
            .into_iter()
            .map(|(k, v)| (k, Value::Object(v)))
            .collect(),
    )
}

fn parse_root(raw: &str) -> Result<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(trimmed).context("invalid override json")? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("expected a JSON object, found {}", type_name(&other))),
    }
}

fn parse_override_entry(raw: &Value) -> Result<OverrideEntry> {
    let Value::Object(obj) = raw else {
        return Err(anyhow!("expected an object, found {}", type_name(raw)));
    };
    let competitor_id = obj
        .get("competitor_id")
        .ok_or_else(|| anyhow!("missing competitor_id"))
        .and_then(parse_competitor_id)?;
    Ok(OverrideEntry {
        competitor_id,
        reason: string_field(obj, "reason"),
        date_added: date_field(obj),
    })
}

fn parse_sheet_entry(raw: &Value) -> Result<SheetOverrideEntry> {
    let Value::Object(obj) = raw else {
        return Err(anyhow!("expected an object, found {}", type_name(raw)));
    };
    let match_external_id = match obj.get("match_external_id") {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(MatchExternalId::new)
            .ok_or_else(|| anyhow!("match_external_id {n} is not a positive integer"))?,
        Some(Value::String(s)) => s.parse::<MatchExternalId>()?,
        Some(other) => return Err(anyhow!("match_external_id has type {}", type_name(other))),
        None => return Err(anyhow!("missing match_external_id")),
    };
    Ok(SheetOverrideEntry {
        match_external_id,
        reason: string_field(obj, "reason"),
        date_added: date_field(obj),
    })
}

fn parse_competitor_id(value: &Value) -> Result<CompetitorId> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(CompetitorId::new)
            .ok_or_else(|| anyhow!("competitor_id {n} is not a positive integer")),
        Value::String(s) => s.parse::<CompetitorId>(),
        other => Err(anyhow!("competitor_id has type {}", type_name(other))),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn date_field(obj: &Map<String, Value>) -> Option<NaiveDate> {
    let raw = string_field(obj, "date_added")?;
    match NaiveDate::parse_from_str(&raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            warn!("ignoring override date_added {raw:?}: {err}");
            None
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PlayerIndex;

    const SAMPLE: &str = r#"{
        "9001": {
            "Fidlr": {"competitor_id": 4002, "reason": "typo in lobby", "date_added": "2024-03-02"},
            "Ghost": {"competitor_id": "4005"}
        },
        "not-a-match": {"Ninja": {"competitor_id": 4001}},
        "9002": {
            "Broken": {"reason": "no id"},
            "AlsoBroken": 17,
            "Neg": {"competitor_id": -4}
        },
        "9003": "oops"
    }"#;

    #[test]
    fn load_keeps_valid_entries_and_skips_the_rest() {
        let table = OverrideTable::from_json_str(SAMPLE);
        assert_eq!(table.len(), 2);
        let entry = table
            .lookup(MatchExternalId::new(9001), "Fidlr")
            .expect("override present");
        assert_eq!(entry.competitor_id, CompetitorId::new(4002));
        assert_eq!(entry.reason.as_deref(), Some("typo in lobby"));
        assert_eq!(entry.date_added, NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!(
            table
                .lookup(MatchExternalId::new(9001), "Ghost")
                .map(|e| e.competitor_id),
            Some(CompetitorId::new(4005))
        );
        // not-a-match, Broken, AlsoBroken, Neg, 9003
        assert_eq!(table.issues().len(), 5);
    }

    #[test]
    fn lookup_falls_back_to_normalized_name() {
        let table = OverrideTable::from_json_str(SAMPLE);
        assert!(table.lookup(MatchExternalId::new(9001), " fidlr!").is_some());
        assert!(table.lookup(MatchExternalId::new(9002), "Fidlr").is_none());
    }

    #[test]
    fn empty_and_garbage_files_give_empty_tables() {
        assert!(OverrideTable::from_json_str("").is_empty());
        let garbage = OverrideTable::from_json_str("[1, 2]");
        assert!(garbage.is_empty());
        assert_eq!(garbage.issues().len(), 1);
        assert!(
            garbage
                .lookup(MatchExternalId::new(1), "anyone")
                .is_none()
        );
    }

    #[test]
    fn missing_file_is_not_fatal() {
        let table = OverrideTable::load(Path::new("/definitely/not/here/overrides.json"));
        assert!(table.is_empty());
        assert_eq!(table.issues().len(), 1);
    }

    #[test]
    fn retain_known_drops_stale_matches() {
        let mut table = OverrideTable::from_json_str(
            r#"{"9001": {"A": {"competitor_id": 1}}, "9002": {"B": {"competitor_id": 2}}}"#,
        );
        let known = HashSet::from([MatchExternalId::new(9001)]);
        assert_eq!(table.retain_known(&known), 1);
        assert!(table.has_entries_for(MatchExternalId::new(9001)));
        assert!(!table.has_entries_for(MatchExternalId::new(9002)));
        assert_eq!(table.retain_known(&HashSet::new()), 0);
    }

    #[test]
    fn sheet_overrides_parse_round_and_game() {
        let table = SheetOverrideTable::from_json_str(
            r#"{
                "3:2": {"match_external_id": 9001, "reason": "names swapped"},
                "-1:4": {"match_external_id": "9002"},
                "bad": {"match_external_id": 1},
                "2:1": {"reason": "missing id"}
            }"#,
        );
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.games_for(MatchExternalId::new(9001)),
            vec![SheetGameKey { round: 3, game: 2 }]
        );
        assert_eq!(table.issues().len(), 2);
    }

    #[test]
    fn skeleton_lists_unresolved_players_by_match() {
        let diags = vec![
            UnresolvedDiagnostic {
                match_external_id: Some(MatchExternalId::new(9001)),
                source_key: None,
                player_index: PlayerIndex::from_source_index(1).expect("index"),
                display_name: "Fidlr".to_string(),
                reason: "no_candidate".to_string(),
            },
            UnresolvedDiagnostic {
                match_external_id: None,
                source_key: None,
                player_index: PlayerIndex::from_source_index(0).expect("index"),
                display_name: "Nobody".to_string(),
                reason: "no_candidate".to_string(),
            },
        ];
        let skeleton = unresolved_skeleton(&diags);
        assert!(skeleton["9001"]["Fidlr"]["competitor_id"].is_null());
        assert_eq!(skeleton.as_object().map(|m| m.len()), Some(1));
        // Unfilled skeletons load as skipped entries, never as bogus overrides.
        let reloaded = OverrideTable::from_json_str(&skeleton.to_string());
        assert!(reloaded.is_empty());
    }
}
