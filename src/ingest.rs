use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::ids::{MatchExternalId, MatchRowId};
use crate::model::MatchPlayerRecord;
use crate::store;

/// Structured rows extracted from one save file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMatch {
    pub match_external_id: Option<MatchExternalId>,
    pub players: Vec<MatchPlayerRecord>,
    pub events: Vec<MatchEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvent {
    /// 0-based player the event belongs to, as the save format numbers them.
    pub source_index: Option<u32>,
    pub kind: String,
    pub payload: Value,
}

/// Turns the bytes of one save file into rows. Player indices must be passed
/// through exactly as the file encodes them.
pub trait SaveDecoder {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<DecodedMatch>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Inserted(MatchRowId),
    AlreadyPresent(MatchRowId),
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub files_seen: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub errors: Vec<String>,
}

/// Reads save files that an external extractor already turned into JSON rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRowsDecoder;

#[derive(Debug, Deserialize)]
struct RowsFile {
    #[serde(default)]
    match_external_id: Option<Value>,
    #[serde(default)]
    players: Vec<RowsPlayer>,
    #[serde(default)]
    events: Vec<RowsEvent>,
}

#[derive(Debug, Deserialize)]
struct RowsPlayer {
    index: i64,
    name: String,
    #[serde(default, alias = "civ")]
    choice: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RowsEvent {
    #[serde(default)]
    player: Option<i64>,
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl SaveDecoder for JsonRowsDecoder {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<DecodedMatch> {
        let file: RowsFile =
            serde_json::from_slice(bytes).with_context(|| format!("{name}: invalid rows json"))?;

        let match_external_id = match file.match_external_id {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(MatchExternalId::new(n.as_u64().ok_or_else(|| {
                anyhow!("{name}: match_external_id {n} is not a positive integer")
            })?)),
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.parse::<MatchExternalId>()?),
            Some(other) => return Err(anyhow!("{name}: match_external_id has value {other}")),
        };

        if file.players.is_empty() {
            return Err(anyhow!("{name}: no players"));
        }
        let mut seen = HashSet::new();
        let mut players = Vec::with_capacity(file.players.len());
        for p in file.players {
            let source_index = source_index(name, p.index)?;
            if !seen.insert(source_index) {
                return Err(anyhow!("{name}: player index {source_index} appears twice"));
            }
            players.push(MatchPlayerRecord {
                source_index,
                display_name: p.name,
                choice: p.choice.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
                match_external_id,
            });
        }
        players.sort_by_key(|p| p.source_index);

        let mut events = Vec::with_capacity(file.events.len());
        for e in file.events {
            let source_index = e.player.map(|i| source_index(name, i)).transpose()?;
            events.push(MatchEvent {
                source_index,
                kind: e.kind,
                payload: e.payload,
            });
        }

        Ok(DecodedMatch {
            match_external_id,
            players,
            events,
        })
    }
}

fn source_index(name: &str, raw: i64) -> Result<u32> {
    u32::try_from(raw).map_err(|_| anyhow!("{name}: player index {raw} is not a valid 0-based index"))
}

/// SHA-256 of the file bytes. Unlike the row id the store assigns, this
/// stays the same for the same save file across rebuilds.
pub fn source_key(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn import_bytes(
    conn: &mut Connection,
    decoder: &dyn SaveDecoder,
    name: &str,
    bytes: &[u8],
) -> Result<ImportOutcome> {
    let key = source_key(bytes);
    if let Some(existing) = store::find_match_by_source(conn, &key)? {
        return Ok(ImportOutcome::AlreadyPresent(existing));
    }
    let decoded = decoder.decode(name, bytes)?;
    store::insert_match(conn, &key, name, &decoded)
}

/// Imports every `*.json` file under `dir`. A file that cannot be read or
/// decoded fails on its own and the rest still import.
pub fn import_dir(
    conn: &mut Connection,
    decoder: &dyn SaveDecoder,
    dir: &Path,
) -> Result<ImportSummary> {
    let mut files = fs::read_dir(dir)
        .with_context(|| format!("read rows dir {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<PathBuf>>();
    files.sort();
    import_files(conn, decoder, &files)
}

pub fn import_files(
    conn: &mut Connection,
    decoder: &dyn SaveDecoder,
    files: &[PathBuf],
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    for path in files {
        summary.files_seen += 1;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let result = fs::read(path)
            .with_context(|| format!("read {}", path.display()))
            .and_then(|bytes| import_bytes(conn, decoder, &name, &bytes));
        match result {
            Ok(ImportOutcome::Inserted(_)) => summary.inserted += 1,
            Ok(ImportOutcome::AlreadyPresent(_)) => summary.already_present += 1,
            Err(err) => {
                warn!("import of {name} failed: {err:#}");
                summary.errors.push(format!("{name}: {err:#}"));
            }
        }
    }
    info!(
        "import: {} files, {} new, {} already present, {} failed",
        summary.files_seen,
        summary.inserted,
        summary.already_present,
        summary.errors.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_keeps_zero_based_indices() {
        let raw = br#"{
            "match_external_id": "9001",
            "players": [
                {"index": 1, "name": "Fidlr", "civ": "Mongols"},
                {"index": 0, "name": "Ninja", "choice": " Franks "}
            ],
            "events": [{"player": 0, "kind": "resign", "payload": {"t": 1200}}]
        }"#;
        let decoded = JsonRowsDecoder.decode("m.json", raw).expect("decodes");
        assert_eq!(decoded.match_external_id, Some(MatchExternalId::new(9001)));
        assert_eq!(decoded.players[0].source_index, 0);
        assert_eq!(decoded.players[0].display_name, "Ninja");
        assert_eq!(decoded.players[0].choice.as_deref(), Some("Franks"));
        assert_eq!(decoded.players[1].choice.as_deref(), Some("Mongols"));
        assert_eq!(decoded.events[0].source_index, Some(0));
    }

    #[test]
    fn decoder_rejects_structural_problems() {
        let negative = br#"{"players": [{"index": -1, "name": "x"}]}"#;
        assert!(JsonRowsDecoder.decode("a", negative).is_err());
        let duplicate = br#"{"players": [{"index": 0, "name": "x"}, {"index": 0, "name": "y"}]}"#;
        assert!(JsonRowsDecoder.decode("b", duplicate).is_err());
        assert!(JsonRowsDecoder.decode("c", b"\x00\x01garbage").is_err());
        assert!(JsonRowsDecoder.decode("d", br#"{"players": []}"#).is_err());
    }

    #[test]
    fn missing_external_id_is_allowed() {
        let raw = br#"{"match_external_id": null, "players": [{"index": 0, "name": "x"}]}"#;
        let decoded = JsonRowsDecoder.decode("e", raw).expect("decodes");
        assert_eq!(decoded.match_external_id, None);
    }

    #[test]
    fn source_key_depends_only_on_bytes() {
        assert_eq!(source_key(b"abc"), source_key(b"abc"));
        assert_ne!(source_key(b"abc"), source_key(b"abd"));
        assert_eq!(source_key(b"abc").len(), 64);
    }
}
