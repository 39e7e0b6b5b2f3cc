use std::fs;
use std::path::PathBuf;

use bracket_ledger::bracket::parse_participants_json;
use bracket_ledger::ids::{CompetitorId, MatchExternalId, MatchRowId};
use bracket_ledger::ingest::{self, ImportOutcome, JsonRowsDecoder};
use bracket_ledger::model::{NameResolution, ResolutionConfidence, ResolvedPlayer};
use bracket_ledger::overrides::OverrideTable;
use bracket_ledger::resolver::IdentityResolver;
use bracket_ledger::store;
use rusqlite::Connection;

fn fixture_path(parts: &[&str]) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    for part in parts {
        path.push(part);
    }
    path
}

fn read_fixture(parts: &[&str]) -> String {
    fs::read_to_string(fixture_path(parts)).expect("fixture file should be readable")
}

fn import_fixture_match(conn: &mut Connection, file: &str) -> MatchRowId {
    let bytes = fs::read(fixture_path(&["rows", file])).expect("rows fixture should be readable");
    match ingest::import_bytes(conn, &JsonRowsDecoder, file, &bytes).expect("fixture imports") {
        ImportOutcome::Inserted(id) | ImportOutcome::AlreadyPresent(id) => id,
    }
}

fn resolve_all(conn: &Connection, row_id: MatchRowId, overrides: &OverrideTable) -> Vec<ResolvedPlayer> {
    let roster = parse_participants_json(&read_fixture(&["participants.json"]))
        .expect("participants fixture should parse");
    let resolver = IdentityResolver::new(&roster, overrides);
    let stored = store::load_match(conn, row_id).expect("stored match");
    stored
        .players
        .iter()
        .map(|p| resolver.resolve(conn, row_id, p).expect("resolves"))
        .collect()
}

#[test]
fn typo_name_stays_unresolved_without_override() {
    let mut conn = store::open_in_memory().expect("in-memory db");
    let row_id = import_fixture_match(&mut conn, "m9001.json");

    let players = resolve_all(&conn, row_id, &OverrideTable::empty());
    assert_eq!(players.len(), 2);

    assert_eq!(players[0].player_index.get(), 1);
    assert_eq!(players[0].display_name, "Ninja");
    assert_eq!(players[0].competitor_id, Some(CompetitorId::new(4001)));
    assert_eq!(players[0].confidence, ResolutionConfidence::NormalizedMatch);

    assert_eq!(players[1].player_index.get(), 2);
    assert_eq!(players[1].display_name, "Fidlr");
    assert_eq!(players[1].competitor_id, None);
    assert_eq!(players[1].confidence, ResolutionConfidence::Unresolved);
    assert_eq!(players[1].match_external_id, Some(MatchExternalId::new(9001)));
}

#[test]
fn override_file_resolves_typo_name() {
    let mut conn = store::open_in_memory().expect("in-memory db");
    let row_id = import_fixture_match(&mut conn, "m9001.json");
    let overrides = OverrideTable::from_json_str(&read_fixture(&["overrides.json"]));

    let players = resolve_all(&conn, row_id, &overrides);
    assert_eq!(players[1].competitor_id, Some(CompetitorId::new(4002)));
    assert_eq!(players[1].confidence, ResolutionConfidence::Override);
    assert_eq!(players[1].detail, NameResolution::Override(CompetitorId::new(4002)));
    assert_eq!(players[0].confidence, ResolutionConfidence::NormalizedMatch);
}

#[test]
fn override_wins_over_an_exact_name_match() {
    let mut conn = store::open_in_memory().expect("in-memory db");
    let row_id = import_fixture_match(&mut conn, "m9003.json");
    let overrides = OverrideTable::from_json_str(
        r#"{"9003": {"Ninja": {"competitor_id": 4003, "reason": "smurf account"}}}"#,
    );

    let players = resolve_all(&conn, row_id, &overrides);
    assert_eq!(players[0].competitor_id, Some(CompetitorId::new(4003)));
    assert_eq!(players[0].confidence, ResolutionConfidence::Override);
    assert_eq!(players[1].competitor_id, Some(CompetitorId::new(4004)));
}

#[test]
fn override_for_another_match_does_not_apply() {
    let mut conn = store::open_in_memory().expect("in-memory db");
    let row_id = import_fixture_match(&mut conn, "m9003.json");
    let overrides = OverrideTable::from_json_str(
        r#"{"9001": {"Hera": {"competitor_id": 4002}}}"#,
    );

    let players = resolve_all(&conn, row_id, &overrides);
    assert_eq!(players[1].competitor_id, Some(CompetitorId::new(4004)));
    assert_eq!(players[1].confidence, ResolutionConfidence::NormalizedMatch);
}

#[test]
fn clan_tagged_name_resolves_by_unique_substring() {
    let mut conn = store::open_in_memory().expect("in-memory db");
    let row_id = import_fixture_match(&mut conn, "m9002.json");

    let players = resolve_all(&conn, row_id, &OverrideTable::empty());
    assert_eq!(players[0].display_name, "GG.Ghost");
    assert_eq!(
        players[0].detail,
        NameResolution::SubstringUnique(CompetitorId::new(4003))
    );
    assert_eq!(players[0].confidence, ResolutionConfidence::NormalizedMatch);
}

#[test]
fn match_without_external_id_ignores_overrides() {
    let mut conn = store::open_in_memory().expect("in-memory db");
    let row_id = import_fixture_match(&mut conn, "unlinked.json");
    let overrides = OverrideTable::from_json_str(&read_fixture(&["overrides.json"]));

    let players = resolve_all(&conn, row_id, &overrides);
    assert_eq!(players[0].match_external_id, None);
    assert_eq!(players[0].competitor_id, Some(CompetitorId::new(4001)));
    assert_eq!(players[1].confidence, ResolutionConfidence::Unresolved);
    assert_eq!(players[1].detail, NameResolution::None);
}

#[test]
fn override_fixture_reports_bad_keys() {
    let overrides = OverrideTable::from_json_str(&read_fixture(&["overrides.json"]));
    assert_eq!(overrides.len(), 2);
    assert!(
        overrides
            .issues()
            .iter()
            .any(|issue| issue.key == "not-a-match")
    );
    let entry = overrides
        .lookup(MatchExternalId::new(9001), "Fidlr")
        .expect("override entry");
    assert_eq!(entry.reason.as_deref(), Some("lobby name typo"));
    assert!(entry.date_added.is_some());
}
