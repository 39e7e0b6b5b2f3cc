use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::model::BracketSide;
use crate::store::{self, Coverage, Snapshot};

pub struct ExportReport {
    pub matches: usize,
    pub players: usize,
    pub unresolved: usize,
}

/// Writes the data-quality workbook: totals, one row per match with its
/// provenance tags, one row per resolved player and the open unresolved list.
pub fn export_coverage(conn: &Connection, path: &Path) -> Result<ExportReport> {
    let coverage = store::coverage(conn)?;
    let snapshot = store::snapshot(conn)?;
    let unresolved = store::load_unresolved(conn)?;

    let summary_rows = summary_rows(&coverage);
    let (match_rows, player_rows) = snapshot_rows(&snapshot);

    let mut unresolved_rows = vec![vec![
        "Match External ID".to_string(),
        "Source Key".to_string(),
        "Player Index".to_string(),
        "Display Name".to_string(),
        "Reason".to_string(),
    ]];
    for item in &unresolved {
        unresolved_rows.push(vec![
            opt_text(item.match_external_id),
            item.source_key.clone().unwrap_or_default(),
            item.player_index.to_string(),
            item.display_name.clone(),
            item.reason.clone(),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Coverage")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matches")?;
        write_rows(sheet, &match_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Players")?;
        write_rows(sheet, &player_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Unresolved")?;
        write_rows(sheet, &unresolved_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        matches: match_rows.len().saturating_sub(1),
        players: player_rows.len().saturating_sub(1),
        unresolved: unresolved_rows.len().saturating_sub(1),
    })
}

fn summary_rows(c: &Coverage) -> Vec<Vec<String>> {
    let pairs = [
        ("Matches", c.matches),
        ("Reconciled matches", c.reconciled_matches),
        ("Players", c.players),
        ("Players by override", c.players_override),
        ("Players by name match", c.players_normalized),
        ("Players unresolved", c.players_unresolved),
        ("Round from bracket service", c.round_api),
        ("Round missing", c.round_missing),
        ("Pick order from spreadsheet", c.pick_spreadsheet),
        ("Pick order from override", c.pick_override),
        ("Pick order missing", c.pick_missing),
    ];
    let mut rows = vec![vec!["Metric".to_string(), "Count".to_string()]];
    rows.extend(
        pairs
            .iter()
            .map(|(label, n)| vec![label.to_string(), n.to_string()]),
    );
    rows
}

fn snapshot_rows(snapshot: &Snapshot) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    let mut matches = vec![vec![
        "Source Key".to_string(),
        "Match External ID".to_string(),
        "Round".to_string(),
        "Bracket".to_string(),
        "Round Source".to_string(),
        "First Pick Player".to_string(),
        "First Pick Competitor".to_string(),
        "Pick Source".to_string(),
        "Sheet Game".to_string(),
    ]];
    for m in &snapshot.matches {
        matches.push(vec![
            m.source_key.clone(),
            opt_text(m.match_external_id),
            opt_text(m.round),
            BracketSide::from_round(m.round).as_str().to_string(),
            m.round_provenance.clone(),
            opt_text(m.first_pick_player_index),
            opt_text(m.first_pick_competitor_id),
            m.pick_provenance.clone(),
            m.sheet_game.clone().unwrap_or_default(),
        ]);
    }

    let mut players = vec![vec![
        "Source Key".to_string(),
        "Match External ID".to_string(),
        "Player Index".to_string(),
        "Display Name".to_string(),
        "Competitor ID".to_string(),
        "Confidence".to_string(),
        "Detail".to_string(),
    ]];
    for p in &snapshot.players {
        players.push(vec![
            p.source_key.clone(),
            opt_text(p.match_external_id),
            p.player_index.to_string(),
            p.display_name.clone(),
            opt_text(p.competitor_id),
            p.resolution_confidence.clone(),
            p.resolution_detail.clone(),
        ]);
    }
    (matches, players)
}

fn opt_text<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
