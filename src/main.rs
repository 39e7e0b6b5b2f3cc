use std::path::PathBuf;

use anyhow::{Context, Result};

use bracket_ledger::bracket::HttpBracketClient;
use bracket_ledger::config::ReconcileConfig;
use bracket_ledger::coverage_export;
use bracket_ledger::ingest::{self, JsonRowsDecoder};
use bracket_ledger::orchestrator::{self, RunOptions};
use bracket_ledger::overrides::{OverrideTable, SheetOverrideTable};
use bracket_ledger::run_cache::Sources;
use bracket_ledger::sheet::HttpSheetClient;
use bracket_ledger::store;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = ReconcileConfig::from_env();
    if let Some(path) = path_arg(&args, "--db") {
        cfg.db_path = Some(path);
    }
    if let Some(path) = path_arg(&args, "--rows") {
        cfg.rows_dir = Some(path);
    }
    let opts = RunOptions {
        force: flag_arg(&args, "--force"),
    };

    let db_path = cfg.db_path.clone().context("unable to resolve sqlite path")?;
    let mut conn = store::open_db(&db_path)?;

    if flag_arg(&args, "--rebuild") {
        let dir = cfg.rebuild_rows_dir()?;
        store::reset(&mut conn)?;
        println!("Store reset, re-importing from {}", dir.display());
    }

    if let Some(dir) = cfg.rows_dir.as_deref() {
        let summary = ingest::import_dir(&mut conn, &JsonRowsDecoder, dir)?;
        println!(
            "Import: {} files, {} new, {} already present",
            summary.files_seen, summary.inserted, summary.already_present
        );
        print_errors(&summary.errors);
    }

    let bracket = HttpBracketClient::new(cfg.bracket_api_base.clone(), cfg.bracket_api_key.clone());
    let sheet = HttpSheetClient::new(cfg.sheets_api_base.clone(), cfg.sheets_api_key.clone());
    let sources = Sources {
        bracket: &bracket,
        sheet: &sheet,
        tournament_id: cfg.tournament_id.clone(),
        sheet_id: cfg.draft_sheet_id.clone(),
        sheet_range: Some(cfg.draft_sheet_range.clone()),
    };
    let overrides = OverrideTable::load(&cfg.overrides_path);
    let sheet_overrides = SheetOverrideTable::load(&cfg.sheet_overrides_path);

    let summary =
        orchestrator::run_reconciliation(&mut conn, &sources, &overrides, &sheet_overrides, opts)?;

    println!("Reconciliation complete");
    println!("DB: {}", db_path.display());
    println!(
        "Matches: {} considered of {}, {} committed, {} failed",
        summary.matches_considered,
        summary.matches_total,
        summary.matches_committed,
        summary.matches_failed
    );
    println!(
        "Roster: {} competitors{}",
        summary.roster_size,
        if summary.roster_from_store { " (from store)" } else { "" }
    );
    if summary.inputs_changed > 0 {
        println!(
            "Roster or overrides changed: {} matches revisited",
            summary.inputs_changed
        );
    }
    if summary.stale_overrides > 0 {
        println!("Stale overrides ignored: {}", summary.stale_overrides);
    }
    for failure in &summary.source_failures {
        println!("Source unavailable: {failure}");
    }
    if !summary.unresolved.is_empty() {
        println!("Unresolved players: {}", summary.unresolved.len());
        for item in summary.unresolved.iter().take(12) {
            println!(
                "   - match {} player {} {:?}: {}",
                item.match_external_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "n/a".to_string()),
                item.player_index,
                item.display_name,
                item.reason
            );
        }
    }
    print_errors(&summary.errors);

    let coverage = store::coverage(&conn)?;
    println!(
        "Coverage: players {}/{} resolved ({} override), rounds {}/{}, pick order {}/{} ({} override)",
        coverage.players - coverage.players_unresolved,
        coverage.players,
        coverage.players_override,
        coverage.round_api,
        coverage.reconciled_matches,
        coverage.pick_spreadsheet + coverage.pick_override,
        coverage.reconciled_matches,
        coverage.pick_override
    );

    if let Some(path) = path_arg(&args, "--coverage-xlsx") {
        let report = coverage_export::export_coverage(&conn, &path)?;
        println!(
            "Coverage workbook: {} ({} matches, {} players, {} unresolved)",
            path.display(),
            report.matches,
            report.players,
            report.unresolved
        );
    }

    Ok(())
}

fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!("  errors: {}", errors.len());
    for err in errors.iter().take(6) {
        println!("   - {err}");
    }
}

fn flag_arg(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

fn path_arg(args: &[String], name: &str) -> Option<PathBuf> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
