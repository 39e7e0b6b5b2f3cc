use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;

use bracket_ledger::bracket::{BracketSource, HttpBracketClient};
use bracket_ledger::config::ReconcileConfig;
use bracket_ledger::overrides::{self, OverrideIssue, OverrideTable, SheetOverrideTable};
use bracket_ledger::store;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut cfg = ReconcileConfig::from_env();
    if let Some(path) = parse_db_path_arg() {
        cfg.db_path = Some(path);
    }
    let db_path = cfg.db_path.clone().context("unable to resolve sqlite path")?;
    let conn = store::open_db(&db_path)?;

    let mut known = store::known_external_ids(&conn)?;
    if let Some(tournament) = cfg.tournament_id.as_deref() {
        let bracket =
            HttpBracketClient::new(cfg.bracket_api_base.clone(), cfg.bracket_api_key.clone());
        match bracket.list_matches(tournament) {
            Ok(matches) => known.extend(matches.iter().map(|m| m.match_external_id)),
            Err(err) => warn!("bracket match list unavailable, checking against the store only: {err:#}"),
        }
    }

    let mut player_overrides = OverrideTable::load(&cfg.overrides_path);
    let mut sheet_overrides = SheetOverrideTable::load(&cfg.sheet_overrides_path);
    let player_total = player_overrides.len();
    let sheet_total = sheet_overrides.len();
    player_overrides.retain_known(&known);
    sheet_overrides.retain_known(&known);

    println!("Override check");
    println!("DB: {}", db_path.display());
    println!("Known match ids: {}", known.len());
    println!(
        "Player overrides ({}): {} usable of {}",
        cfg.overrides_path.display(),
        player_overrides.len(),
        player_total
    );
    print_issues(player_overrides.issues());
    println!(
        "Sheet overrides ({}): {} usable of {}",
        cfg.sheet_overrides_path.display(),
        sheet_overrides.len(),
        sheet_total
    );
    print_issues(sheet_overrides.issues());

    let unresolved = store::load_unresolved(&conn)?;
    println!("Unresolved players in store: {}", unresolved.len());
    if std::env::args().any(|arg| arg == "--skeleton") && !unresolved.is_empty() {
        let skeleton = overrides::unresolved_skeleton(&unresolved);
        println!(
            "{}",
            serde_json::to_string_pretty(&skeleton).context("render override skeleton")?
        );
    }

    Ok(())
}

fn print_issues(issues: &[OverrideIssue]) {
    for issue in issues {
        println!(
            "   - {}/{}: {}",
            issue.key,
            issue.display_name.as_deref().unwrap_or("*"),
            issue.problem
        );
    }
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
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
