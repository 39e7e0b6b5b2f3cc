use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::bracket::DEFAULT_BRACKET_API_BASE;
use crate::sheet::DEFAULT_SHEETS_API_BASE;
use crate::store;

const DEFAULT_OVERRIDES_PATH: &str = "overrides.json";
const DEFAULT_SHEET_OVERRIDES_PATH: &str = "sheet_overrides.json";
const DEFAULT_SHEET_RANGE: &str = "Draft!A1:J400";

/// Settings for one pipeline run, read from the environment (and `.env`
/// files loaded by the binaries). CLI flags override individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub bracket_api_base: String,
    pub bracket_api_key: Option<String>,
    pub tournament_id: Option<String>,
    pub sheets_api_base: String,
    pub sheets_api_key: Option<String>,
    pub draft_sheet_id: Option<String>,
    pub draft_sheet_range: String,
    pub overrides_path: PathBuf,
    pub sheet_overrides_path: PathBuf,
    pub db_path: Option<PathBuf>,
    pub rows_dir: Option<PathBuf>,
}

impl ReconcileConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading through `get`.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| {
            get(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let base = |key: &str, default: &str| {
            text(key)
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };

        Self {
            bracket_api_base: base("BRACKET_API_BASE", DEFAULT_BRACKET_API_BASE),
            bracket_api_key: text("BRACKET_API_KEY"),
            tournament_id: text("TOURNAMENT_ID"),
            sheets_api_base: base("SHEETS_API_BASE", DEFAULT_SHEETS_API_BASE),
            sheets_api_key: text("SHEETS_API_KEY"),
            draft_sheet_id: text("DRAFT_SHEET_ID"),
            draft_sheet_range: text("DRAFT_SHEET_RANGE")
                .unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            overrides_path: text("OVERRIDES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OVERRIDES_PATH)),
            sheet_overrides_path: text("SHEET_OVERRIDES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SHEET_OVERRIDES_PATH)),
            db_path: text("LEDGER_DB_PATH")
                .map(PathBuf::from)
                .or_else(store::default_db_path),
            rows_dir: text("SAVE_ROWS_DIR").map(PathBuf::from),
        }
    }

    /// The directory a rebuild re-imports from. A reset with nothing to
    /// re-import would leave the store empty, so that is refused up front.
    pub fn rebuild_rows_dir(&self) -> Result<&Path> {
        let dir = self
            .rows_dir
            .as_deref()
            .context("--rebuild needs --rows or SAVE_ROWS_DIR to re-import from")?;
        if !dir.is_dir() {
            bail!("--rebuild rows directory {} does not exist", dir.display());
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> ReconcileConfig {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        ReconcileConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config_from(&[
            ("BRACKET_API_BASE", "https://bracket.test/v1/"),
            ("BRACKET_API_KEY", "   "),
            ("TOURNAMENT_ID", " spring-cup "),
            ("LEDGER_DB_PATH", "/tmp/ledger.sqlite"),
        ]);
        assert_eq!(cfg.bracket_api_base, "https://bracket.test/v1");
        assert_eq!(cfg.bracket_api_key, None);
        assert_eq!(cfg.tournament_id.as_deref(), Some("spring-cup"));
        assert_eq!(cfg.sheets_api_base, DEFAULT_SHEETS_API_BASE);
        assert_eq!(cfg.draft_sheet_range, DEFAULT_SHEET_RANGE);
        assert_eq!(cfg.overrides_path, PathBuf::from("overrides.json"));
        assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/ledger.sqlite")));
        assert_eq!(cfg.rows_dir, None);
    }

    #[test]
    fn rebuild_requires_an_existing_rows_dir() {
        let cfg = config_from(&[]);
        let err = cfg.rebuild_rows_dir().expect_err("no rows dir configured");
        assert!(err.to_string().contains("SAVE_ROWS_DIR"));

        let missing = config_from(&[("SAVE_ROWS_DIR", "/nonexistent/bracket-ledger-rows")]);
        assert!(missing.rebuild_rows_dir().is_err());

        let rows = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/rows");
        let cfg = config_from(&[("SAVE_ROWS_DIR", rows)]);
        assert_eq!(cfg.rebuild_rows_dir().expect("rows dir"), Path::new(rows));
    }
}
