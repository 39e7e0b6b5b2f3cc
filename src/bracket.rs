use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::Url;
use serde_json::Value;

use crate::http_client::fetch_text;
use crate::ids::{CompetitorId, MatchExternalId};
use crate::model::Competitor;

pub const DEFAULT_BRACKET_API_BASE: &str = "https://api.challonge.com/v1";

/// One match as the bracket service schedules it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketMatch {
    pub match_external_id: MatchExternalId,
    /// Positive for winners-bracket rounds, negative for losers-bracket rounds.
    pub round: i32,
    pub competitors: Vec<CompetitorId>,
}

pub trait BracketSource {
    fn list_matches(&self, tournament_id: &str) -> Result<Vec<BracketMatch>>;
    fn list_participants(&self, tournament_id: &str) -> Result<Vec<Competitor>>;
}

#[derive(Debug, Clone)]
pub struct HttpBracketClient {
    base_url: String,
    api_key: Option<String>,
}

impl HttpBracketClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self, tournament_id: &str, resource: &str) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/"))
            .with_context(|| format!("invalid bracket api base {base:?}"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("bracket api base {base:?} cannot take a path"))?
            .pop_if_empty()
            .push("tournaments")
            .push(tournament_id)
            .push(&format!("{resource}.json"));
        if let Some(key) = self.api_key.as_deref() {
            url.query_pairs_mut().append_pair("api_key", key);
        }
        Ok(url)
    }
}

impl BracketSource for HttpBracketClient {
    fn list_matches(&self, tournament_id: &str) -> Result<Vec<BracketMatch>> {
        let url = self.endpoint(tournament_id, "matches")?;
        let body = fetch_text(url).context("bracket match list")?;
        parse_matches_json(&body)
    }

    fn list_participants(&self, tournament_id: &str) -> Result<Vec<Competitor>> {
        let url = self.endpoint(tournament_id, "participants")?;
        let body = fetch_text(url).context("bracket participant list")?;
        parse_participants_json(&body)
    }
}

/// Accepts both `[{"match": {...}}]` and bare `[{...}]` listings.
pub fn parse_matches_json(raw: &str) -> Result<Vec<BracketMatch>> {
    let items = parse_listing(raw, "match")?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(id) = item.get("id").and_then(as_u64) else {
            debug!("bracket match without id skipped: {item}");
            continue;
        };
        let Some(round) = item
            .get("round")
            .and_then(as_i64)
            .and_then(|r| i32::try_from(r).ok())
        else {
            debug!("bracket match {id} without round skipped");
            continue;
        };
        let competitors = ["player1_id", "player2_id"]
            .iter()
            .filter_map(|key| item.get(*key).and_then(as_u64))
            .map(CompetitorId::new)
            .collect();
        out.push(BracketMatch {
            match_external_id: MatchExternalId::new(id),
            round,
            competitors,
        });
    }
    Ok(out)
}

pub fn parse_participants_json(raw: &str) -> Result<Vec<Competitor>> {
    let items = parse_listing(raw, "participant")?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(id) = item.get("id").and_then(as_u64) else {
            continue;
        };
        let name = ["name", "display_name", "username"]
            .iter()
            .filter_map(|key| item.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|s| !s.is_empty());
        let Some(name) = name else {
            debug!("participant {id} has no usable name");
            continue;
        };
        out.push(Competitor {
            competitor_id: CompetitorId::new(id),
            canonical_name: name.to_string(),
        });
    }
    Ok(out)
}

fn parse_listing(raw: &str, wrapper: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid bracket json")?;
    let Value::Array(items) = root else {
        return Err(anyhow!("bracket listing is not an array"));
    };
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Object(mut obj) if obj.len() == 1 && obj.contains_key(wrapper) => {
                obj.remove(wrapper).unwrap_or(Value::Null)
            }
            other => other,
        })
        .filter(|item| item.is_object())
        .collect())
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
