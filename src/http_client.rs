use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};

const REQUEST_TIMEOUT_SECS: u64 = 20;
const AGENT: &str = concat!("bracket_ledger/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GETs `url` and returns the body of a successful response.
pub fn fetch_text(url: Url) -> Result<String> {
    let client = http_client()?;
    let shown = redact(&url);
    let resp = client
        .get(url)
        .header(USER_AGENT, AGENT)
        .header(ACCEPT, "application/json")
        .send()
        .with_context(|| format!("request failed: {shown}"))?;
    let status = resp.status();
    let body = resp
        .text()
        .with_context(|| format!("failed reading body: {shown}"))?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {shown}: {}", truncate(&body, 200)));
    }
    Ok(body)
}

// Keys travel as query parameters; keep them out of logs and errors.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" || k == "key" {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect::<Vec<_>>();
    if pairs.is_empty() {
        return shown.to_string();
    }
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

fn truncate(raw: &str, max: usize) -> &str {
    match raw.char_indices().nth(max) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}
