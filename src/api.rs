use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::warn;

use crate::config::ApiConfig;

const REQUEST_TIMEOUT_SECS: u64 = 15;

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Outbound call tallies for a single run.
///
/// Carried by the caller and folded into the run report rather than kept
/// as process-wide counters, so repeated runs never bleed into each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchStats {
    pub api_calls: u32,
    pub successful_calls: u32,
    pub failed_calls: u32,
}

#[derive(Debug, Clone)]
pub struct PlayerSearchHit {
    pub id: String,
    pub name: String,
    pub team_name: String,
    pub date_of_birth: String,
}

pub struct ApiClient<'a> {
    client: &'static Client,
    config: &'a ApiConfig,
}

impl<'a> ApiClient<'a> {
    pub fn new(config: &'a ApiConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    pub fn recent_matches(&self, stats: &mut FetchStats) -> Result<Value> {
        self.get_json("/matches/v1/recent", stats)
    }

    pub fn live_matches(&self, stats: &mut FetchStats) -> Result<Value> {
        self.get_json("/matches/v1/live", stats)
    }

    pub fn match_scorecard(&self, match_id: i64, stats: &mut FetchStats) -> Result<Value> {
        self.get_json(&format!("/mcenter/v1/{match_id}/hscard"), stats)
    }

    pub fn search_players(
        &self,
        name: &str,
        stats: &mut FetchStats,
    ) -> Result<Vec<PlayerSearchHit>> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("empty player search term"));
        }
        let encoded = trimmed.replace(' ', "%20");
        let body = self.get_json(&format!("/stats/v1/player/search?plrN={encoded}"), stats)?;
        Ok(parse_player_search(&body))
    }

    /// One authenticated GET against the upstream API.
    ///
    /// Every call is preceded by the configured delay to stay under the
    /// provider's request quota. A 429 blocks for the cooldown window and
    /// retries exactly once; every other failure surfaces immediately.
    fn get_json(&self, endpoint: &str, stats: &mut FetchStats) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut retried = false;

        loop {
            stats.api_calls += 1;
            thread::sleep(self.config.request_delay);

            let mut req = self
                .client
                .get(&url)
                .header("X-RapidAPI-Host", &self.config.api_host);
            if let Some(key) = self.config.api_key.as_deref() {
                req = req.header("X-RapidAPI-Key", key);
            }

            let resp = match req.send() {
                Ok(resp) => resp,
                Err(err) => {
                    stats.failed_calls += 1;
                    return Err(err).with_context(|| format!("request failed: {endpoint}"));
                }
            };

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS && !retried {
                stats.failed_calls += 1;
                retried = true;
                warn!(
                    endpoint,
                    cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
                    "rate limited, waiting before single retry"
                );
                thread::sleep(self.config.rate_limit_cooldown);
                continue;
            }

            let body = match resp.text() {
                Ok(body) => body,
                Err(err) => {
                    stats.failed_calls += 1;
                    return Err(err).with_context(|| format!("failed reading body: {endpoint}"));
                }
            };
            if !status.is_success() {
                stats.failed_calls += 1;
                let snippet: String = body.chars().take(120).collect();
                bail!("http {status} from {endpoint}: {snippet}");
            }

            match serde_json::from_str::<Value>(body.trim()) {
                Ok(value) => {
                    stats.successful_calls += 1;
                    return Ok(value);
                }
                Err(err) => {
                    stats.failed_calls += 1;
                    return Err(err).with_context(|| format!("invalid json from {endpoint}"));
                }
            }
        }
    }
}

fn parse_player_search(body: &Value) -> Vec<PlayerSearchHit> {
    let mut out = Vec::new();
    let Some(players) = body.get("player").and_then(|v| v.as_array()) else {
        return out;
    };
    for entry in players {
        let id = field_string(entry, "id");
        let name = field_string(entry, "name");
        if id.is_empty() || name.is_empty() {
            continue;
        }
        out.push(PlayerSearchHit {
            id,
            name,
            team_name: field_string(entry, "teamName"),
            date_of_birth: field_string(entry, "dob"),
        });
    }
    out
}

fn field_string(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_player_search;
    use serde_json::json;

    #[test]
    fn parses_search_hits() {
        let body = json!({
            "player": [
                {"id": 1413, "name": "Virat Kohli", "teamName": "India", "dob": "November 05, 1988"},
                {"id": "", "name": "nameless"},
                {"name": "keyless"},
            ]
        });
        let hits = parse_player_search(&body);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1413");
        assert_eq!(hits[0].name, "Virat Kohli");
        assert_eq!(hits[0].team_name, "India");
    }

    #[test]
    fn missing_player_list_is_empty() {
        assert!(parse_player_search(&json!({})).is_empty());
        assert!(parse_player_search(&json!(null)).is_empty());
    }
}
