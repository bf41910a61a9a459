use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://cricbuzz-cricket.p.rapidapi.com";
const DEFAULT_API_HOST: &str = "cricbuzz-cricket.p.rapidapi.com";
const DEFAULT_DB_PATH: &str = "data/cricstats.db";

const DEFAULT_REQUEST_DELAY_MS: u64 = 1_000;
const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_SCORECARD_BATCH: usize = 3;

/// Runtime configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub api_host: String,
    pub base_url: String,
    pub db_path: PathBuf,
    /// Mandatory pause before every outbound call.
    pub request_delay: Duration,
    /// Blocking wait after an HTTP 429 before the single retry.
    pub rate_limit_cooldown: Duration,
    /// Upper bound on scorecards fetched per run; the upstream quota is
    /// small, so the backlog drains a few matches at a time.
    pub scorecard_batch: usize,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("CRICKET_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let api_host = env::var("CRICKET_API_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        let base_url = env::var("CRICKET_API_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let db_path = env::var("CRICKET_DB_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let request_delay_ms = env::var("CRICKET_REQUEST_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_DELAY_MS)
            .clamp(0, 10_000);
        let cooldown_secs = env::var("CRICKET_RATE_LIMIT_COOLDOWN_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN_SECS)
            .clamp(1, 600);
        let scorecard_batch = env::var("CRICKET_SCORECARD_BATCH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_SCORECARD_BATCH)
            .clamp(1, 50);

        Self {
            api_key,
            api_host,
            base_url,
            db_path,
            request_delay: Duration::from_millis(request_delay_ms),
            rate_limit_cooldown: Duration::from_secs(cooldown_secs),
            scorecard_batch,
        }
    }
}
