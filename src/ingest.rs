use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::aggregate;
use crate::api::{ApiClient, FetchStats};
use crate::config::ApiConfig;
use crate::match_ingest::{self, ListingSource};
use crate::scorecard_ingest;

/// Outcome of one full ingestion run.
///
/// Counters and errors live here, not in process globals, so repeated
/// runs (and tests) never interfere with each other.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub matches_stored: usize,
    pub live_matches_stored: usize,
    pub scorecards_processed: usize,
    pub performances_stored: usize,
    pub players_stored: usize,
    pub teams_updated: usize,
    pub api: FetchStats,
    pub errors: Vec<String>,
}

/// The full pipeline: recent listing, live listing, team-country
/// back-fill, scorecard backlog, then the derived-statistics recompute.
///
/// A failed upstream fetch means "nothing to ingest this round" for that
/// phase, never a failed run; only storage-open/schema problems abort.
/// The run is recorded in `ingest_runs` for operator inspection.
pub fn run_full_ingest(conn: &mut Connection, config: &ApiConfig) -> Result<IngestReport> {
    let client = ApiClient::new(config)?;
    let mut report = IngestReport::default();

    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs (started_at) VALUES (?1)",
        params![started_at],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    info!("fetching recent matches");
    match client.recent_matches(&mut report.api) {
        Ok(payload) => {
            match match_ingest::store_match_listing(conn, &payload, ListingSource::Recent) {
                Ok(summary) => {
                    report.matches_stored = summary.matches_stored;
                    report.errors.extend(summary.errors);
                }
                Err(err) => report.errors.push(format!("recent listing: {err}")),
            }
        }
        Err(err) => {
            warn!(%err, "recent matches unavailable, nothing to ingest this round");
            report.errors.push(format!("recent fetch: {err}"));
        }
    }

    info!("fetching live matches");
    match client.live_matches(&mut report.api) {
        Ok(payload) => {
            match match_ingest::store_match_listing(conn, &payload, ListingSource::Live) {
                Ok(summary) => {
                    report.live_matches_stored = summary.matches_stored;
                    report.errors.extend(summary.errors);
                }
                Err(err) => report.errors.push(format!("live listing: {err}")),
            }
        }
        Err(err) => {
            warn!(%err, "live matches unavailable, nothing to ingest this round");
            report.errors.push(format!("live fetch: {err}"));
        }
    }

    match match_ingest::update_team_countries(conn) {
        Ok(updated) => report.teams_updated = updated,
        Err(err) => report.errors.push(format!("team countries: {err}")),
    }

    info!(limit = config.scorecard_batch, "fetching scorecards");
    match scorecard_ingest::ingest_scorecards(
        conn,
        &client,
        &mut report.api,
        config.scorecard_batch,
    ) {
        Ok(summary) => {
            report.scorecards_processed = summary.matches_processed;
            report.performances_stored = summary.performances_stored;
            report.players_stored = summary.players_stored;
            report.errors.extend(summary.errors);
        }
        Err(err) => report.errors.push(format!("scorecards: {err}")),
    }

    if let Err(err) = aggregate::update_player_statistics(conn) {
        report.errors.push(format!("player statistics: {err}"));
    }
    if let Err(err) = aggregate::update_team_statistics(conn) {
        report.errors.push(format!("team statistics: {err}"));
    }

    finalize_run(conn, run_id, &report)?;
    Ok(report)
}

fn finalize_run(conn: &Connection, run_id: i64, report: &IngestReport) -> Result<()> {
    let finished_at = Utc::now().to_rfc3339();
    let errors_json = serde_json::to_string(&report.errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, matches_stored = ?2, performances_stored = ?3,
             api_calls = ?4, errors_json = ?5
         WHERE run_id = ?6",
        params![
            finished_at,
            (report.matches_stored + report.live_matches_stored) as i64,
            report.performances_stored as i64,
            report.api.api_calls as i64,
            errors_json,
            run_id,
        ],
    )
    .context("finalize ingest run")?;
    Ok(())
}
