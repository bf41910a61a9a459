use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, params};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ApiClient, FetchStats};
use crate::match_ingest::{as_f64_any, as_i64_any, pick_string};
use crate::player_id::resolve_player_id;

#[derive(Debug, Clone, Default)]
pub struct ScorecardIngestSummary {
    pub matches_processed: usize,
    pub performances_stored: usize,
    pub players_stored: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PendingMatch {
    pub match_id: i64,
    pub match_desc: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScorecardCounts {
    pub performances: usize,
    pub new_players: usize,
}

/// Matches with no performance rows yet, newest first.
///
/// The limit is deliberate backpressure: the upstream quota is small, so
/// each run drains only a handful of scorecards and later runs pick up
/// the rest.
pub fn matches_missing_scorecards(conn: &Connection, limit: usize) -> Result<Vec<PendingMatch>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT DISTINCT m.match_id, m.match_desc
            FROM matches m
            LEFT JOIN player_match_performance pmp ON m.match_id = pmp.match_id
            WHERE pmp.match_id IS NULL
            ORDER BY m.match_date DESC
            LIMIT ?1
            "#,
        )
        .context("prepare scorecard backlog query")?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(PendingMatch {
                match_id: row.get(0)?,
                match_desc: row.get(1)?,
            })
        })
        .context("query scorecard backlog")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode backlog row")?);
    }
    Ok(out)
}

/// Fetch and store scorecards for the current backlog.
///
/// A failure on one match (fetch or store) is recorded and the batch
/// moves on; rows already written for that match stay in the transaction
/// and are committed with everything else at the end.
pub fn ingest_scorecards(
    conn: &mut Connection,
    client: &ApiClient<'_>,
    stats: &mut FetchStats,
    limit: usize,
) -> Result<ScorecardIngestSummary> {
    let mut summary = ScorecardIngestSummary::default();
    let pending = matches_missing_scorecards(conn, limit)?;
    if pending.is_empty() {
        info!("no matches waiting for scorecards");
        return Ok(summary);
    }

    let tx = conn.transaction().context("begin scorecard transaction")?;
    for m in &pending {
        let desc = m.match_desc.as_deref().unwrap_or("unknown match");
        let payload = match client.match_scorecard(m.match_id, stats) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(match_id = m.match_id, %err, "scorecard fetch failed");
                summary.errors.push(format!("fetch {}: {err}", m.match_id));
                continue;
            }
        };
        match store_scorecard(&tx, m.match_id, &payload) {
            Ok(counts) => {
                summary.matches_processed += 1;
                summary.performances_stored += counts.performances;
                summary.players_stored += counts.new_players;
                info!(
                    match_id = m.match_id,
                    desc,
                    performances = counts.performances,
                    "scorecard stored"
                );
            }
            Err(err) => {
                warn!(match_id = m.match_id, %err, "scorecard store failed");
                summary.errors.push(format!("store {}: {err}", m.match_id));
            }
        }
    }
    tx.commit().context("commit scorecard transaction")?;
    Ok(summary)
}

/// Normalize one match's scorecard payload into player and performance rows.
///
/// Innings are numbered from 1 in payload order. Batting entries merge
/// their columns onto the `(match, player, innings)` row via upsert;
/// bowling entries establish the row first and then apply their columns
/// with a plain update, so a player who bats and bowls in the same
/// innings ends up with one fully populated row either way.
pub fn store_scorecard(
    tx: &Transaction<'_>,
    match_id: i64,
    payload: &Value,
) -> Result<ScorecardCounts> {
    let mut counts = ScorecardCounts::default();
    let Some(innings_list) = payload.get("scoreCard").and_then(|v| v.as_array()) else {
        return Ok(counts);
    };

    for (idx, innings) in innings_list.iter().enumerate() {
        let innings_number = (idx + 1) as i64;

        if let Some(bat_details) = innings.get("batTeamDetails") {
            let bat_team_id = bat_details.get("batTeamId").and_then(as_i64_any);
            if let Some(batsmen) = bat_details.get("batsmenData").and_then(|v| v.as_object()) {
                for (player_key, data) in batsmen {
                    if !data.is_object() {
                        continue;
                    }
                    store_batting_entry(
                        tx,
                        match_id,
                        innings_number,
                        bat_team_id,
                        player_key,
                        data,
                        &mut counts,
                    )?;
                }
            }
        }

        if let Some(bowl_details) = innings.get("bowlTeamDetails") {
            let bowl_team_id = bowl_details.get("bowlTeamId").and_then(as_i64_any);
            if let Some(bowlers) = bowl_details.get("bowlersData").and_then(|v| v.as_object()) {
                for (player_key, data) in bowlers {
                    if !data.is_object() {
                        continue;
                    }
                    store_bowling_entry(
                        tx,
                        match_id,
                        innings_number,
                        bowl_team_id,
                        player_key,
                        data,
                        &mut counts,
                    )?;
                }
            }
        }
    }

    Ok(counts)
}

fn store_batting_entry(
    tx: &Transaction<'_>,
    match_id: i64,
    innings_number: i64,
    team_id: Option<i64>,
    player_key: &str,
    data: &Value,
    counts: &mut ScorecardCounts,
) -> Result<()> {
    let name =
        pick_string(data, "batName").unwrap_or_else(|| format!("Player_{player_key}"));
    let player_id = resolve_player_id(player_key, &name, team_id.unwrap_or(0));

    let inserted = tx
        .execute(
            "INSERT OR IGNORE INTO players (player_id, player_name, team_id, role, player_key)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![player_id, name, team_id, "Batsman", player_key],
        )
        .with_context(|| format!("store batter {name}"))?;
    counts.new_players += inserted;

    // Upsert-merge on the performance triple: only batting columns move,
    // bowling columns written earlier in the same innings stay intact.
    tx.execute(
        r#"
        INSERT INTO player_match_performance (
            player_id, match_id, team_id, innings_number,
            batting_order, runs_scored, balls_faced,
            strike_rate, fours, sixes, out_desc, player_key
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(match_id, player_id, innings_number) DO UPDATE SET
            runs_scored = excluded.runs_scored,
            balls_faced = excluded.balls_faced,
            strike_rate = excluded.strike_rate,
            fours       = excluded.fours,
            sixes       = excluded.sixes,
            out_desc    = excluded.out_desc
        "#,
        params![
            player_id,
            match_id,
            team_id,
            innings_number,
            data.get("batOrder").and_then(as_i64_any).unwrap_or(0),
            data.get("runs").and_then(as_i64_any).unwrap_or(0),
            data.get("balls").and_then(as_i64_any).unwrap_or(0),
            data.get("strikeRate").and_then(as_f64_any).unwrap_or(0.0),
            data.get("fours").and_then(as_i64_any).unwrap_or(0),
            data.get("sixes").and_then(as_i64_any).unwrap_or(0),
            pick_string(data, "outDesc").unwrap_or_default(),
            player_key,
        ],
    )
    .with_context(|| format!("store batting performance for {name}"))?;
    counts.performances += 1;
    Ok(())
}

fn store_bowling_entry(
    tx: &Transaction<'_>,
    match_id: i64,
    innings_number: i64,
    team_id: Option<i64>,
    player_key: &str,
    data: &Value,
    counts: &mut ScorecardCounts,
) -> Result<()> {
    let name =
        pick_string(data, "bowlName").unwrap_or_else(|| format!("Bowler_{player_key}"));
    let player_id = resolve_player_id(player_key, &name, team_id.unwrap_or(0));

    let inserted = tx
        .execute(
            "INSERT OR IGNORE INTO players (player_id, player_name, team_id, role, player_key)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![player_id, name, team_id, "Bowler", player_key],
        )
        .with_context(|| format!("store bowler {name}"))?;
    counts.new_players += inserted;

    // Establish the triple first, then apply only the bowling columns;
    // a batting row written earlier keeps its batting side untouched.
    tx.execute(
        "INSERT OR IGNORE INTO player_match_performance (
            player_id, match_id, team_id, innings_number, player_key
         ) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![player_id, match_id, team_id, innings_number, player_key],
    )
    .with_context(|| format!("seed bowling performance for {name}"))?;

    tx.execute(
        "UPDATE player_match_performance
         SET overs_bowled = ?1, wickets_taken = ?2, runs_conceded = ?3,
             economy_rate = ?4, maidens = ?5
         WHERE player_id = ?6 AND match_id = ?7 AND innings_number = ?8",
        params![
            data.get("overs").and_then(as_f64_any).unwrap_or(0.0),
            data.get("wickets").and_then(as_i64_any).unwrap_or(0),
            data.get("runs").and_then(as_i64_any).unwrap_or(0),
            data.get("economy").and_then(as_f64_any).unwrap_or(0.0),
            data.get("maidens").and_then(as_i64_any).unwrap_or(0),
            player_id,
            match_id,
            innings_number,
        ],
    )
    .with_context(|| format!("store bowling performance for {name}"))?;
    counts.performances += 1;
    Ok(())
}
