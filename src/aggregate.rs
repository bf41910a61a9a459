use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::info;

/// Recompute every player's career aggregates from the performance table.
///
/// Total and idempotent: each run fully supersedes the previous values.
/// Batting average is total runs over innings with runs scored, not over
/// dismissals; that simplification is part of the stored contract and the
/// reporting layer documents it the same way.
pub fn update_player_statistics(conn: &Connection) -> Result<usize> {
    let changed = conn
        .execute(
            r#"
            UPDATE players SET
                matches_played = (
                    SELECT COUNT(DISTINCT match_id)
                    FROM player_match_performance
                    WHERE player_id = players.player_id
                ),
                runs_scored = (
                    SELECT COALESCE(SUM(runs_scored), 0)
                    FROM player_match_performance
                    WHERE player_id = players.player_id
                ),
                wickets_taken = (
                    SELECT COALESCE(SUM(wickets_taken), 0)
                    FROM player_match_performance
                    WHERE player_id = players.player_id
                ),
                batting_average = (
                    SELECT CASE
                        WHEN COUNT(*) > 0
                            THEN ROUND(CAST(SUM(runs_scored) AS REAL) / COUNT(*), 2)
                        ELSE 0.0
                    END
                    FROM player_match_performance
                    WHERE player_id = players.player_id AND runs_scored > 0
                ),
                strike_rate = (
                    SELECT CASE
                        WHEN SUM(balls_faced) > 0
                            THEN ROUND(CAST(SUM(runs_scored) AS REAL) * 100 / SUM(balls_faced), 2)
                        ELSE 0.0
                    END
                    FROM player_match_performance
                    WHERE player_id = players.player_id AND balls_faced > 0
                ),
                updated_at = CURRENT_TIMESTAMP
            "#,
            [],
        )
        .context("update player statistics")?;
    info!(players = changed, "player statistics recomputed");
    Ok(changed)
}

/// Recompute per-team win/loss counts from completed matches.
///
/// One row per team, fully replaced on every run.
pub fn update_team_statistics(conn: &Connection) -> Result<usize> {
    let teams: Vec<i64> = {
        let mut stmt = conn
            .prepare("SELECT team_id FROM teams")
            .context("prepare team list")?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .context("query team list")?;
        rows.collect::<Result<_, _>>().context("decode team ids")?
    };

    for team_id in &teams {
        let (played, won): (i64, Option<i64>) = conn
            .query_row(
                r#"
                SELECT
                    COUNT(*),
                    SUM(CASE WHEN match_winner_id = ?1 THEN 1 ELSE 0 END)
                FROM matches
                WHERE (team1_id = ?1 OR team2_id = ?1) AND match_status = 'Completed'
                "#,
                params![team_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .with_context(|| format!("count matches for team {team_id}"))?;
        let won = won.unwrap_or(0);
        let lost = played - won;

        conn.execute(
            "INSERT OR REPLACE INTO team_statistics (
                team_id, matches_played, matches_won, matches_lost, updated_at
             ) VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)",
            params![team_id, played, won, lost],
        )
        .with_context(|| format!("store statistics for team {team_id}"))?;
    }

    info!(teams = teams.len(), "team statistics recomputed");
    Ok(teams.len())
}
