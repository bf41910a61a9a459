use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Open (or create) the stats database and make sure the schema exists.
///
/// Schema creation failure is fatal to the whole run: nothing downstream
/// can work against a partially created database, so the error propagates
/// instead of being handled per table.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create-if-absent for all tables; safe to run on every startup.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;

        CREATE TABLE IF NOT EXISTS teams (
            team_id INTEGER PRIMARY KEY,
            team_name TEXT UNIQUE NOT NULL,
            team_sname TEXT,
            country TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS venues (
            venue_id INTEGER PRIMARY KEY,
            venue_name TEXT NOT NULL,
            city TEXT,
            country TEXT,
            capacity INTEGER,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS series (
            series_id INTEGER PRIMARY KEY,
            series_name TEXT NOT NULL,
            host_country TEXT,
            start_date TEXT,
            end_date TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS matches (
            match_id INTEGER PRIMARY KEY,
            match_desc TEXT,
            match_format TEXT,
            match_date TEXT,
            series_id INTEGER,
            team1_id INTEGER,
            team2_id INTEGER,
            venue_id INTEGER,
            toss_winner_id INTEGER,
            toss_decision TEXT,
            match_winner_id INTEGER,
            victory_margin INTEGER,
            victory_type TEXT,
            match_status TEXT DEFAULT 'Completed',
            created_at TEXT DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (series_id) REFERENCES series (series_id),
            FOREIGN KEY (team1_id) REFERENCES teams (team_id),
            FOREIGN KEY (team2_id) REFERENCES teams (team_id),
            FOREIGN KEY (venue_id) REFERENCES venues (venue_id),
            FOREIGN KEY (toss_winner_id) REFERENCES teams (team_id),
            FOREIGN KEY (match_winner_id) REFERENCES teams (team_id)
        );

        CREATE TABLE IF NOT EXISTS players (
            player_id INTEGER PRIMARY KEY,
            player_name TEXT NOT NULL,
            team_id INTEGER,
            role TEXT,
            batting_style TEXT,
            bowling_style TEXT,
            nationality TEXT,
            date_of_birth TEXT,
            matches_played INTEGER DEFAULT 0,
            runs_scored INTEGER DEFAULT 0,
            wickets_taken INTEGER DEFAULT 0,
            batting_average REAL DEFAULT 0.0,
            bowling_average REAL DEFAULT 0.0,
            strike_rate REAL DEFAULT 0.0,
            economy_rate REAL DEFAULT 0.0,
            player_key TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (team_id) REFERENCES teams (team_id)
        );

        CREATE TABLE IF NOT EXISTS player_match_performance (
            performance_id INTEGER PRIMARY KEY,
            player_id INTEGER,
            match_id INTEGER,
            team_id INTEGER,
            innings_number INTEGER,
            batting_order INTEGER,
            runs_scored INTEGER DEFAULT 0,
            balls_faced INTEGER DEFAULT 0,
            strike_rate REAL DEFAULT 0.0,
            fours INTEGER DEFAULT 0,
            sixes INTEGER DEFAULT 0,
            overs_bowled REAL DEFAULT 0.0,
            wickets_taken INTEGER DEFAULT 0,
            runs_conceded INTEGER DEFAULT 0,
            economy_rate REAL DEFAULT 0.0,
            maidens INTEGER DEFAULT 0,
            out_desc TEXT,
            player_key TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(match_id, player_id, innings_number),
            FOREIGN KEY (player_id) REFERENCES players (player_id),
            FOREIGN KEY (match_id) REFERENCES matches (match_id),
            FOREIGN KEY (team_id) REFERENCES teams (team_id)
        );

        -- Keyed by team so the aggregator's insert-or-replace keeps
        -- exactly one row per team across recomputations.
        CREATE TABLE IF NOT EXISTS team_statistics (
            team_id INTEGER PRIMARY KEY,
            matches_played INTEGER DEFAULT 0,
            matches_won INTEGER DEFAULT 0,
            matches_lost INTEGER DEFAULT 0,
            matches_drawn INTEGER DEFAULT 0,
            matches_tied INTEGER DEFAULT 0,
            updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (team_id) REFERENCES teams (team_id)
        );

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            matches_stored INTEGER NOT NULL DEFAULT 0,
            performances_stored INTEGER NOT NULL DEFAULT 0,
            api_calls INTEGER NOT NULL DEFAULT 0,
            errors_json TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date);
        CREATE INDEX IF NOT EXISTS idx_matches_series ON matches(series_id);
        CREATE INDEX IF NOT EXISTS idx_pmp_match ON player_match_performance(match_id);
        CREATE INDEX IF NOT EXISTS idx_pmp_player ON player_match_performance(player_id);
        CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}
