use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::Value;
use rust_xlsxwriter::Workbook;
use tracing::warn;

use crate::db::{self, QueryTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

/// A named, parameterless analytical query over the normalized schema.
pub struct CannedQuery {
    pub title: &'static str,
    pub difficulty: Difficulty,
    pub description: &'static str,
    pub sql: &'static str,
}

pub const CANNED_QUERIES: &[CannedQuery] = &[
    CannedQuery {
        title: "Top run scorers",
        difficulty: Difficulty::Beginner,
        description: "Highest career run totals with average and matches played.",
        sql: "SELECT player_name, runs_scored, batting_average, matches_played
FROM players
ORDER BY runs_scored DESC
LIMIT 10",
    },
    CannedQuery {
        title: "Team information",
        difficulty: Difficulty::Beginner,
        description: "All teams with short name and resolved country.",
        sql: "SELECT team_name, team_sname, country
FROM teams
ORDER BY team_name",
    },
    CannedQuery {
        title: "Players by role",
        difficulty: Difficulty::Beginner,
        description: "Player count per stored role.",
        sql: "SELECT role, COUNT(*) AS player_count
FROM players
WHERE role IS NOT NULL AND role != ''
GROUP BY role
ORDER BY player_count DESC",
    },
    CannedQuery {
        title: "Recent matches",
        difficulty: Difficulty::Beginner,
        description: "Latest matches with format, date and status.",
        sql: "SELECT match_desc, match_format, match_date, match_status
FROM matches
ORDER BY match_date DESC
LIMIT 10",
    },
    CannedQuery {
        title: "Team match results",
        difficulty: Difficulty::Intermediate,
        description: "Match results with team names resolved via joins.",
        sql: "SELECT m.match_desc, t1.team_name AS team1, t2.team_name AS team2,
       tw.team_name AS winner, m.victory_margin, m.victory_type
FROM matches m
JOIN teams t1 ON m.team1_id = t1.team_id
JOIN teams t2 ON m.team2_id = t2.team_id
LEFT JOIN teams tw ON m.match_winner_id = tw.team_id
ORDER BY m.match_date DESC",
    },
    CannedQuery {
        title: "Player performance summary",
        difficulty: Difficulty::Intermediate,
        description: "Runs and wickets per player across all recorded innings.",
        sql: "SELECT p.player_name,
       SUM(pmp.runs_scored) AS total_match_runs,
       SUM(pmp.wickets_taken) AS total_match_wickets,
       COUNT(pmp.match_id) AS innings_recorded
FROM players p
JOIN player_match_performance pmp ON p.player_id = pmp.player_id
GROUP BY p.player_id, p.player_name
ORDER BY total_match_runs DESC",
    },
    CannedQuery {
        title: "Venue match count",
        difficulty: Difficulty::Intermediate,
        description: "How many matches each venue hosted.",
        sql: "SELECT v.venue_name, v.city, v.country, COUNT(m.match_id) AS matches_played
FROM venues v
LEFT JOIN matches m ON v.venue_id = m.venue_id
GROUP BY v.venue_id, v.venue_name, v.city, v.country
ORDER BY matches_played DESC",
    },
    CannedQuery {
        title: "High scoring innings",
        difficulty: Difficulty::Intermediate,
        description: "Innings of fifty or more runs with strike rate.",
        sql: "SELECT p.player_name, pmp.runs_scored, pmp.balls_faced, pmp.strike_rate, m.match_desc
FROM player_match_performance pmp
JOIN players p ON pmp.player_id = p.player_id
JOIN matches m ON pmp.match_id = m.match_id
WHERE pmp.runs_scored >= 50
ORDER BY pmp.runs_scored DESC",
    },
    CannedQuery {
        title: "Toss advantage",
        difficulty: Difficulty::Advanced,
        description: "How often the toss winner also won the match, per toss decision.",
        sql: "SELECT m.toss_decision,
       COUNT(*) AS total_matches,
       SUM(CASE WHEN m.toss_winner_id = m.match_winner_id THEN 1 ELSE 0 END) AS toss_winner_won,
       ROUND(100.0 * SUM(CASE WHEN m.toss_winner_id = m.match_winner_id THEN 1 ELSE 0 END)
             / COUNT(*), 2) AS win_percentage
FROM matches m
WHERE m.toss_winner_id IS NOT NULL AND m.match_winner_id IS NOT NULL
GROUP BY m.toss_decision
ORDER BY win_percentage DESC",
    },
    CannedQuery {
        title: "Match format comparison",
        difficulty: Difficulty::Advanced,
        description: "Average runs and strike rate per innings by match format.",
        sql: "SELECT m.match_format,
       AVG(pmp.runs_scored) AS avg_runs_per_innings,
       AVG(pmp.strike_rate) AS avg_strike_rate,
       COUNT(DISTINCT pmp.match_id) AS total_matches
FROM matches m
JOIN player_match_performance pmp ON m.match_id = pmp.match_id
WHERE pmp.runs_scored > 0
GROUP BY m.match_format
ORDER BY avg_runs_per_innings DESC",
    },
    CannedQuery {
        title: "Player impact",
        difficulty: Difficulty::Advanced,
        description: "Combined runs-and-wickets impact score, top ten.",
        sql: "SELECT p.player_name,
       SUM(pmp.runs_scored) AS total_runs,
       SUM(pmp.wickets_taken) AS total_wickets,
       (SUM(pmp.runs_scored) + SUM(pmp.wickets_taken) * 25) AS impact_score
FROM players p
JOIN player_match_performance pmp ON p.player_id = pmp.player_id
GROUP BY p.player_id, p.player_name
HAVING COUNT(pmp.match_id) >= 1
ORDER BY impact_score DESC
LIMIT 10",
    },
];

pub fn find_query(title: &str) -> Option<&'static CannedQuery> {
    CANNED_QUERIES
        .iter()
        .find(|q| q.title.eq_ignore_ascii_case(title.trim()))
}

pub fn run_canned_query(conn: &Connection, query: &CannedQuery) -> Result<QueryTable> {
    db::query_table(conn, query.sql, &[])
        .with_context(|| format!("canned query '{}'", query.title))
}

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub sheets: usize,
    pub rows: usize,
    pub errors: Vec<String>,
}

/// Write every canned query's result into one workbook, a worksheet per
/// query. A query failing at runtime is recorded and skipped; the rest of
/// the workbook still lands.
pub fn export_workbook(conn: &Connection, path: &Path) -> Result<ExportReport> {
    let mut report = ExportReport::default();
    let mut workbook = Workbook::new();

    for (idx, query) in CANNED_QUERIES.iter().enumerate() {
        let table = match run_canned_query(conn, query) {
            Ok(table) => table,
            Err(err) => {
                warn!(title = query.title, %err, "canned query failed, skipping sheet");
                report.errors.push(format!("{}: {err}", query.title));
                continue;
            }
        };

        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(sheet_name(idx, query.title))
            .context("set worksheet name")?;

        for (col, name) in table.columns.iter().enumerate() {
            worksheet
                .write(0, col as u16, name.as_str())
                .context("write header cell")?;
        }
        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                let row_num = (row_idx + 1) as u32;
                let col_num = col as u16;
                match value {
                    Value::Integer(n) => worksheet.write(row_num, col_num, *n as f64),
                    Value::Real(f) => worksheet.write(row_num, col_num, *f),
                    other => worksheet.write(row_num, col_num, db::value_to_string(other)),
                }
                .context("write data cell")?;
            }
        }

        report.sheets += 1;
        report.rows += table.rows.len();
    }

    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;
    Ok(report)
}

// Excel limits sheet names to 31 characters.
fn sheet_name(idx: usize, title: &str) -> String {
    let raw = format!("Q{} {}", idx + 1, title);
    raw.chars().take(31).collect()
}
