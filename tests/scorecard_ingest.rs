use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;
use serde_json::{Value, json};

use cricstats::player_id::resolve_player_id;
use cricstats::schema;
use cricstats::scorecard_ingest::{matches_missing_scorecards, store_scorecard};

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid json")
}

fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    schema::init_schema(&conn).expect("init schema");
    conn
}

fn apply_scorecard(conn: &mut Connection, match_id: i64, payload: &Value) -> usize {
    let tx = conn.transaction().expect("begin transaction");
    let counts = store_scorecard(&tx, match_id, payload).expect("store scorecard");
    tx.commit().expect("commit");
    counts.performances
}

fn seed_parents(conn: &Connection, team_ids: &[i64], match_id: i64) {
    for team_id in team_ids {
        conn.execute(
            "INSERT INTO teams (team_id, team_name) VALUES (?1, 'Team ' || ?1)",
            [team_id],
        )
        .expect("seed team");
    }
    conn.execute("INSERT INTO matches (match_id) VALUES (?1)", [match_id])
        .expect("seed match");
}

#[test]
fn fixture_scorecard_populates_players_and_performances() {
    let mut conn = test_conn();
    seed_parents(&conn, &[10, 20], 501);
    let payload = read_fixture("scorecard.json");
    let performances = apply_scorecard(&mut conn, 501, &payload);

    // 3 batting entries + 2 bowling entries; the non-object map value is
    // skipped. Jadeja's innings-2 bowling row is distinct from his
    // innings-1 batting row.
    assert_eq!(performances, 5);
    let row_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM player_match_performance", [], |r| {
            r.get(0)
        })
        .expect("count");
    assert_eq!(row_count, 5);

    let player_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM players", [], |r| r.get(0))
        .expect("count players");
    assert_eq!(player_count, 4);

    // Jadeja batted before he bowled, so his identity row keeps the
    // batting role (insert-if-absent, first writer wins).
    let jadeja = resolve_player_id("bat_jadeja", "Ravindra Jadeja", 10);
    let role: String = conn
        .query_row(
            "SELECT role FROM players WHERE player_id = ?1",
            [jadeja],
            |r| r.get(0),
        )
        .expect("jadeja role");
    assert_eq!(role, "Batsman");

    let (bat_runs, bowl_wickets): (i64, i64) = conn
        .query_row(
            "SELECT
                (SELECT runs_scored FROM player_match_performance
                 WHERE player_id = ?1 AND innings_number = 1),
                (SELECT wickets_taken FROM player_match_performance
                 WHERE player_id = ?1 AND innings_number = 2)",
            [jadeja],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .expect("jadeja rows");
    assert_eq!(bat_runs, 30);
    assert_eq!(bowl_wickets, 3);
}

#[test]
fn batting_then_bowling_merges_into_one_row() {
    let mut conn = test_conn();
    seed_parents(&conn, &[10], 600);
    // One innings where the same key appears in both blocks.
    let payload = json!({
        "scoreCard": [{
            "batTeamDetails": {
                "batTeamId": 10,
                "batsmenData": {
                    "allrounder": {
                        "batName": "Hardik Pandya",
                        "batOrder": 6, "runs": 45, "balls": 30,
                        "strikeRate": 150.0, "fours": 4, "sixes": 2,
                        "outDesc": "b Starc"
                    }
                }
            },
            "bowlTeamDetails": {
                "bowlTeamId": 10,
                "bowlersData": {
                    "allrounder": {
                        "bowlName": "Hardik Pandya",
                        "overs": 8.0, "wickets": 2, "runs": 38,
                        "economy": 4.75, "maidens": 0
                    }
                }
            }
        }]
    });
    apply_scorecard(&mut conn, 600, &payload);
    assert_merged_row(&conn, 600);
}

#[test]
fn bowling_then_batting_merges_into_one_row() {
    let mut conn = test_conn();
    seed_parents(&conn, &[10], 600);
    let bowling_only = json!({
        "scoreCard": [{
            "bowlTeamDetails": {
                "bowlTeamId": 10,
                "bowlersData": {
                    "allrounder": {
                        "bowlName": "Hardik Pandya",
                        "overs": 8.0, "wickets": 2, "runs": 38,
                        "economy": 4.75, "maidens": 0
                    }
                }
            }
        }]
    });
    let batting_only = json!({
        "scoreCard": [{
            "batTeamDetails": {
                "batTeamId": 10,
                "batsmenData": {
                    "allrounder": {
                        "batName": "Hardik Pandya",
                        "batOrder": 6, "runs": 45, "balls": 30,
                        "strikeRate": 150.0, "fours": 4, "sixes": 2,
                        "outDesc": "b Starc"
                    }
                }
            }
        }]
    });
    apply_scorecard(&mut conn, 600, &bowling_only);
    apply_scorecard(&mut conn, 600, &batting_only);
    assert_merged_row(&conn, 600);
}

fn assert_merged_row(conn: &Connection, match_id: i64) {
    let player = resolve_player_id("allrounder", "Hardik Pandya", 10);
    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM player_match_performance
             WHERE match_id = ?1 AND player_id = ?2 AND innings_number = 1",
            [match_id, player],
            |r| r.get(0),
        )
        .expect("row count for triple");
    assert_eq!(rows, 1, "expected exactly one row for the performance triple");

    let (runs, balls, wickets, conceded): (i64, i64, i64, i64) = conn
        .query_row(
            "SELECT runs_scored, balls_faced, wickets_taken, runs_conceded
             FROM player_match_performance
             WHERE match_id = ?1 AND player_id = ?2 AND innings_number = 1",
            [match_id, player],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .expect("merged row");
    assert_eq!(runs, 45);
    assert_eq!(balls, 30);
    assert_eq!(wickets, 2);
    assert_eq!(conceded, 38);
}

#[test]
fn missing_scorecard_key_stores_nothing() {
    let mut conn = test_conn();
    let performances = apply_scorecard(&mut conn, 700, &json!({"matchHeader": {}}));
    assert_eq!(performances, 0);
}

#[test]
fn backlog_prefers_recent_matches_without_performances() {
    let mut conn = test_conn();
    conn.execute_batch(
        r#"
        INSERT INTO matches (match_id, match_desc, match_date) VALUES (1, 'old', '2024-01-01');
        INSERT INTO matches (match_id, match_desc, match_date) VALUES (2, 'mid', '2024-05-01');
        INSERT INTO matches (match_id, match_desc, match_date) VALUES (3, 'new', '2024-09-01');
        INSERT INTO players (player_id, player_name) VALUES (42, 'Seeded Player');
        INSERT INTO player_match_performance (player_id, match_id, innings_number)
            VALUES (42, 2, 1);
        "#,
    )
    .expect("seed matches");

    let pending = matches_missing_scorecards(&conn, 10).expect("backlog");
    let ids: Vec<i64> = pending.iter().map(|m| m.match_id).collect();
    // Match 2 already has a performance row; newest first.
    assert_eq!(ids, vec![3, 1]);

    let limited = matches_missing_scorecards(&conn, 1).expect("bounded backlog");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].match_id, 3);
}
