use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, Transaction, params};
use serde_json::Value;
use tracing::warn;

/// Which listing feed a payload came from. The live feed forces the
/// stored status to `Live` regardless of what the payload says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    Recent,
    Live,
}

#[derive(Debug, Clone, Default)]
pub struct MatchIngestSummary {
    pub matches_stored: usize,
    pub series_seen: usize,
    pub errors: Vec<String>,
}

/// Walk a match-listing payload and upsert teams, venues, series and
/// matches from it.
///
/// The payload nests `typeMatches -> seriesMatches -> seriesAdWrapper ->
/// matches`; any absent level is skipped silently. One bad match entry is
/// recorded and skipped, its siblings still land. The whole call is a
/// single transaction committed at the end.
pub fn store_match_listing(
    conn: &mut Connection,
    payload: &Value,
    source: ListingSource,
) -> Result<MatchIngestSummary> {
    let mut summary = MatchIngestSummary::default();
    let tx = conn.transaction().context("begin listing transaction")?;

    let type_matches = payload
        .get("typeMatches")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    for type_match in type_matches {
        let Some(series_matches) = type_match.get("seriesMatches").and_then(|v| v.as_array())
        else {
            continue;
        };
        for series_match in series_matches {
            let Some(wrapper) = series_match.get("seriesAdWrapper") else {
                continue;
            };
            let series_id = wrapper.get("seriesId").and_then(as_i64_any);
            if let Some(series_id) = series_id {
                let series_name = pick_string(wrapper, "seriesName")
                    .unwrap_or_else(|| "Unknown Series".to_string());
                if let Err(err) = tx.execute(
                    "INSERT OR IGNORE INTO series (series_id, series_name) VALUES (?1, ?2)",
                    params![series_id, series_name],
                ) {
                    warn!(series_id, %err, "skipping series");
                    summary.errors.push(format!("series {series_id}: {err}"));
                    continue;
                }
                summary.series_seen += 1;
            }

            let Some(matches) = wrapper.get("matches").and_then(|v| v.as_array()) else {
                continue;
            };
            for entry in matches {
                match store_match_entry(&tx, entry, series_id, source) {
                    Ok(()) => summary.matches_stored += 1,
                    Err(err) => {
                        warn!(%err, "skipping match entry");
                        summary.errors.push(format!("match entry: {err}"));
                    }
                }
            }
        }
    }

    tx.commit().context("commit listing transaction")?;
    Ok(summary)
}

fn store_match_entry(
    tx: &Transaction<'_>,
    entry: &Value,
    series_id: Option<i64>,
    source: ListingSource,
) -> Result<()> {
    let info = entry.get("matchInfo").unwrap_or(&Value::Null);
    let match_id = info
        .get("matchId")
        .and_then(as_i64_any)
        .ok_or_else(|| anyhow!("missing matchId"))?;

    let team1_id = store_team(tx, info.get("team1"))?;
    let team2_id = store_team(tx, info.get("team2"))?;
    let venue_id = store_venue(tx, info.get("venueInfo"))?;

    let match_date = date_from_epoch_millis(info.get("startDate"));
    let match_status = match source {
        ListingSource::Live => "Live".to_string(),
        ListingSource::Recent => {
            pick_string(info, "stateTitle").unwrap_or_else(|| "Completed".to_string())
        }
    };

    // Full-row replacement: the latest sighting of a match wins.
    tx.execute(
        r#"
        INSERT OR REPLACE INTO matches (
            match_id, match_desc, match_format, match_date, series_id,
            team1_id, team2_id, venue_id, match_status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            match_id,
            pick_string(info, "matchDesc"),
            pick_string(info, "matchFormat"),
            match_date,
            series_id,
            team1_id,
            team2_id,
            venue_id,
            match_status,
        ],
    )
    .with_context(|| format!("store match {match_id}"))?;
    Ok(())
}

fn store_team(tx: &Transaction<'_>, team: Option<&Value>) -> Result<Option<i64>> {
    let Some(team) = team else {
        return Ok(None);
    };
    let Some(team_id) = team.get("teamId").and_then(as_i64_any) else {
        return Ok(None);
    };
    let name = pick_string(team, "teamName").unwrap_or_else(|| "Unknown Team".to_string());
    tx.execute(
        "INSERT OR IGNORE INTO teams (team_id, team_name, team_sname) VALUES (?1, ?2, ?3)",
        params![team_id, name, pick_string(team, "teamSName")],
    )
    .with_context(|| format!("store team {team_id}"))?;
    Ok(Some(team_id))
}

fn store_venue(tx: &Transaction<'_>, venue: Option<&Value>) -> Result<Option<i64>> {
    let Some(venue) = venue else {
        return Ok(None);
    };
    let Some(venue_id) = venue.get("id").and_then(as_i64_any) else {
        return Ok(None);
    };
    let name = pick_string(venue, "ground").unwrap_or_else(|| "Unknown Venue".to_string());
    tx.execute(
        "INSERT OR IGNORE INTO venues (venue_id, venue_name, city) VALUES (?1, ?2, ?3)",
        params![venue_id, name, pick_string(venue, "city")],
    )
    .with_context(|| format!("store venue {venue_id}"))?;
    Ok(Some(venue_id))
}

/// Back-fill the country column from the team name.
///
/// First matching substring wins; names that match nothing keep the team
/// name itself as country, as the source system did.
pub fn update_team_countries(conn: &Connection) -> Result<usize> {
    let teams: Vec<(i64, String)> = {
        let mut stmt = conn
            .prepare("SELECT team_id, team_name FROM teams")
            .context("prepare team list")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("query team list")?;
        rows.collect::<Result<_, _>>().context("decode team rows")?
    };

    let mut updated = 0usize;
    for (team_id, team_name) in &teams {
        let country = country_for_team(team_name);
        conn.execute(
            "UPDATE teams SET country = ?1 WHERE team_id = ?2",
            params![country, team_id],
        )
        .with_context(|| format!("update country for team {team_id}"))?;
        updated += 1;
    }
    Ok(updated)
}

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("india", "India"),
    ("australia", "Australia"),
    ("england", "England"),
    ("pakistan", "Pakistan"),
    ("south africa", "South Africa"),
    ("new zealand", "New Zealand"),
    ("sri lanka", "Sri Lanka"),
    ("bangladesh", "Bangladesh"),
    ("afghanistan", "Afghanistan"),
    ("west indies", "West Indies"),
    ("ireland", "Ireland"),
    ("scotland", "Scotland"),
    ("netherlands", "Netherlands"),
    ("zimbabwe", "Zimbabwe"),
    ("hong kong", "Hong Kong"),
    ("uae", "United Arab Emirates"),
    ("united arab emirates", "United Arab Emirates"),
];

pub fn country_for_team(team_name: &str) -> String {
    let lowered = team_name.to_lowercase();
    for (needle, country) in COUNTRY_NAMES {
        if lowered.contains(needle) {
            return (*country).to_string();
        }
    }
    team_name.to_string()
}

/// Convert the feed's millisecond epoch timestamp to a calendar date.
/// Absent or malformed values yield None, never an error.
pub(crate) fn date_from_epoch_millis(value: Option<&Value>) -> Option<String> {
    let millis = value.and_then(as_i64_any)?;
    let date = chrono::DateTime::from_timestamp(millis / 1000, 0)?;
    Some(date.date_naive().to_string())
}

pub(crate) fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

pub(crate) fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}

pub(crate) fn pick_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{as_i64_any, country_for_team, date_from_epoch_millis};
    use serde_json::json;

    #[test]
    fn maps_team_name_substrings_to_countries() {
        assert_eq!(country_for_team("India"), "India");
        assert_eq!(country_for_team("Royal Pakistan XI"), "Pakistan");
        assert_eq!(country_for_team("New Zealand A"), "New Zealand");
        assert_eq!(country_for_team("West Indies"), "West Indies");
        assert_eq!(country_for_team("Mumbai Indians"), "India");
        // No mapping: the name passes through unchanged.
        assert_eq!(country_for_team("Barbados Royals"), "Barbados Royals");
    }

    #[test]
    fn epoch_millis_to_date() {
        // 2024-06-29T00:00:00Z
        let value = json!("1719619200000");
        assert_eq!(
            date_from_epoch_millis(Some(&value)).as_deref(),
            Some("2024-06-29")
        );
        assert_eq!(date_from_epoch_millis(Some(&json!("not a number"))), None);
        assert_eq!(date_from_epoch_millis(None), None);
    }

    #[test]
    fn numeric_fields_accept_strings() {
        assert_eq!(as_i64_any(&json!("12345")), Some(12345));
        assert_eq!(as_i64_any(&json!(12345)), Some(12345));
        assert_eq!(as_i64_any(&json!("abc")), None);
    }
}
