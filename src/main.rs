use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use cricstats::api::{ApiClient, FetchStats};
use cricstats::config::ApiConfig;
use cricstats::ingest;
use cricstats::reports;
use cricstats::schema;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = ApiConfig::from_env();
    if let Some(path) = parse_flag(&args, "--db") {
        config.db_path = PathBuf::from(path);
    }
    if let Some(limit) = parse_flag(&args, "--limit").and_then(|v| v.parse::<usize>().ok()) {
        config.scorecard_batch = limit.clamp(1, 50);
    }

    match args.first().map(String::as_str) {
        Some("export") => cmd_export(&config, &args),
        Some("search") => cmd_search(&config, &args),
        Some("queries") => {
            cmd_queries();
            Ok(())
        }
        Some("help" | "--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => cmd_ingest(&config),
    }
}

fn cmd_ingest(config: &ApiConfig) -> Result<()> {
    let mut conn = schema::open_db(&config.db_path)?;
    let report = ingest::run_full_ingest(&mut conn, config)?;

    println!("Ingest complete");
    println!("DB: {}", config.db_path.display());
    println!(
        "Matches stored: {} recent, {} live",
        report.matches_stored, report.live_matches_stored
    );
    println!(
        "Scorecards: {} matches, {} performances, {} new players",
        report.scorecards_processed, report.performances_stored, report.players_stored
    );
    println!("Team countries updated: {}", report.teams_updated);
    println!(
        "API calls: {} ({} ok, {} failed)",
        report.api.api_calls, report.api.successful_calls, report.api.failed_calls
    );
    if !report.errors.is_empty() {
        println!("Errors: {}", report.errors.len());
        for err in report.errors.iter().take(6) {
            println!(" - {err}");
        }
    }
    Ok(())
}

fn cmd_export(config: &ApiConfig, args: &[String]) -> Result<()> {
    let out = parse_flag(args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("cricstats_report.xlsx"));
    let conn = schema::open_db(&config.db_path)?;
    let report = reports::export_workbook(&conn, &out)
        .with_context(|| format!("export to {}", out.display()))?;

    println!(
        "Exported {} sheets ({} rows) to {}",
        report.sheets,
        report.rows,
        out.display()
    );
    if !report.errors.is_empty() {
        println!("Skipped queries: {}", report.errors.len());
        for err in &report.errors {
            println!(" - {err}");
        }
    }
    Ok(())
}

fn cmd_queries() {
    for query in reports::CANNED_QUERIES {
        println!(
            "{:32}  [{:12}]  {}",
            query.title,
            query.difficulty.label(),
            query.description
        );
    }
}

fn cmd_search(config: &ApiConfig, args: &[String]) -> Result<()> {
    let name = positional_args(&args[1..], &["--db", "--limit"]).join(" ");
    if name.trim().is_empty() {
        return Err(anyhow!("usage: cricstats search <player name>"));
    }

    let client = ApiClient::new(config)?;
    let mut stats = FetchStats::default();
    let hits = client.search_players(&name, &mut stats)?;
    if hits.is_empty() {
        println!("No players found for '{name}'");
        return Ok(());
    }
    for hit in &hits {
        println!(
            "{:>10}  {:30}  {:20}  {}",
            hit.id, hit.name, hit.team_name, hit.date_of_birth
        );
    }
    Ok(())
}

/// Everything that is neither a flag nor a value consumed by one of the
/// listed flags.
fn positional_args(args: &[String], value_flags: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            if !arg.contains('=') && value_flags.contains(&arg.as_str()) {
                skip_next = true;
            }
            continue;
        }
        out.push(arg.clone());
    }
    out
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&format!("{flag}=")) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn print_usage() {
    println!("cricstats - cricket statistics ingestion pipeline");
    println!();
    println!("Usage:");
    println!("  cricstats [--db <path>] [--limit <n>]   run a full ingest");
    println!("  cricstats export [--out <file.xlsx>]    export canned analytics");
    println!("  cricstats queries                       list canned analytics");
    println!("  cricstats search <player name>          search players upstream");
    println!();
    println!("Environment: CRICKET_API_KEY, CRICKET_API_HOST, CRICKET_DB_PATH,");
    println!("  CRICKET_REQUEST_DELAY_MS, CRICKET_RATE_LIMIT_COOLDOWN_SECS,");
    println!("  CRICKET_SCORECARD_BATCH (also read from .env)");
}

#[cfg(test)]
mod tests {
    use super::{parse_flag, positional_args};

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_values_stay_out_of_positionals() {
        let argv = args(&["Virat", "--db", "/tmp/x.db", "Kohli", "--limit=5"]);
        assert_eq!(
            positional_args(&argv, &["--db", "--limit"]),
            vec!["Virat", "Kohli"]
        );
    }

    #[test]
    fn unknown_flags_are_dropped_but_keep_their_neighbors() {
        let argv = args(&["--verbose", "Kohli"]);
        assert_eq!(positional_args(&argv, &["--db"]), vec!["Kohli"]);
    }

    #[test]
    fn parses_both_flag_forms() {
        let argv = args(&["search", "--db", "/tmp/a.db", "--limit=7"]);
        assert_eq!(parse_flag(&argv, "--db").as_deref(), Some("/tmp/a.db"));
        assert_eq!(parse_flag(&argv, "--limit").as_deref(), Some("7"));
        assert_eq!(parse_flag(&argv, "--out"), None);
    }
}
