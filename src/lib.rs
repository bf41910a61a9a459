pub mod aggregate;
pub mod api;
pub mod config;
pub mod db;
pub mod ingest;
pub mod match_ingest;
pub mod player_id;
pub mod reports;
pub mod schema;
pub mod scorecard_ingest;
