//! Command-line driver for the bracket engine.
//!
//! Builds one stage from an entrant list, replays a results file through the
//! stage actor and prints the final bracket with its summary as JSON.

mod config;
mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Error};
use brackets::{
    bracket::Bracket,
    events::LogEventSink,
    stage::{BracketManager, CreateBracket},
    stats::StageSummary,
    store::{BracketRepository, Database, InMemoryBracketRepository},
};
use config::{CliConfig, CliOverrides};
use input::ResultEntry;
use log::info;
use pico_args::Arguments;
use serde::Serialize;

const HELP: &str = "\
Build a tournament bracket and replay results through it

USAGE:
  brackets_cli [OPTIONS] [NAMES]...

OPTIONS:
  --name         NAME      Stage name                          [default: env BRACKETS_NAME or Tournament]
  --format       FORMAT    single_elimination, double_elimination or round_robin
                                                             [default: env BRACKETS_FORMAT or single_elimination]
  --seeding      STRATEGY  natural, reverse, half_shift, reverse_half_shift,
                           pair_flip, inner_outer or random  [default: env BRACKETS_SEEDING or natural]
  --grand-final  KIND      simple or double (double elimination only)  [default: double]
  --per-pair     N         Matches per pairing (round robin only)       [default: 1]
  --entrants     FILE      File with one entrant name per line
  --results      FILE      JSON array of results to replay
  --external-id  ID        External identifier bound to the stage

FLAGS:
  --unbalanced-byes        Leave the last bracket slots empty instead of the highest seeds' opponents
  --skip-first-round       Accepted for single elimination and stored; byes are
                           always resolved at construction, so the bracket is unchanged
  --postgres               Store the stage in PostgreSQL (DATABASE_URL)
  -h, --help               Print help information

ENVIRONMENT:
  RUST_LOG                 Log filter (e.g., info, brackets=debug)
  DATABASE_URL             PostgreSQL connection string
  BRACKETS_INBOX_CAPACITY  Stage actor inbox bound
";

/// Everything printed at the end of a run
#[derive(Debug, Serialize)]
struct Report {
    bracket: Bracket,
    summary: StageSummary,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        name: pargs.opt_value_from_str("--name")?,
        format: pargs.opt_value_from_str("--format")?,
        seeding: pargs.opt_value_from_str("--seeding")?,
        grand_final: pargs.opt_value_from_str("--grand-final")?,
        matches_per_pair: pargs.opt_value_from_str("--per-pair")?,
        participants_file: pargs.opt_value_from_str::<_, PathBuf>("--entrants")?,
        results_file: pargs.opt_value_from_str::<_, PathBuf>("--results")?,
        external_id: pargs.opt_value_from_str("--external-id")?,
        unbalanced_byes: pargs.contains("--unbalanced-byes"),
        skip_first_round: pargs.contains("--skip-first-round"),
        postgres: pargs.contains("--postgres"),
    };
    let positional: Vec<String> = pargs
        .finish()
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    env_logger::builder().format_target(false).init();

    let config = CliConfig::from_env(overrides)?;

    let participants = match &config.participants_file {
        Some(path) => input::read_participants(path)?,
        None => positional,
    };
    let results = match &config.results_file {
        Some(path) => input::read_results(path)?,
        None => Vec::new(),
    };

    let report = run(&config, participants, results).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

async fn open_repository(config: &CliConfig) -> Result<Arc<dyn BracketRepository>, Error> {
    let Some(db_config) = &config.database else {
        return Ok(Arc::new(InMemoryBracketRepository::new()));
    };

    info!("Connecting to database: {}", db_config.database_url);
    let db = Database::new(db_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    db.migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to apply migrations: {}", e))?;
    info!("Database connected successfully");

    Ok(Arc::new(db.repository()))
}

/// Create the stage and replay every result in order
///
/// Stops at the first rejected result.
async fn run(
    config: &CliConfig,
    participants: Vec<String>,
    results: Vec<ResultEntry>,
) -> Result<Report, Error> {
    let repository = open_repository(config).await?;
    let manager = BracketManager::new(repository, Arc::new(LogEventSink), config.manager.clone());

    let stage = manager
        .create_bracket(CreateBracket {
            name: config.name.clone(),
            format: config.format,
            participants,
            seeding: config.seeding,
            settings: config.settings.clone(),
            external_id: config.external_id.clone(),
        })
        .await
        .context("Failed to create stage")?;

    info!("Replaying {} result(s) on stage {}", results.len(), stage.id);
    for entry in results {
        manager
            .report_result(stage.id, entry.match_id, entry.update)
            .await
            .with_context(|| format!("Result for match {} rejected", entry.match_id))?;
    }

    let bracket = manager.get_stage(stage.id).await?;
    let summary = manager.stage_summary(stage.id).await?;
    manager.close_stage(stage.id).await?;

    Ok(Report {
        bracket: Bracket::clone(&bracket),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brackets::bracket::{MatchUpdate, StageStatus};

    fn config(format: &str) -> CliConfig {
        CliConfig::from_env(CliOverrides {
            name: Some("Driver".to_string()),
            format: Some(format.to_string()),
            seeding: Some("natural".to_string()),
            ..CliOverrides::default()
        })
        .unwrap()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn result(match_id: i64, score1: u32, score2: u32) -> ResultEntry {
        ResultEntry {
            match_id,
            update: MatchUpdate::scores(score1, score2),
        }
    }

    #[tokio::test]
    async fn test_run_without_results() {
        let report = run(&config("round_robin"), names(&["A", "B", "C", "D"]), Vec::new())
            .await
            .unwrap();
        assert_eq!(report.bracket.matches.len(), 6);
        assert_eq!(report.summary.status, StageStatus::Pending);
        assert_eq!(report.summary.progress.completed, 0);
    }

    #[tokio::test]
    async fn test_run_replays_results() {
        let results = vec![result(0, 2, 0), result(1, 2, 1), result(2, 1, 0)];
        let report = run(&config("single_elimination"), names(&["A", "B", "C", "D"]), results)
            .await
            .unwrap();
        assert_eq!(report.summary.status, StageStatus::Completed);
        assert_eq!(report.summary.winner, Some(0));
        assert_eq!(report.summary.standings[0].participant.name, "A");
    }

    #[tokio::test]
    async fn test_run_stops_at_rejected_result() {
        let results = vec![result(0, 1, 0), result(0, 1, 0)];
        let err = run(&config("single_elimination"), names(&["A", "B", "C", "D"]), results)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("match 0"));
    }

    #[tokio::test]
    async fn test_run_rejects_lonely_entrant() {
        let err = run(&config("single_elimination"), names(&["A"]), Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to create stage"));
    }

    #[test]
    fn test_report_serializes() {
        let report = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(run(&config("double_elimination"), names(&["A", "B", "C"]), Vec::new()))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["format"], "double_elimination");
        assert_eq!(json["bracket"]["participants"].as_array().unwrap().len(), 3);
    }
}
