//! Chore CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: flags, stages and logging settings from argv
//!    and the environment (see [`config`]).
//! 2. **Wire observability**: install `tracing-subscriber` and, when
//!    configured, the OpenTelemetry OTLP exporter (see [`telemetry`]).
//! 3. **Run**: build the pipeline, run it on an engine configured from the
//!    inherited search path, print the result, and exit with its exit code.

mod config;
mod telemetry;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use command::{ExecutionResult, RunId, RunRecord, Timestamp};
use engine::{Engine, Stage};
use tracing::info;

use crate::config::{CliConfig, OutputMode, StageArg};
use crate::telemetry::Telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("chore: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let config = CliConfig::from_env_and_args(std::env::args().skip(1))?;
    let telemetry = Telemetry::init(&config.log)?;

    let stage = build_stage(config.stages)?;
    let engine = Engine::from_env();
    let run_id = RunId::new_random();

    info!(%run_id, "Starting run");
    let started_at = Timestamp::now();
    let outcome = engine.run_with_id(run_id, stage).await;
    let finished_at = Timestamp::now();
    telemetry.shutdown();

    let result = outcome.context("pipeline aborted")?;
    match config.output {
        OutputMode::Text => print_text(&result)?,
        OutputMode::Json => {
            let record = RunRecord {
                run_id,
                started_at,
                finished_at,
                result: result.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(ExitCode::from(exit_status(&result)))
}

/// Folds parsed stage arguments into one pipeline.
fn build_stage(stages: Vec<StageArg>) -> anyhow::Result<Stage> {
    stages
        .into_iter()
        .map(|arg| match arg {
            StageArg::Literal(text) => Ok(Stage::literal(text)),
            StageArg::Command(argv) => {
                Stage::argv(argv).context("stage has an empty program name")
            }
        })
        .reduce(|left, right| Ok(left?.pipe(right?)))
        .context("no stages given")?
}

fn print_text(result: &ExecutionResult) -> anyhow::Result<()> {
    if !result.stdout.is_empty() {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", result.stdout)?;
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr);
    }
    Ok(())
}

/// Process exit status for `result`; codes outside `0..=255` map to 255.
fn exit_status(result: &ExecutionResult) -> u8 {
    u8::try_from(result.exit_code).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_stage_chains_in_order() {
        let stage = build_stage(vec![
            StageArg::Literal("yolo".into()),
            StageArg::Command(vec!["cat".into()]),
            StageArg::Command(vec!["wc".into(), "-c".into()]),
        ])
        .unwrap();
        assert_eq!(stage.len(), 3);
    }

    #[test]
    fn build_stage_rejects_nothing() {
        assert!(build_stage(Vec::new()).is_err());
    }

    #[tokio::test]
    async fn built_pipeline_runs() {
        let stage = build_stage(vec![
            StageArg::Literal("yolo".into()),
            StageArg::Command(vec!["cat".into()]),
        ])
        .unwrap();
        let result = Engine::from_env().run(stage).await.unwrap();
        assert_eq!(result, ExecutionResult::new(0, "yolo", ""));
    }

    #[test]
    fn out_of_range_exit_codes_saturate() {
        assert_eq!(exit_status(&ExecutionResult::new(-1, "", "")), 255);
        assert_eq!(exit_status(&ExecutionResult::new(256, "", "")), 255);
        assert_eq!(exit_status(&ExecutionResult::new(141, "", "")), 141);
    }
}
