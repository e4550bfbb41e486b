//! Optimization entry point: search mixing weights for the best soup.
//!
//! Configured through SOUPER_* environment variables; falls back to the mock
//! judge and mock candidate backends when no endpoints are set, so the loop
//! can be exercised without any external service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sp_data::{load_eval_set, ArtifactStore};
use sp_engine::{
    CandidateProvider, Evaluator, HttpProvider, MockProvider, Objective, OptimizationRunner,
};
use sp_judge::{HttpJudge, Judge, MockJudge};
use sp_merge::Merger;
use sp_optimizer::OptimizationConfig;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn judge_from_env() -> anyhow::Result<Box<dyn Judge>> {
    match std::env::var("SOUPER_JUDGE_BASE") {
        Ok(base) => {
            let key = std::env::var("SOUPER_JUDGE_KEY")
                .context("SOUPER_JUDGE_KEY is required when SOUPER_JUDGE_BASE is set")?;
            let model = env_or("SOUPER_JUDGE_MODEL", "gpt-4o");
            Ok(Box::new(HttpJudge::new(base, key, model)?))
        }
        Err(_) => {
            tracing::warn!("SOUPER_JUDGE_BASE not set, using the mock judge");
            Ok(Box::new(MockJudge::new()))
        }
    }
}

fn provider_from_env() -> Box<dyn CandidateProvider> {
    match std::env::var("SOUPER_INFER_BASE") {
        Ok(base) => Box::new(HttpProvider::new(base)),
        Err(_) => {
            tracing::warn!("SOUPER_INFER_BASE not set, using the mock candidate");
            Box::new(MockProvider::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let base_model: PathBuf = std::env::var("SOUPER_BASE_MODEL")
        .context("SOUPER_BASE_MODEL must point at the base checkpoint directory")?
        .into();
    let deltas: Vec<PathBuf> = std::env::var("SOUPER_DELTA_PATHS")
        .context("SOUPER_DELTA_PATHS must list delta checkpoint directories, comma-separated")?
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .collect();
    anyhow::ensure!(!deltas.is_empty(), "SOUPER_DELTA_PATHS names no directories");

    let data_dir = sp_data::default_data_dir();
    let artifact_dir = env_or(
        "SOUPER_ARTIFACT_DIR",
        &data_dir.join("artifacts").to_string_lossy(),
    );
    let eval_path = env_or(
        "SOUPER_EVAL_DATA",
        &data_dir.join("eval_data.json").to_string_lossy(),
    );

    let seed: u64 = env_or("SOUPER_SEED", "1").parse().context("SOUPER_SEED")?;
    let trials: usize = env_or("SOUPER_TRIALS", "2")
        .parse()
        .context("SOUPER_TRIALS")?;

    let store = Arc::new(ArtifactStore::new(artifact_dir)?);
    let dims = deltas.len();
    let merger = Merger::new(base_model, deltas, store);

    let eval_set = load_eval_set(&eval_path)?;
    let evaluator = Evaluator::new(judge_from_env()?, eval_set)?;

    let mut objective = Objective::new(merger, evaluator, provider_from_env());
    let mut config = OptimizationConfig::new("souper", dims)
        .with_iterations(trials)
        .with_seed(seed);
    if let Ok(secs) = std::env::var("SOUPER_TRIAL_TIMEOUT_SECS") {
        let secs: u64 = secs.parse().context("SOUPER_TRIAL_TIMEOUT_SECS")?;
        objective = objective.with_timeout(Duration::from_secs(secs));
        config = config.with_trial_timeout(secs);
    }

    let mut runner = OptimizationRunner::new(objective, config);
    let status = runner.run().await?;

    match &status.best_trial {
        Some(best) => {
            println!(
                "Best parameter: {} with pass ratio {:.4}",
                best.weights, best.objective
            );
            Ok(())
        }
        None => anyhow::bail!("optimization produced no completed trial"),
    }
}
