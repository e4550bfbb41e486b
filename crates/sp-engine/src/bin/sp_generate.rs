//! Instruction-generation entry point: news CSV to JSON shards.

use std::path::PathBuf;

use anyhow::Context;
use sp_engine::run_generation;
use sp_judge::{HttpJudge, Judge, MockJudge};

fn judge_from_env() -> anyhow::Result<Box<dyn Judge>> {
    match std::env::var("SOUPER_JUDGE_BASE") {
        Ok(base) => {
            let key = std::env::var("SOUPER_JUDGE_KEY")
                .context("SOUPER_JUDGE_KEY is required when SOUPER_JUDGE_BASE is set")?;
            let model =
                std::env::var("SOUPER_JUDGE_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
            Ok(Box::new(HttpJudge::new(base, key, model)?))
        }
        Err(_) => {
            tracing::warn!("SOUPER_JUDGE_BASE not set, using the mock judge");
            Ok(Box::new(MockJudge::new()))
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

    let csv_path: PathBuf = std::env::var("SOUPER_NEWS_CSV")
        .context("SOUPER_NEWS_CSV must point at the source article CSV")?
        .into();
    let out_dir: PathBuf = std::env::var("SOUPER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| sp_data::default_data_dir());

    let judge = judge_from_env()?;
    let layout = run_generation(judge.as_ref(), &csv_path, &out_dir).await?;

    for path in &layout.delta_paths {
        println!("wrote {}", path.display());
    }
    println!("wrote {}", layout.eval_path.display());
    Ok(())
}
