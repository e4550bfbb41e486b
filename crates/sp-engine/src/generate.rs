//! Instruction-generation pass: news CSV in, JSON shards out.
//!
//! Each article is turned into question/answer pairs by the judge; stored
//! questions are wrapped with their source material so a candidate can answer
//! them without retrieval.  The pooled pairs are then cut into four training
//! shards plus one held-out evaluation shard.

use std::path::Path;

use sp_data::{load_news_csv, write_shards, NewsArticle, ShardLayout};
use sp_judge::{parse_generated, render_generation, render_question, Judge};
use sp_types::{QaPair, SpResult};

/// Generate instruction pairs for one piece of source material.
///
/// A response the parser cannot read contributes nothing; generation carries
/// on with the remaining articles.
pub async fn generate_instructions(judge: &dyn Judge, material: &str) -> SpResult<Vec<QaPair>> {
    let raw = judge.answer(&render_generation(material)).await?;
    let pairs = parse_generated(&raw);

    Ok(pairs
        .into_iter()
        .map(|pair| QaPair::new(render_question(material, &pair.question), pair.answer))
        .collect())
}

/// Build the full instruction pool from a batch of articles.
pub async fn build_pool(judge: &dyn Judge, articles: &[NewsArticle]) -> SpResult<Vec<QaPair>> {
    let mut pool = Vec::new();
    for (i, article) in articles.iter().enumerate() {
        let pairs = generate_instructions(judge, &article.content).await?;
        tracing::info!(
            "Article {}/{}: generated {} instruction pairs",
            i + 1,
            articles.len(),
            pairs.len()
        );
        pool.extend(pairs);
    }
    tracing::info!("Instruction pool holds {} pairs", pool.len());
    Ok(pool)
}

/// End-to-end generation: load the CSV, build the pool, write the shards.
pub async fn run_generation(
    judge: &dyn Judge,
    csv_path: &Path,
    out_dir: &Path,
) -> SpResult<ShardLayout> {
    let articles = load_news_csv(csv_path)?;
    let pool = build_pool(judge, &articles).await?;
    write_shards(&pool, out_dir)
}
