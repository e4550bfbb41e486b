//! The optimization loop: propose weights, soup, evaluate, learn.

use std::time::Instant;

use sp_optimizer::{
    Bounds, GpSearch, OptimizationConfig, OptimizationStatus, SearchStrategy, Trial, TrialResult,
};
use sp_types::{SpResult, WeightVector};

use crate::objective::Objective;

/// Drives one optimization run to completion.
///
/// Trial zero always evaluates the all-ones weight vector so every run starts
/// from the plain sum of deltas; the surrogate proposes the remaining
/// `n_iterations` points.  A failed trial is recorded and skipped — it is
/// never reported to the surrogate and never aborts the run.
pub struct OptimizationRunner {
    objective: Objective,
    config: OptimizationConfig,
    status: OptimizationStatus,
    trials: Vec<Trial>,
}

impl OptimizationRunner {
    pub fn new(objective: Objective, config: OptimizationConfig) -> Self {
        let status = OptimizationStatus::new(config.clone());
        Self {
            objective,
            config,
            status,
            trials: Vec::new(),
        }
    }

    pub fn status(&self) -> &OptimizationStatus {
        &self.status
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub async fn run(&mut self) -> SpResult<&OptimizationStatus> {
        let dims = self.objective.dims();
        tracing::info!(
            "Starting run '{}': {} deltas, {} iterations, seed {}",
            self.config.name,
            dims,
            self.config.n_iterations,
            self.config.seed
        );
        self.status.mark_running();

        let mut strategy = GpSearch::new(Bounds::unit(dims), self.config.seed);

        for trial_number in 0..=self.config.n_iterations {
            let weights = if trial_number == 0 {
                WeightVector::ones(dims)
            } else {
                WeightVector::new(strategy.suggest())
            };
            self.execute_trial(trial_number, weights, &mut strategy)
                .await;
        }

        match &self.status.best_trial {
            Some(best) => {
                tracing::info!(
                    "Best parameter: {} (objective {:.4})",
                    best.weights,
                    best.objective
                );
                self.status.mark_completed();
            }
            None => {
                tracing::error!("Run '{}' produced no completed trial", self.config.name);
                self.status.mark_failed("All trials failed".to_string());
            }
        }
        Ok(&self.status)
    }

    async fn execute_trial(
        &mut self,
        trial_number: usize,
        weights: WeightVector,
        strategy: &mut GpSearch,
    ) {
        let mut trial = Trial::new(self.config.id, trial_number, weights.clone());
        tracing::info!("Trial {trial_number}: weights {weights}");
        trial.mark_running();
        let start = Instant::now();

        match self.objective.run(&weights).await {
            Ok(report) => {
                let objective = report.pass_ratio();
                let mut metrics = std::collections::HashMap::new();
                metrics.insert("pass_ratio".to_string(), objective);
                metrics.insert("passed".to_string(), report.passed as f64);
                metrics.insert("failed".to_string(), report.failed as f64);
                metrics.insert("total".to_string(), report.total as f64);
                metrics.insert("malformed".to_string(), report.malformed as f64);

                let result = TrialResult {
                    trial_id: trial.id,
                    objective,
                    weights: weights.clone(),
                    metrics,
                    duration_seconds: Some(start.elapsed().as_secs()),
                };
                tracing::info!(
                    "Trial {trial_number} completed: pass ratio {objective:.4} ({}/{})",
                    report.passed,
                    report.total
                );
                strategy.report(weights.deltas(), objective);
                self.status.update_best(&result);
                self.status.trials_completed += 1;
                trial.mark_completed(result);
            }
            Err(e) => {
                tracing::warn!("Trial {trial_number} failed, continuing: {e}");
                self.status.trials_failed += 1;
                trial.mark_failed(e.to_string());
            }
        }

        self.trials.push(trial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::MockProvider;
    use crate::evaluator::Evaluator;
    use sp_data::ArtifactStore;
    use sp_judge::MockJudge;
    use sp_merge::{save_safetensors, Merger, MODEL_FILE};
    use sp_optimizer::{OptimizationState, TrialStatus};
    use sp_types::{ParameterSet, QaPair, Tensor};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_source(dir: &Path, scale: f32) {
        std::fs::create_dir_all(dir).unwrap();
        let mut params = ParameterSet::new();
        params.insert("w".into(), Tensor::f32(vec![2], vec![scale, scale]));
        save_safetensors(dir.join(MODEL_FILE), &params).unwrap();
    }

    fn sources(dir: &TempDir, deltas: usize) -> (PathBuf, Vec<PathBuf>) {
        let base = dir.path().join("base");
        write_source(&base, 1.0);
        let delta_paths: Vec<PathBuf> = (0..deltas)
            .map(|i| {
                let d = dir.path().join(format!("delta{i}"));
                write_source(&d, i as f32 + 2.0);
                d
            })
            .collect();
        (base, delta_paths)
    }

    fn objective(dir: &TempDir, deltas: usize, judge: MockJudge) -> Objective {
        let (base, delta_paths) = sources(dir, deltas);
        let store = Arc::new(ArtifactStore::new(dir.path().join("artifacts")).unwrap());
        let merger = Merger::new(base, delta_paths, store);
        let evaluator =
            Evaluator::new(Box::new(judge), vec![QaPair::new("q", "a")]).unwrap();
        Objective::new(merger, evaluator, Box::new(MockProvider::default()))
    }

    #[tokio::test]
    async fn run_completes_with_seed_plus_iterations_trials() {
        let dir = TempDir::new().unwrap();
        let config = OptimizationConfig::new("test", 2).with_iterations(2).with_seed(1);
        let mut runner = OptimizationRunner::new(objective(&dir, 2, MockJudge::new()), config);

        let status = runner.run().await.unwrap();
        assert_eq!(status.state, OptimizationState::Completed);
        assert_eq!(status.trials_completed, 3);
        assert_eq!(status.trials_failed, 0);

        let best = status.best_trial.as_ref().unwrap();
        assert!((best.objective - 1.0).abs() < 1e-12);

        assert_eq!(runner.trials().len(), 3);
        assert_eq!(runner.trials()[0].weights, WeightVector::ones(2));
        assert!(runner
            .trials()
            .iter()
            .all(|t| t.status == TrialStatus::Completed));
    }

    #[tokio::test]
    async fn failing_judge_still_completes_with_zero_objective() {
        let dir = TempDir::new().unwrap();
        let judge = MockJudge::new().with_eval_response(r#"{"score": 0}"#);
        let config = OptimizationConfig::new("test", 1).with_iterations(1);
        let mut runner = OptimizationRunner::new(objective(&dir, 1, judge), config);

        let status = runner.run().await.unwrap();
        assert_eq!(status.state, OptimizationState::Completed);
        assert_eq!(status.best_trial.as_ref().unwrap().objective, 0.0);
    }

    #[tokio::test]
    async fn run_with_only_failing_trials_is_marked_failed() {
        let dir = TempDir::new().unwrap();
        // Source directories never written, so every merge fails.
        let store = Arc::new(ArtifactStore::new(dir.path().join("artifacts")).unwrap());
        let merger = Merger::new(
            dir.path().join("missing-base"),
            vec![dir.path().join("missing-delta")],
            store,
        );
        let evaluator =
            Evaluator::new(Box::new(MockJudge::new()), vec![QaPair::new("q", "a")]).unwrap();
        let objective = Objective::new(merger, evaluator, Box::new(MockProvider::default()));

        let config = OptimizationConfig::new("doomed", 1).with_iterations(1);
        let mut runner = OptimizationRunner::new(objective, config);

        let status = runner.run().await.unwrap();
        assert_eq!(status.state, OptimizationState::Failed);
        assert_eq!(status.trials_failed, 2);
        assert!(status.best_trial.is_none());
        assert!(runner
            .trials()
            .iter()
            .all(|t| t.status == TrialStatus::Failed && t.error.is_some()));
    }
}
