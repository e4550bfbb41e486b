//! The objective function of a run: weights in, pass ratio out.

use std::time::{Duration, Instant};

use sp_merge::Merger;
use sp_types::{internal_error, EvalError, EvalReport, SpResult, WeightVector};

use crate::candidate::CandidateProvider;
use crate::evaluator::Evaluator;

/// Binds the merger, the inference seam, and the evaluator into a single
/// callable the optimization loop can score weight vectors with.
#[derive(Debug)]
pub struct Objective {
    merger: Merger,
    evaluator: Evaluator,
    provider: Box<dyn CandidateProvider>,
    timeout: Option<Duration>,
}

impl Objective {
    pub fn new(merger: Merger, evaluator: Evaluator, provider: Box<dyn CandidateProvider>) -> Self {
        Self {
            merger,
            evaluator,
            provider,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Weight-vector dimensionality this objective expects.
    pub fn dims(&self) -> usize {
        self.merger.delta_count()
    }

    /// Score one weight vector, bounded by the trial timeout when set.
    ///
    /// The merge runs on the blocking pool so the deadline can race it.
    /// Backends that block inside an `answer` call cannot be preempted
    /// mid-call, so the wall clock is checked again after scoring; a trial
    /// that overran its budget reports [`EvalError::TrialTimeout`] either way.
    pub async fn run(&self, weights: &WeightVector) -> SpResult<EvalReport> {
        let Some(limit) = self.timeout else {
            return self.score(weights).await;
        };

        let start = Instant::now();
        let report = tokio::time::timeout(limit, self.score(weights))
            .await
            .map_err(|_| EvalError::TrialTimeout {
                seconds: limit.as_secs(),
            })??;

        if start.elapsed() > limit {
            return Err(EvalError::TrialTimeout {
                seconds: limit.as_secs(),
            }
            .into());
        }
        Ok(report)
    }

    async fn score(&self, weights: &WeightVector) -> SpResult<EvalReport> {
        let merger = self.merger.clone();
        let merge_weights = weights.clone();
        let artifact = tokio::task::spawn_blocking(move || merger.merge(&merge_weights))
            .await
            .map_err(|e| internal_error!("Merge task panicked: {e}"))??;

        let model = self.provider.open(&artifact)?;
        self.evaluator.evaluate(model.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::MockProvider;
    use async_trait::async_trait;
    use sp_data::ArtifactStore;
    use sp_judge::{Judge, MockJudge};
    use sp_merge::{save_safetensors, MODEL_FILE};
    use sp_types::{ParameterSet, QaPair, SpError, Tensor};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_source(dir: &Path, scale: f32) {
        std::fs::create_dir_all(dir).unwrap();
        let mut params = ParameterSet::new();
        params.insert("w".into(), Tensor::f32(vec![2], vec![scale, scale]));
        save_safetensors(dir.join(MODEL_FILE), &params).unwrap();
    }

    fn objective_with_judge(dir: &TempDir, deltas: usize, judge: Box<dyn Judge>) -> Objective {
        let base = dir.path().join("base");
        write_source(&base, 1.0);
        let mut delta_paths = Vec::new();
        for i in 0..deltas {
            let d = dir.path().join(format!("delta{i}"));
            write_source(&d, i as f32 + 2.0);
            delta_paths.push(d);
        }

        let store = Arc::new(ArtifactStore::new(dir.path().join("artifacts")).unwrap());
        let merger = Merger::new(base, delta_paths, store);
        let evaluator =
            Evaluator::new(judge, vec![QaPair::new("q", "a"), QaPair::new("q2", "a2")]).unwrap();

        Objective::new(merger, evaluator, Box::new(MockProvider::default()))
    }

    fn objective(dir: &TempDir, deltas: usize) -> Objective {
        objective_with_judge(dir, deltas, Box::new(MockJudge::new()))
    }

    /// Blocks the executor thread synchronously, the way a judge SDK doing
    /// blocking I/O inside an async call would.
    #[derive(Debug)]
    struct StallingJudge {
        stall: Duration,
    }

    #[async_trait]
    impl Judge for StallingJudge {
        async fn answer(&self, _prompt: &str) -> SpResult<String> {
            std::thread::sleep(self.stall);
            Ok(r#"{"score": 1, "reason": ""}"#.to_string())
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    #[tokio::test]
    async fn scores_a_weight_vector_end_to_end() {
        let dir = TempDir::new().unwrap();
        let obj = objective(&dir, 2);
        assert_eq!(obj.dims(), 2);

        let report = obj.run(&WeightVector::new(vec![0.25, 0.25])).await.unwrap();
        assert_eq!(report.total, 2);
        assert!((report.pass_ratio() - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn generous_timeout_does_not_trip() {
        let dir = TempDir::new().unwrap();
        let obj = objective(&dir, 1).with_timeout(Duration::from_secs(60));
        assert!(obj.run(&WeightVector::new(vec![0.5])).await.is_ok());
    }

    #[tokio::test]
    async fn blocking_judge_overrunning_the_budget_times_out() {
        let dir = TempDir::new().unwrap();
        let judge = Box::new(StallingJudge {
            stall: Duration::from_millis(200),
        });
        let obj = objective_with_judge(&dir, 1, judge).with_timeout(Duration::from_millis(50));

        let err = obj.run(&WeightVector::new(vec![0.5])).await.unwrap_err();
        assert!(matches!(
            err,
            SpError::Eval(EvalError::TrialTimeout { seconds: 0 })
        ));
    }

    #[tokio::test]
    async fn wrong_dimensionality_is_config_error() {
        let dir = TempDir::new().unwrap();
        let obj = objective(&dir, 2);
        let err = obj.run(&WeightVector::new(vec![0.5])).await.unwrap_err();
        assert!(matches!(err, SpError::Config(_)));
    }
}
