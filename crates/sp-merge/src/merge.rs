//! Weighted checkpoint merging ("souping").
//!
//! Every floating-point tensor in the merged model is the weighted sum of the
//! corresponding tensors across sources.  Integer tensors (position ids and
//! similar buffers) are assigned verbatim, last writer wins — summing
//! discrete indices is meaningless, so the asymmetry is intentional.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use sp_data::ArtifactStore;
use sp_types::{
    config_error, MergeError, ParameterSet, SpResult, Tensor, TensorData, WeightVector,
    WEIGHT_SUM_TOLERANCE,
};

/// File name of the serialized parameter set inside an artifact directory.
pub const MODEL_FILE: &str = "model.safetensors";

/// Tokenizer files carried over from the first source when present.
const TOKENIZER_FILES: &[&str] = &[
    "tokenizer.json",
    "tokenizer_config.json",
    "special_tokens_map.json",
];

/// Merge parameter sets under the given weights.
///
/// Preconditions (each a configuration error): at least one source, one
/// weight per source, and weights summing to 1 within [`WEIGHT_SUM_TOLERANCE`].
/// The key set and shapes of the first source define the expected layout;
/// any divergence in later sources is a [`MergeError`].
pub fn merge_parameter_sets(sets: &[ParameterSet], weights: &[f64]) -> SpResult<ParameterSet> {
    if sets.is_empty() {
        return Err(config_error!("No sources given for merge"));
    }
    if sets.len() != weights.len() {
        return Err(config_error!(
            "The number of models and weights must match: {} models, {} weights",
            sets.len(),
            weights.len()
        ));
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(config_error!(
            "Weights must sum to 1 (got {sum}, tolerance {WEIGHT_SUM_TOLERANCE})"
        ));
    }

    let keys: Vec<&String> = sets[0].keys().collect();
    let merged: Vec<(String, Tensor)> = keys
        .par_iter()
        .map(|key| merge_one(key.as_str(), sets, weights).map(|t| ((*key).clone(), t)))
        .collect::<SpResult<_>>()?;

    Ok(merged.into_iter().collect())
}

fn merge_one(key: &str, sets: &[ParameterSet], weights: &[f64]) -> SpResult<Tensor> {
    let reference = &sets[0][key];

    for (i, set) in sets.iter().enumerate().skip(1) {
        let tensor = set.get(key).ok_or_else(|| MergeError::KeyMismatch {
            key: key.to_string(),
            index: i,
        })?;
        if tensor.shape != reference.shape {
            return Err(MergeError::ShapeMismatch {
                key: key.to_string(),
                expected: reference.shape.clone(),
                actual: tensor.shape.clone(),
            }
            .into());
        }
        if tensor.is_integer() != reference.is_integer() {
            return Err(MergeError::DtypeMismatch {
                key: key.to_string(),
            }
            .into());
        }
    }

    if reference.is_integer() {
        // Last writer wins for integer buffers.
        let last = &sets[sets.len() - 1][key];
        return Ok(last.clone());
    }

    let mut acc = vec![0.0f32; reference.numel()];
    for (weight, set) in weights.iter().zip(sets) {
        let values = match &set[key].data {
            TensorData::F32(v) => v,
            TensorData::I64(_) => unreachable!("dtype checked above"),
        };
        let w = *weight as f32;
        for (a, v) in acc.iter_mut().zip(values) {
            *a += w * v;
        }
    }

    Ok(Tensor::f32(reference.shape.clone(), acc))
}

/// Merges checkpoint directories into artifact directories, memoized through
/// the [`ArtifactStore`].
///
/// Sources are the base model directory followed by the delta directories,
/// each containing a `model.safetensors`.  The produced artifact carries the
/// merged parameters plus the first source's tokenizer files.
#[derive(Debug, Clone)]
pub struct Merger {
    sources: Vec<PathBuf>,
    store: Arc<ArtifactStore>,
}

impl Merger {
    pub fn new(base: impl Into<PathBuf>, deltas: Vec<PathBuf>, store: Arc<ArtifactStore>) -> Self {
        let mut sources = vec![base.into()];
        sources.extend(deltas);
        Self { sources, store }
    }

    /// Number of delta checkpoints, i.e. the expected weight-vector length.
    pub fn delta_count(&self) -> usize {
        self.sources.len() - 1
    }

    /// Produce (or reuse) the merged artifact for the given weight vector and
    /// return its path.
    ///
    /// Identical weight vectors map to identical paths; a completed artifact
    /// is returned without recomputation.  This is a memoization contract,
    /// not a content check.
    pub fn merge(&self, weights: &WeightVector) -> SpResult<PathBuf> {
        let full = weights.full_weights();
        if full.len() != self.sources.len() {
            return Err(config_error!(
                "Weight vector has {} deltas but merger has {}",
                weights.len(),
                self.delta_count()
            ));
        }

        let lock = self.store.lock_for(weights);
        let _guard = lock.lock();

        let path = self.store.path_for(weights);
        if self.store.is_complete(weights) {
            tracing::info!("Model {} has been merged before", path.display());
            return Ok(path);
        }

        tracing::info!("Starting to merge models into {}", path.display());
        let start = Instant::now();

        let mut sets = Vec::with_capacity(self.sources.len());
        for (source, weight) in self.sources.iter().zip(&full) {
            tracing::info!("Load {} (weight {weight})", source.display());
            sets.push(crate::load_safetensors(source.join(MODEL_FILE))?);
        }

        let merged = merge_parameter_sets(&sets, &full)?;

        let out = self.store.begin(weights)?;
        crate::save_safetensors(out.join(MODEL_FILE), &merged)?;
        self.copy_tokenizer(&out)?;
        self.store.commit(weights)?;

        tracing::info!(
            "Model merged in {:.2}s ({} tensors)",
            start.elapsed().as_secs_f64(),
            merged.len()
        );
        Ok(path)
    }

    fn copy_tokenizer(&self, out: &Path) -> SpResult<()> {
        for name in TOKENIZER_FILES {
            let src = self.sources[0].join(name);
            if src.exists() {
                fs::copy(&src, out.join(name))?;
            }
        }
        Ok(())
    }
}
