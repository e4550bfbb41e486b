//! # sp-optimizer
//!
//! Sequential model-based weight search for Souper.
//!
//! Provides the bounded search space over mixing weights, proposal strategies
//! (seeded random, Gaussian-process surrogate with expected-improvement
//! acquisition), and trial tracking for an optimization run.

mod gp;
mod search;
mod trial;

pub use gp::{expected_improvement, GaussianProcess};
pub use search::{Bounds, GpSearch, RandomSearch, SearchStrategy};
pub use trial::{
    ObjectiveDirection, OptimizationConfig, OptimizationState, OptimizationStatus, RunId, Trial,
    TrialResult, TrialStatus,
};
