// Souper engine: merge, evaluate, score, repeat.

pub mod candidate;
pub mod evaluator;
pub mod generate;
pub mod objective;
pub mod runner;

pub use candidate::{CandidateModel, CandidateProvider, HttpProvider, MockCandidate, MockProvider};
pub use evaluator::Evaluator;
pub use generate::{build_pool, generate_instructions, run_generation};
pub use objective::Objective;
pub use runner::OptimizationRunner;
