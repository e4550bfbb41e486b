use serde::{Deserialize, Serialize};

/// One question/answer pair.  The same shape is used for evaluation items,
/// generated instructions, and shard contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// One (question, reference answer, candidate answer) triple, consumed
/// transiently during scoring and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRecord {
    pub question: String,
    pub reference: String,
    pub candidate: String,
}

/// Structured verdict returned by the judge for a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub score: i64,
    #[serde(default)]
    pub reason: String,
}

impl JudgeVerdict {
    pub fn is_pass(&self) -> bool {
        self.score == 1
    }
}

/// Aggregate outcome of one evaluation pass.
///
/// Malformed judge responses count toward `total` but never toward `passed`,
/// so a verdict the parser cannot read scores the same as a fail.  `failed`
/// holds explicit zero-score verdicts only, keeping the two rejection paths
/// distinguishable in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub malformed: usize,
}

impl EvalReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            passed: 0,
            failed: 0,
            malformed: 0,
        }
    }

    pub fn record_pass(&mut self) {
        self.passed += 1;
    }

    pub fn record_fail(&mut self) {
        self.failed += 1;
    }

    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    /// `passed / total`.  Callers guard against an empty evaluation set
    /// before constructing a report.
    pub fn pass_ratio(&self) -> f64 {
        self.passed as f64 / self.total as f64
    }
}
