//! Held-out evaluation of a candidate model.
//!
//! Two phases, matching the run shape: first every question is answered by
//! the candidate, then each (question, reference, candidate answer) triple is
//! scored by the judge.  A verdict the parser cannot read is logged and
//! counted against the denominator only — it never unwinds past this
//! boundary.

use sp_judge::{parse_verdict, render_evaluation, Judge};
use sp_types::{EvalError, EvalRecord, EvalReport, QaPair, SpResult};

use crate::candidate::CandidateModel;

pub struct Evaluator {
    judge: Box<dyn Judge>,
    eval_set: Vec<QaPair>,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("judge", &self.judge.name())
            .field("eval_items", &self.eval_set.len())
            .finish()
    }
}

impl Evaluator {
    /// The evaluation set is fixed for the lifetime of the run; an empty set
    /// would divide by zero at scoring time, so it is rejected here.
    pub fn new(judge: Box<dyn Judge>, eval_set: Vec<QaPair>) -> SpResult<Self> {
        if eval_set.is_empty() {
            return Err(EvalError::EmptySet.into());
        }
        Ok(Self { judge, eval_set })
    }

    pub fn eval_set_len(&self) -> usize {
        self.eval_set.len()
    }

    /// Run the full evaluation set through a candidate and score the answers.
    pub async fn evaluate(&self, model: &dyn CandidateModel) -> SpResult<EvalReport> {
        tracing::info!(
            "Evaluating candidate '{}' over {} questions",
            model.name(),
            self.eval_set.len()
        );

        let mut records = Vec::with_capacity(self.eval_set.len());
        for (i, item) in self.eval_set.iter().enumerate() {
            let candidate = model.answer(&item.question).await?;
            tracing::debug!("Answered question {}/{}", i + 1, self.eval_set.len());
            records.push(EvalRecord {
                question: item.question.clone(),
                reference: item.answer.clone(),
                candidate,
            });
        }

        self.score_records(&records).await
    }

    /// Judge a batch of already-collected triples.
    ///
    /// The pass ratio depends only on the multiset of records, not their
    /// order.
    pub async fn score_records(&self, records: &[EvalRecord]) -> SpResult<EvalReport> {
        if records.is_empty() {
            return Err(EvalError::EmptySet.into());
        }

        let mut report = EvalReport::new(records.len());
        for record in records {
            let prompt = render_evaluation(&record.question, &record.reference, &record.candidate);
            let raw = self.judge.answer(&prompt).await?;

            match parse_verdict(&raw) {
                Ok(verdict) if verdict.is_pass() => report.record_pass(),
                Ok(_) => report.record_fail(),
                Err(e) => {
                    tracing::warn!("Judge evaluation error, counting as fail: {e}");
                    report.record_malformed();
                }
            }
        }

        tracing::info!(
            "Pass count: {} / {} ({} malformed verdicts), pass ratio: {:.4}",
            report.passed,
            report.total,
            report.malformed,
            report.pass_ratio()
        );
        Ok(report)
    }
}
