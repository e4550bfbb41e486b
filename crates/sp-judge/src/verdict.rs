//! Tolerant parsers for judge and generation responses.
//!
//! Judge backends wrap their JSON in code fences or prose often enough that a
//! strict parse would throw away usable verdicts, so both parsers first cut
//! the response down to the outermost JSON value.  Verdict parsing reports
//! failure for the caller to count; generation parsing fails soft to an empty
//! batch, per input unit, without aborting the run.

use sp_types::{JudgeError, JudgeVerdict, QaPair};

/// Parse a judge response into a structured verdict.
///
/// Returns `JudgeError::MalformedVerdict` when no usable JSON object can be
/// extracted or the score is not 0/1; the evaluator counts those against the
/// denominator only.
pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict, JudgeError> {
    let snippet = extract_delimited(raw, '{', '}').ok_or_else(|| malformed(raw))?;
    let verdict: JudgeVerdict = serde_json::from_str(snippet).map_err(|_| malformed(raw))?;

    if verdict.score != 0 && verdict.score != 1 {
        return Err(malformed(raw));
    }
    Ok(verdict)
}

/// Parse a generation response into QA pairs.
///
/// Decode failure yields an empty batch for that input, logged but never
/// fatal.
pub fn parse_generated(raw: &str) -> Vec<QaPair> {
    let Some(snippet) = extract_delimited(raw, '[', ']') else {
        tracing::warn!("Generation response carried no JSON array, skipping input");
        return Vec::new();
    };

    match serde_json::from_str::<Vec<QaPair>>(snippet) {
        Ok(pairs) => pairs,
        Err(e) => {
            tracing::warn!("Generation response failed to decode ({e}), skipping input");
            Vec::new()
        }
    }
}

/// Slice out the outermost `open..=close` span, tolerating code fences and
/// surrounding prose.
fn extract_delimited(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

fn malformed(raw: &str) -> JudgeError {
    JudgeError::MalformedVerdict {
        raw: raw.chars().take(200).collect(),
    }
}
