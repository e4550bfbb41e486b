//! Prompt templates.  All prompts are fully rendered by the caller before the
//! judge call; the judge itself is a pure request/response boundary.

/// Marker the generation prompt ends with.  The mock judge keys on it to
/// decide which canned response to return.
pub const GENERATION_MARKER: &str = "Create your question now:";

/// Marker the evaluation prompt ends with.
pub const EVALUATION_MARKER: &str =
    "Please directly return the evaluation result in json format:";

/// Render the instruction-generation prompt for one source article.
pub fn render_generation(material: &str) -> String {
    format!(
        r#"You are an examiner tasked with evaluating a model's abilities. Create questions based on the provided materials that meet the following criteria:
- Challenging, containing various styles and dimensions.
- Can combine or focus solely on content or format requirements.
- Only need 5 precise questions.

Possible inquiry angles/requirements:
- Summarize, analyze, infer, predict, translate, rewrite content.
- Extract and summarize information (time, place, event, data, terms, opinions, assumptions).
- Calculate missing but computable data.
- Infer past situations, future changes, event causes.
- Constrain output format (paragraph structure, specific formats, word limits, prohibited or mandatory words).

Output format should be a JSON array:
[
    {{"question": "...", "answer": "..."}},
    {{"question": "...", "answer": "..."}},
    {{"question": "...", "answer": "..."}},
    {{"question": "...", "answer": "..."}},
    {{"question": "...", "answer": "..."}}
]

Materials:
{material}

{GENERATION_MARKER}
"#
    )
}

/// Render the question prompt that wraps a generated question together with
/// its source material.  This is the form stored in the instruction shards.
pub fn render_question(material: &str, question: &str) -> String {
    format!(
        r#"You are a professional assistant, please answer the questions according to the given materials.
Materials:
{material}

Question:
{question}

Please give your answer:
"#
    )
}

/// Render the judge prompt for one (question, reference, candidate) triple.
pub fn render_evaluation(question: &str, reference: &str, candidate: &str) -> String {
    format!(
        r#"You are a professional evaluator. You need to judge whether [model output] meets the requirements according to [question requirements] and [reference answer]. If there is any point that does not meet the requirements, please give 0 points and give reasons for rejection, otherwise give 1 point.
The following is [question request]:
{question}
Here are the [answers]:
{reference}
Here is [Model Output]:
{candidate}
please return the evaluation results in the following json format:
{{
    "score": 0,
    "reason": "Word count requirement not met"
}}
{EVALUATION_MARKER}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_prompt_carries_material_and_marker() {
        let prompt = render_generation("Sugar output rose.");
        assert!(prompt.contains("Sugar output rose."));
        assert!(prompt.ends_with(&format!("{GENERATION_MARKER}\n")));
    }

    #[test]
    fn question_prompt_wraps_both_parts() {
        let prompt = render_question("material text", "What happened?");
        assert!(prompt.contains("material text"));
        assert!(prompt.contains("What happened?"));
    }

    #[test]
    fn evaluation_prompt_carries_triple() {
        let prompt = render_evaluation("q", "ref", "cand");
        assert!(prompt.contains("q"));
        assert!(prompt.contains("ref"));
        assert!(prompt.contains("cand"));
        assert!(prompt.contains(EVALUATION_MARKER));
    }
}
