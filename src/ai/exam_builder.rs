// src/ai/exam_builder.rs
//
// Turns raw AI completions into a validated question set.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::config::MIN_EXAM_DURATION_MINUTES;
use crate::error::AppError;
use crate::models::practice_exam::Question;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("code fence regex")
});

/// Builds the generation prompt from concatenated study-material text.
pub fn build_prompt(material_text: &str, question_count: usize) -> String {
    format!(
        "You are an exam writer for a university study portal. Based only on the \
study material below, write exactly {count} practice questions.\n\
Respond with a raw JSON array, no surrounding prose, where every element is an \
object with these fields:\n\
  \"question\": the question text\n\
  \"type\": one of \"multiple-choice\", \"true-false\", \"short-answer\"\n\
  \"options\": array of 4 answer texts (multiple-choice only)\n\
  \"correctAnswer\": the 0-based option index for multiple-choice, true/false \
for true-false, or the expected answer string for short-answer\n\
  \"explanation\": one sentence explaining the answer\n\
  \"points\": 1\n\
\n\
STUDY MATERIAL:\n{material}\n",
        count = question_count,
        material = material_text
    )
}

/// Strips an optional Markdown code fence wrapper from a completion.
/// Models routinely wrap JSON in ```json ... ``` despite instructions.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    }
}

/// Question object as the AI returns it. Everything optional; defaults and
/// validation are applied during mapping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(default, rename = "type")]
    question_type: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    correct_answer: Option<Value>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    points: Option<i32>,
}

/// Parses a completion into questions with sequential ids ("q-1", "q-2", ...).
///
/// * Unparsable JSON -> GenerationFailed (the provider misbehaved).
/// * Parsable JSON with a structurally invalid question -> InvalidGeneration;
///   nothing from such a batch may be persisted.
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, AppError> {
    let body = strip_code_fence(raw);

    let raw_questions: Vec<RawQuestion> = serde_json::from_str(body).map_err(|e| {
        tracing::warn!("AI completion was not a JSON question array: {}", e);
        AppError::GenerationFailed(
            "AI returned an unreadable response. Please try again.".to_string(),
        )
    })?;

    if raw_questions.is_empty() {
        return Err(AppError::InvalidGeneration(
            "AI failed to generate valid questions. Please try again.".to_string(),
        ));
    }

    let questions = map_raw_questions(raw_questions);
    validate_questions(&questions)?;

    Ok(questions)
}

/// Maps client-supplied question objects (manual exam creation) through the
/// same defaults and checks as AI output. Client mistakes are 400s, not 500s.
pub fn questions_from_values(values: Vec<Value>) -> Result<Vec<Question>, AppError> {
    if values.is_empty() {
        return Err(AppError::BadRequest(
            "At least one question is required".to_string(),
        ));
    }

    let raw_questions: Vec<RawQuestion> = serde_json::from_value(Value::Array(values))
        .map_err(|e| AppError::BadRequest(format!("Invalid question format: {}", e)))?;

    let questions = map_raw_questions(raw_questions);
    validate_questions(&questions).map_err(|_| {
        AppError::BadRequest(
            "Every question needs text, a type, and a correct answer".to_string(),
        )
    })?;

    Ok(questions)
}

fn map_raw_questions(raw_questions: Vec<RawQuestion>) -> Vec<Question> {
    raw_questions
        .into_iter()
        .enumerate()
        .map(|(index, raw)| Question {
            id: format!("q-{}", index + 1),
            question: raw.question,
            question_type: raw.question_type,
            options: raw.options,
            correct_answer: raw.correct_answer.unwrap_or(Value::Null),
            explanation: raw.explanation.unwrap_or_default(),
            points: raw.points.unwrap_or(1),
        })
        .collect()
}

/// Every question must carry text, a type, and a defined correct answer.
pub fn validate_questions(questions: &[Question]) -> Result<(), AppError> {
    for q in questions {
        if q.question.trim().is_empty()
            || q.question_type.trim().is_empty()
            || q.correct_answer.is_null()
        {
            return Err(AppError::InvalidGeneration(
                "AI failed to generate valid questions. Please try again.".to_string(),
            ));
        }
    }
    Ok(())
}

/// Exam duration in minutes: two per question, never under the floor.
pub fn exam_duration(question_count: usize) -> i32 {
    (question_count as i32 * 2).max(MIN_EXAM_DURATION_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        assert_eq!(strip_code_fence("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fence("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fence("  [1,2]  "), "[1,2]");
        assert_eq!(strip_code_fence("no fence here"), "no fence here");
    }

    #[test]
    fn parses_and_applies_defaults() {
        let raw = r#"```json
        [
            {"question": "2+2?", "type": "multiple-choice", "options": ["3","4","5","6"], "correctAnswer": 1},
            {"question": "The sky is blue.", "type": "true-false", "correctAnswer": true, "points": 2}
        ]
        ```"#;

        let questions = parse_questions(raw).unwrap();
        assert_eq!(questions.len(), 2);

        assert_eq!(questions[0].id, "q-1");
        assert_eq!(questions[0].points, 1);
        assert_eq!(questions[0].explanation, "");

        assert_eq!(questions[1].id, "q-2");
        assert_eq!(questions[1].points, 2);
    }

    #[test]
    fn missing_correct_answer_is_invalid() {
        let raw = r#"[{"question": "Q?", "type": "short-answer"}]"#;
        assert!(matches!(
            parse_questions(raw),
            Err(AppError::InvalidGeneration(_))
        ));
    }

    #[test]
    fn empty_question_text_is_invalid() {
        let raw = r#"[{"question": "  ", "type": "true-false", "correctAnswer": true}]"#;
        assert!(matches!(
            parse_questions(raw),
            Err(AppError::InvalidGeneration(_))
        ));
    }

    #[test]
    fn non_json_is_a_generation_failure() {
        assert!(matches!(
            parse_questions("Sorry, I cannot help with that."),
            Err(AppError::GenerationFailed(_))
        ));
    }

    #[test]
    fn empty_array_is_invalid() {
        assert!(matches!(
            parse_questions("[]"),
            Err(AppError::InvalidGeneration(_))
        ));
    }

    #[test]
    fn manual_questions_get_sequential_ids() {
        let values = vec![
            serde_json::json!({"question": "Q1?", "type": "true-false", "correctAnswer": false}),
            serde_json::json!({"question": "Q2?", "type": "short-answer", "correctAnswer": "x"}),
        ];

        let questions = questions_from_values(values).unwrap();
        assert_eq!(questions[0].id, "q-1");
        assert_eq!(questions[1].id, "q-2");
    }

    #[test]
    fn manual_validation_errors_are_bad_requests() {
        let values = vec![serde_json::json!({"question": "Q?", "type": "true-false"})];
        assert!(matches!(
            questions_from_values(values),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn duration_has_a_floor() {
        assert_eq!(exam_duration(5), 30);
        assert_eq!(exam_duration(15), 30);
        assert_eq!(exam_duration(20), 40);
    }
}
