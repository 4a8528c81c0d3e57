// src/models/practice_exam.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Lifecycle of a practice exam.
///
/// `draft -> active` on creation, `active -> completed` on submission, once.
/// `expired` exists in the data model but no code path sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "exam_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Draft,
    Active,
    Completed,
    Expired,
}

/// A single question inside an exam's JSONB document.
///
/// `question_type` stays a plain string ("multiple-choice", "true-false",
/// "short-answer"): the AI occasionally invents types, and grading must treat
/// those as incorrect rather than reject the whole document.
/// `correct_answer` is shape-dependent: an option index, a boolean, or a
/// string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    pub question: String,

    #[serde(rename = "type")]
    pub question_type: String,

    /// Present for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    pub correct_answer: Value,

    #[serde(default)]
    pub explanation: String,

    #[serde(default = "default_points")]
    pub points: i32,
}

pub fn default_points() -> i32 {
    1
}

/// Question as sent to a student while the exam is still active.
/// Hides `correct_answer` and `explanation`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub points: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question: q.question.clone(),
            question_type: q.question_type.clone(),
            options: q.options.clone(),
            points: q.points,
        }
    }
}

/// Represents the 'practice_exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeExam {
    pub id: i64,
    pub student_id: i64,
    pub title: String,
    pub subject: String,

    /// Ordered question set, stored as a JSONB array.
    pub questions: Json<Vec<Question>>,

    /// Exam duration in minutes.
    pub duration: i32,

    pub status: ExamStatus,

    /// Answers keyed by question id, persisted on submission.
    pub student_answers: Option<Json<HashMap<String, Value>>>,

    pub score: Option<i32>,
    pub percentage: Option<i32>,

    /// Seconds the student spent, self-reported on submission.
    pub time_spent: Option<i64>,

    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Row shape for exam listings (questions stay in the database).
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub status: ExamStatus,
    pub questions_count: i64,
    pub duration: i32,
    pub score: Option<i32>,
    pub percentage: Option<i32>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for generating an exam from study materials.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateExamRequest {
    pub material_ids: Vec<i64>,
    /// Optional chat-session reference, logged for traceability only.
    pub session_id: Option<String>,
}

/// DTO for creating an exam directly, bypassing the generator.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub questions: Vec<Value>,
    pub duration: Option<i32>,
}

/// DTO for submitting exam answers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub exam_id: i64,

    /// User's answers map.
    /// Key: question id (e.g. "q-1")
    /// Value: the raw answer (index, boolean, or text)
    pub answers: HashMap<String, Value>,

    /// Seconds spent, self-reported.
    pub time_spent: Option<i64>,
}

/// Query parameters for `GET /api/ai/practice-exam`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamListParams {
    pub exam_id: Option<i64>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}
