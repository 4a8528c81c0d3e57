// src/handlers/practice_exam.rs

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlxJson};
use validator::Validate;

use crate::{
    ai::{
        RetryPolicy, TextGenerator, classify_exhaustion,
        exam_builder::{build_prompt, exam_duration, questions_from_values, parse_questions},
        generate_with_retry,
    },
    config::GENERATED_QUESTION_COUNT,
    error::AppError,
    models::practice_exam::{
        CreateExamRequest, ExamListParams, ExamStatus, ExamSummary, GenerateExamRequest,
        PracticeExam, PublicQuestion, Question, SubmitExamRequest,
    },
    utils::jwt::Claims,
};

const EXAM_COLUMNS: &str = "id, student_id, title, subject, questions, duration, status, \
                            student_answers, score, percentage, time_spent, started_at, \
                            completed_at, created_at";

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

struct GradeOutcome {
    score: i32,
    total_points: i32,
    correct_count: usize,
    percentage: i32,
}

fn parse_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn normalized_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Evaluates one answer against its question, by question type.
/// Unknown types grade as incorrect rather than erroring.
fn is_correct(question: &Question, answer: &Value) -> bool {
    match question.question_type.as_str() {
        "multiple-choice" => match (parse_index(answer), parse_index(&question.correct_answer)) {
            (Some(given), Some(correct)) => given == correct,
            _ => false,
        },
        "true-false" => match (coerce_bool(answer), coerce_bool(&question.correct_answer)) {
            (Some(given), Some(correct)) => given == correct,
            _ => false,
        },
        "short-answer" => {
            match (
                normalized_text(answer),
                normalized_text(&question.correct_answer),
            ) {
                (Some(given), Some(correct)) => given == correct,
                _ => false,
            }
        }
        _ => false,
    }
}

/// Scores a submission: walks the stored questions in order, looks up each
/// answer by question id, and sums points for correct ones.
fn grade(questions: &[Question], answers: &HashMap<String, Value>) -> GradeOutcome {
    let mut score = 0;
    let mut total_points = 0;
    let mut correct_count = 0;

    for question in questions {
        total_points += question.points;
        if let Some(answer) = answers.get(&question.id) {
            if is_correct(question, answer) {
                score += question.points;
                correct_count += 1;
            }
        }
    }

    let percentage = if total_points == 0 {
        0
    } else {
        ((score as f64 / total_points as f64) * 100.0).round() as i32
    };

    GradeOutcome {
        score,
        total_points,
        correct_count,
        percentage,
    }
}

// ---------------------------------------------------------------------------
// Analytics (best-effort; failures are logged and swallowed)
// ---------------------------------------------------------------------------

async fn record_generation(pool: &PgPool, student_id: i64, question_count: i64, topic: &str) {
    let result = sqlx::query(
        r#"
        INSERT INTO student_analytics (student_id, questions_generated, topics)
        VALUES ($1, $2, jsonb_build_array($3::text))
        ON CONFLICT (student_id) DO UPDATE SET
            questions_generated = student_analytics.questions_generated + EXCLUDED.questions_generated,
            topics = CASE
                WHEN student_analytics.topics ? $3
                THEN student_analytics.topics
                ELSE student_analytics.topics || EXCLUDED.topics
            END
        "#,
    )
    .bind(student_id)
    .bind(question_count)
    .bind(topic)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("Failed to record generation analytics: {:?}", e);
    }
}

async fn record_completion(pool: &PgPool, student_id: i64) {
    let result = sqlx::query(
        r#"
        INSERT INTO student_analytics (student_id, exams_completed)
        VALUES ($1, 1)
        ON CONFLICT (student_id) DO UPDATE SET
            exams_completed = student_analytics.exams_completed + 1
        "#,
    )
    .bind(student_id)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("Failed to record completion analytics: {:?}", e);
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct MaterialText {
    title: String,
    subject: String,
    extracted_text: Option<String>,
}

/// Generates a practice exam from the student's study materials.
///
/// Fetches the referenced materials (owned, fully processed), feeds their
/// extracted text to the AI, validates the returned question set, and
/// persists the exam in 'active' status.
pub async fn generate_from_materials(
    State(pool): State<PgPool>,
    State(generator): State<Arc<dyn TextGenerator>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id();

    if payload.material_ids.is_empty() {
        return Err(AppError::BadRequest(
            "At least one material is required".to_string(),
        ));
    }

    if let Some(session_id) = &payload.session_id {
        tracing::debug!("Generating exam for chat session {}", session_id);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT title, subject, extracted_text FROM study_materials WHERE student_id = ",
    );
    builder.push_bind(student_id);
    builder.push(" AND processing_status = 'completed' AND id IN (");
    let mut separated = builder.separated(",");
    for id in &payload.material_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id");

    let materials: Vec<MaterialText> = builder.build_query_as().fetch_all(&pool).await?;

    if materials.is_empty() {
        return Err(AppError::NotFound(
            "No processed study materials found".to_string(),
        ));
    }

    let combined_text = materials
        .iter()
        .filter_map(|m| m.extracted_text.as_deref())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    if combined_text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Selected materials contain no study content".to_string(),
        ));
    }

    let prompt = build_prompt(&combined_text, GENERATED_QUESTION_COUNT);

    let completion = generate_with_retry(generator.as_ref(), &RetryPolicy::default(), &prompt)
        .await
        .map_err(|e| classify_exhaustion(&e))?;

    let questions = parse_questions(&completion)?;
    let duration = exam_duration(questions.len());

    let title = format!("Practice Exam: {}", materials[0].title);
    let subject = materials[0].subject.clone();

    let (exam_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO practice_exams (student_id, title, subject, questions, duration, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(&title)
    .bind(&subject)
    .bind(SqlxJson(&questions))
    .bind(duration)
    .bind(ExamStatus::Active)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to persist generated exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    record_generation(&pool, student_id, questions.len() as i64, &subject).await;

    Ok(Json(json!({
        "success": true,
        "exam": {
            "id": exam_id,
            "title": title,
            "questionsCount": questions.len(),
            "duration": duration,
            "status": ExamStatus::Active,
        }
    })))
}

/// Creates a practice exam directly from client-supplied questions.
/// Same validation as generated exams; starts out 'active'.
pub async fn create_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let questions = questions_from_values(payload.questions)?;
    let duration = payload
        .duration
        .filter(|d| *d > 0)
        .unwrap_or_else(|| exam_duration(questions.len()));

    let (exam_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO practice_exams (student_id, title, subject, questions, duration, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(claims.student_id())
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(SqlxJson(&questions))
    .bind(duration)
    .bind(ExamStatus::Active)
    .fetch_one(&pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "exam": {
                "id": exam_id,
                "title": payload.title,
                "questionsCount": questions.len(),
                "duration": duration,
                "status": ExamStatus::Active,
            }
        })),
    ))
}

/// Submits answers for an active exam and scores them.
///
/// The completed state is terminal: the status flip happens in a guarded
/// UPDATE, so a concurrent double-submit scores exactly once and the loser
/// sees 404.
pub async fn submit_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id();

    let exam = sqlx::query_as::<_, PracticeExam>(&format!(
        "SELECT {} FROM practice_exams WHERE id = $1 AND student_id = $2 AND status = $3",
        EXAM_COLUMNS
    ))
    .bind(payload.exam_id)
    .bind(student_id)
    .bind(ExamStatus::Active)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let outcome = grade(&exam.questions.0, &payload.answers);

    let result = sqlx::query(
        r#"
        UPDATE practice_exams
        SET student_answers = $1, score = $2, percentage = $3, time_spent = $4,
            status = $5, completed_at = NOW()
        WHERE id = $6 AND student_id = $7 AND status = $8
        "#,
    )
    .bind(SqlxJson(&payload.answers))
    .bind(outcome.score)
    .bind(outcome.percentage)
    .bind(payload.time_spent)
    .bind(ExamStatus::Completed)
    .bind(payload.exam_id)
    .bind(student_id)
    .bind(ExamStatus::Active)
    .execute(&pool)
    .await?;

    // A concurrent submit won the race between our read and this write.
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    record_completion(&pool, student_id).await;

    Ok(Json(json!({
        "success": true,
        "score": outcome.score,
        "totalPoints": outcome.total_points,
        "percentage": outcome.percentage,
        "correctAnswers": outcome.correct_count,
        "totalQuestions": exam.questions.0.len(),
    })))
}

/// Fetches a single exam or a paginated listing, depending on `examId`.
///
/// Active exams hide correct answers and explanations; completed ones return
/// the full document including the student's answers.
pub async fn get_exams(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ExamListParams>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id();

    if let Some(exam_id) = params.exam_id {
        let exam = sqlx::query_as::<_, PracticeExam>(&format!(
            "SELECT {} FROM practice_exams WHERE id = $1 AND student_id = $2",
            EXAM_COLUMNS
        ))
        .bind(exam_id)
        .bind(student_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

        if exam.status == ExamStatus::Active {
            let questions: Vec<PublicQuestion> =
                exam.questions.0.iter().map(PublicQuestion::from).collect();
            return Ok(Json(json!({
                "id": exam.id,
                "title": exam.title,
                "subject": exam.subject,
                "questions": questions,
                "duration": exam.duration,
                "status": exam.status,
                "startedAt": exam.started_at,
                "createdAt": exam.created_at,
            })));
        }

        return Ok(Json(serde_json::to_value(&exam)?));
    }

    let limit = params.limit.unwrap_or(10).clamp(1, 50);
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;

    let exams = sqlx::query_as::<_, ExamSummary>(
        r#"
        SELECT id, title, subject, status, jsonb_array_length(questions)::BIGINT AS questions_count,
               duration, score, percentage, created_at, completed_at
        FROM practice_exams
        WHERE student_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM practice_exams WHERE student_id = $1")
            .bind(student_id)
            .fetch_one(&pool)
            .await?;

    Ok(Json(json!({
        "exams": exams,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "totalPages": (total + limit - 1) / limit,
        }
    })))
}

/// Deletes one of the current student's exams.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM practice_exams WHERE id = $1 AND student_id = $2")
        .bind(id)
        .bind(claims.student_id())
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
