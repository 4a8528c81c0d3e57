// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{PgPool, prelude::FromRow};

use crate::{
    error::AppError,
    models::{analytics::StudentAnalytics, practice_exam::ExamSummary},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

/// Lists the current student's completed exams, newest first.
pub async fn history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let page = params.page.unwrap_or(1).max(1);

    let exams = sqlx::query_as::<_, ExamSummary>(
        r#"
        SELECT id, title, subject, status, jsonb_array_length(questions)::BIGINT AS questions_count,
               duration, score, percentage, created_at, completed_at
        FROM practice_exams
        WHERE student_id = $1 AND status = 'completed'
        ORDER BY completed_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(claims.student_id())
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

/// The current student's AI usage analytics.
/// Counters are best-effort, so a missing row just means zeros.
pub async fn my_analytics(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id();

    let analytics = sqlx::query_as::<_, StudentAnalytics>(
        r#"
        SELECT student_id, questions_generated, exams_completed, topics
        FROM student_analytics
        WHERE student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_optional(&pool)
    .await?
    .unwrap_or(StudentAnalytics {
        student_id,
        questions_generated: 0,
        exams_completed: 0,
        topics: sqlx::types::Json(Vec::new()),
    });

    Ok(Json(analytics))
}

/// Aggregated row for the leaderboard.
#[derive(Debug, serde::Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub exams_completed: i64,
    pub average_percentage: i64,
}

/// Top 10 students by average score over their completed exams.
pub async fn leaderboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT s.username,
               COUNT(e.id) AS exams_completed,
               COALESCE(ROUND(AVG(e.percentage)), 0)::BIGINT AS average_percentage
        FROM practice_exams e
        JOIN students s ON e.student_id = s.id
        WHERE e.status = 'completed'
        GROUP BY s.id, s.username
        ORDER BY average_percentage DESC, exams_completed DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(entries))
}
