// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        announcement::{Announcement, CreateAnnouncementRequest, UpdateAnnouncementRequest},
        student::Student,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Lists all students in the system.
/// Admin only.
pub async fn list_students(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let students = sqlx::query_as::<_, Student>(
        r#"
        SELECT id, username, password, role, created_at
        FROM students
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list students: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(students))
}

/// Deletes a student by ID, cascading to their materials, ledger, exams and
/// analytics (foreign keys carry ON DELETE CASCADE).
/// Admin only. Prevents deleting self.
pub async fn delete_student(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.student_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete student: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new announcement. The body is sanitized before storage.
/// Admin only.
pub async fn create_announcement(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let announcement = sqlx::query_as::<_, Announcement>(
        r#"
        INSERT INTO announcements (title, body, pinned)
        VALUES ($1, $2, $3)
        RETURNING id, title, body, pinned, created_at, updated_at
        "#,
    )
    .bind(&payload.title)
    .bind(clean_html(&payload.body))
    .bind(payload.pinned)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create announcement: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(announcement)))
}

/// Updates an announcement by ID. Fields are optional.
/// Admin only.
pub async fn update_announcement(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAnnouncementRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.is_none() && payload.body.is_none() && payload.pinned.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE announcements SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(body) = payload.body {
        separated.push("body = ");
        separated.push_bind_unseparated(clean_html(&body));
    }

    if let Some(pinned) = payload.pinned {
        separated.push("pinned = ");
        separated.push_bind_unseparated(pinned);
    }

    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update announcement: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Announcement not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an announcement by ID.
/// Admin only.
pub async fn delete_announcement(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete announcement: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Announcement not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
