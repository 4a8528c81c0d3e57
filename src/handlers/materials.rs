// src/handlers/materials.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::material::{CreateMaterialRequest, ProcessingStatus, StudyMaterial},
    utils::jwt::Claims,
};

const MATERIAL_COLUMNS: &str =
    "id, student_id, title, subject, source_url, extracted_text, processing_status, created_at";

/// Creates a study material from inline note text.
///
/// Inline text needs no extraction pipeline, so the material is stored
/// already 'completed' and immediately usable by the exam generator. An
/// empty body is stored as 'pending' awaiting a future upload.
pub async fn create_material(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let student_id = claims.student_id();

    let (extracted_text, status) = if payload.content.trim().is_empty() {
        (None, ProcessingStatus::Pending)
    } else {
        (Some(payload.content.clone()), ProcessingStatus::Completed)
    };

    let material = sqlx::query_as::<_, StudyMaterial>(&format!(
        r#"
        INSERT INTO study_materials
            (student_id, title, subject, source_url, extracted_text, processing_status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        MATERIAL_COLUMNS
    ))
    .bind(student_id)
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(&payload.source_url)
    .bind(&extracted_text)
    .bind(status)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create study material: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(material)))
}

/// Lists the current student's study materials, newest first.
pub async fn list_materials(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let materials = sqlx::query_as::<_, StudyMaterial>(&format!(
        "SELECT {} FROM study_materials WHERE student_id = $1 ORDER BY created_at DESC",
        MATERIAL_COLUMNS
    ))
    .bind(claims.student_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(materials))
}

/// Fetches one of the current student's materials.
pub async fn get_material(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let material = sqlx::query_as::<_, StudyMaterial>(&format!(
        "SELECT {} FROM study_materials WHERE id = $1 AND student_id = $2",
        MATERIAL_COLUMNS
    ))
    .bind(id)
    .bind(claims.student_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Study material not found".to_string()))?;

    Ok(Json(material))
}

/// Deletes one of the current student's materials.
pub async fn delete_material(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM study_materials WHERE id = $1 AND student_id = $2")
        .bind(id)
        .bind(claims.student_id())
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Study material not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
