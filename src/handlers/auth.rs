// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::student::{LoginRequest, MeResponse, RegisterRequest, Student},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, clear_session_cookie, session_cookie, sign_jwt},
    },
};

/// Registers a new student.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the student object (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (username, password)
        VALUES ($1, $2)
        RETURNING id, username, password, role, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register student: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// Authenticates a student.
///
/// On success, signs a JWT, sets it as an HTTP-only cookie, and echoes it in
/// the body for non-browser clients.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let student = sqlx::query_as::<_, Student>(
        r#"
        SELECT id, username, password, role, created_at
        FROM students
        WHERE username = $1
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let student = student.ok_or(AppError::AuthError("User not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &student.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(
        student.id,
        &student.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    let cookie = session_cookie(&token, config.jwt_expiration);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role": student.role
        })),
    ))
}

/// Clears the session cookie.
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "success": true })),
    )
}

/// Get current student's profile and statistics.
pub async fn me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id();

    let me = sqlx::query_as::<_, MeResponse>(
        r#"
        SELECT
            s.id, s.username, s.role, s.created_at,
            (SELECT COUNT(*) FROM study_materials WHERE student_id = s.id) AS materials_count,
            (SELECT COUNT(*) FROM practice_exams WHERE student_id = s.id AND status = 'completed') AS exams_completed
        FROM students s
        WHERE s.id = $1
        "#,
    )
    .bind(student_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(me))
}
