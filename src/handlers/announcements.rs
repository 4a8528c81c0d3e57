// src/handlers/announcements.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{error::AppError, models::announcement::Announcement};

/// Public announcement feed: pinned entries first, then newest.
pub async fn list_announcements(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let announcements = sqlx::query_as::<_, Announcement>(
        r#"
        SELECT id, title, body, pinned, created_at, updated_at
        FROM announcements
        ORDER BY pinned DESC, created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(announcements))
}
