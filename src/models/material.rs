// src/models/material.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

/// Processing state of an uploaded study material.
/// Inline text uploads complete immediately; anything needing extraction
/// (a future file pipeline) passes through 'pending'/'processing'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "processing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Represents the 'study_materials' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterial {
    pub id: i64,
    pub student_id: i64,
    pub title: String,
    pub subject: String,
    pub source_url: Option<String>,

    /// Text the exam generator feeds from. Null until processing completes.
    pub extracted_text: Option<String>,

    pub processing_status: ProcessingStatus,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a study material with inline note text.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(max = 100_000))]
    pub content: String,
    #[validate(custom(function = validate_optional_url))]
    pub source_url: Option<String>,
}

fn validate_optional_url(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
