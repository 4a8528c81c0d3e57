// src/models/analytics.rs

use serde::Serialize;
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'student_analytics' table.
///
/// Best-effort counters only: writes are fire-and-forget and must never fail
/// a request.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalytics {
    pub student_id: i64,
    pub questions_generated: i64,
    pub exams_completed: i64,

    /// Distinct subjects the student has generated exams for.
    pub topics: Json<Vec<String>>,
}
