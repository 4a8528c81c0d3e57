// src/handlers/usage.rs
//
// The quota gate: decides whether a student may invoke the AI right now.

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::{DAILY_FREE_LIMIT, PREMIUM_PRICE_NGN},
    error::AppError,
    models::usage_ledger::UsageLedger,
    utils::jwt::Claims,
};

const LEDGER_COLUMNS: &str = "student_id, plan, daily_tokens_used, last_reset_date, \
                              premium_expiry_date, total_tokens_used";

/// Fetches the student's ledger, creating a fresh free-plan one on first use.
async fn fetch_or_create_ledger(pool: &PgPool, student_id: i64) -> Result<UsageLedger, AppError> {
    let existing = sqlx::query_as::<_, UsageLedger>(&format!(
        "SELECT {} FROM usage_ledgers WHERE student_id = $1",
        LEDGER_COLUMNS
    ))
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    if let Some(ledger) = existing {
        return Ok(ledger);
    }

    let inserted = sqlx::query_as::<_, UsageLedger>(&format!(
        "INSERT INTO usage_ledgers (student_id) VALUES ($1)
         ON CONFLICT (student_id) DO NOTHING
         RETURNING {}",
        LEDGER_COLUMNS
    ))
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    match inserted {
        Some(ledger) => Ok(ledger),
        // Concurrent first-use: somebody else inserted between our two calls.
        None => Ok(sqlx::query_as::<_, UsageLedger>(&format!(
            "SELECT {} FROM usage_ledgers WHERE student_id = $1",
            LEDGER_COLUMNS
        ))
        .bind(student_id)
        .fetch_one(pool)
        .await?),
    }
}

/// Reports whether the student can use the AI feature right now.
///
/// Applies day-rollover and premium-expiry rules before answering, persisting
/// them when they changed anything. Consulting the gate never consumes
/// allowance.
pub async fn check_usage(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id();
    let now = Utc::now();

    let mut ledger = fetch_or_create_ledger(&pool, student_id).await?;

    if ledger.apply_rollover(now) {
        sqlx::query(
            r#"
            UPDATE usage_ledgers
            SET plan = $1, daily_tokens_used = $2, last_reset_date = $3, premium_expiry_date = $4
            WHERE student_id = $5
            "#,
        )
        .bind(ledger.plan)
        .bind(ledger.daily_tokens_used)
        .bind(ledger.last_reset_date)
        .bind(ledger.premium_expiry_date)
        .bind(student_id)
        .execute(&pool)
        .await?;
    }

    Ok(Json(json!({
        "canUseAI": ledger.can_use_ai(),
        "plan": ledger.plan,
        "dailyTokensUsed": ledger.daily_tokens_used,
        "remainingTokens": ledger.remaining(),
        "totalTokensUsed": ledger.total_tokens_used,
        "premiumExpiryDate": ledger.premium_expiry_date,
        "premiumPriceNGN": PREMIUM_PRICE_NGN,
        "dailyLimit": DAILY_FREE_LIMIT,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UsageActionRequest {
    pub action: String,
}

/// Records one AI use.
///
/// A single upsert so concurrent increments cannot lose updates: seeds the
/// ledger at 1/1 when absent, otherwise bumps both counters, restarting the
/// daily counter if the stored reset date is stale.
pub async fn update_usage(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UsageActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.action != "increment" {
        return Err(AppError::BadRequest(format!(
            "Unknown action '{}'",
            payload.action
        )));
    }

    let student_id = claims.student_id();

    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO usage_ledgers (student_id, daily_tokens_used, last_reset_date, total_tokens_used)
        VALUES ($1, 1, CURRENT_DATE, 1)
        ON CONFLICT (student_id) DO UPDATE SET
            daily_tokens_used = CASE
                WHEN usage_ledgers.last_reset_date = CURRENT_DATE
                THEN usage_ledgers.daily_tokens_used + 1
                ELSE 1
            END,
            last_reset_date = CURRENT_DATE,
            total_tokens_used = usage_ledgers.total_tokens_used + 1
        RETURNING daily_tokens_used
        "#,
    )
    .bind(student_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to increment usage ledger: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({
        "success": true,
        "tokensUsed": row.0,
    })))
}
