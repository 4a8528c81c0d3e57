// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Daily AI request allowance for free-plan students.
pub const DAILY_FREE_LIMIT: i64 = 15;

/// Premium plan price in Naira. Display only, billing happens elsewhere.
pub const PREMIUM_PRICE_NGN: i64 = 2500;

/// Number of questions requested from the AI per generated exam.
pub const GENERATED_QUESTION_COUNT: usize = 10;

/// Floor for the duration of a generated exam, in minutes.
pub const MIN_EXAM_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub ai_api_url: String,
    pub ai_api_key: String,
    pub ai_model: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let ai_api_url = env::var("AI_API_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        let ai_api_key = env::var("AI_API_KEY").expect("AI_API_KEY must be set");

        let ai_model = env::var("AI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            ai_api_url,
            ai_api_key,
            ai_model,
            admin_username,
            admin_password,
        }
    }
}
