// src/ai/mod.rs

pub mod client;
pub mod exam_builder;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;

pub use client::HttpTextGenerator;

/// Abstraction over the external text-generation API.
///
/// The production implementation is [`HttpTextGenerator`]; tests inject
/// scripted fakes so the generation flow can be exercised offline.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends a prompt and returns the raw completion text.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Failure from a single text-generation attempt.
#[derive(Debug, Clone)]
pub enum GenerationError {
    /// Transport-level failure (connection, timeout, body read).
    Http(String),
    /// The provider answered, but with an error or an unusable payload.
    Api(String),
}

impl GenerationError {
    pub fn message(&self) -> &str {
        match self {
            GenerationError::Http(msg) => msg,
            GenerationError::Api(msg) => msg,
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for GenerationError {}

/// Bounded retry with linear backoff for AI calls.
///
/// Kept as a standalone value so the policy is testable apart from the
/// handlers that use it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based): attempt * base.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Calls the generator until it yields non-empty text or the policy is
/// exhausted. An empty completion counts as a failed attempt.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator,
    policy: &RetryPolicy,
    prompt: &str,
) -> Result<String, GenerationError> {
    let mut last_error = GenerationError::Api("no attempts were made".to_string());

    for attempt in 1..=policy.max_attempts {
        match generator.generate_text(prompt).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {
                tracing::warn!("AI returned an empty completion (attempt {})", attempt);
                last_error = GenerationError::Api("empty completion".to_string());
            }
            Err(e) => {
                tracing::warn!("AI call failed (attempt {}): {}", attempt, e);
                last_error = e;
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }

    Err(last_error)
}

/// Maps a final, retries-exhausted generation error onto the API taxonomy.
///
/// Provider messages mentioning "quota" or "limit" become 429s so clients can
/// tell a billing problem apart from an outage.
pub fn classify_exhaustion(err: &GenerationError) -> AppError {
    let msg = err.message().to_lowercase();
    if msg.contains("quota") || msg.contains("limit") {
        AppError::QuotaExceeded("AI service quota exceeded. Please try again later.".to_string())
    } else {
        AppError::GenerationFailed(
            "AI service failed to generate questions. Please try again later.".to_string(),
        )
    }
}
