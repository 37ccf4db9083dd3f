//! Axum route handlers for the generation endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::prompts;
use crate::llm_client::{LlmError, PRO_MODEL};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub content: String,
    /// Which resume section to enhance: "summary" or "skills".
    #[serde(rename = "type")]
    pub section: String,
}

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
    pub job_description: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: u8,
    #[serde(default = "default_question_types")]
    pub question_types: Vec<String>,
}

fn default_num_questions() -> u8 {
    5
}

fn default_question_types() -> Vec<String> {
    vec![
        "technical".to_string(),
        "behavioral".to_string(),
        "situational".to_string(),
    ]
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<InterviewQuestion>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume/enhance
///
/// Rewrites a resume section to be more impactful and ATS-friendly.
pub async fn handle_enhance(
    State(state): State<AppState>,
    Json(request): Json<EnhanceRequest>,
) -> Result<Json<EnhanceResponse>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::Validation("content is required".to_string()));
    }

    let prompt = match request.section.as_str() {
        "summary" => prompts::enhance_summary_prompt(&request.content),
        "skills" => prompts::enhance_skills_prompt(&request.content),
        _ => {
            return Err(AppError::Validation(
                "Invalid improvement type".to_string(),
            ))
        }
    };

    if !state
        .limiter
        .check("resume_enhance")
        .await
        .map_err(AppError::Internal)?
    {
        return Err(AppError::RateLimited);
    }

    let response = state.llm.generate_with_retry(&prompt, Some(PRO_MODEL)).await?;
    let content = response
        .text()
        .ok_or(LlmError::EmptyContent)?
        .trim()
        .to_string();

    Ok(Json(EnhanceResponse { content }))
}

/// POST /api/v1/interview/questions
///
/// Generates interview questions for a job description. The model is asked
/// for a JSON array; the first `[…]` span in its reply is parsed.
pub async fn handle_interview_questions(
    State(state): State<AppState>,
    Json(request): Json<QuestionsRequest>,
) -> Result<Json<QuestionsResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required.".to_string(),
        ));
    }

    if !state
        .limiter
        .check("interview_questions")
        .await
        .map_err(AppError::Internal)?
    {
        return Err(AppError::RateLimited);
    }

    let prompt = prompts::interview_questions_prompt(
        &request.job_description,
        request.num_questions,
        &request.question_types,
    );

    let response = state.llm.generate_with_retry(&prompt, Some(PRO_MODEL)).await?;
    let text = response.text().ok_or(LlmError::EmptyContent)?;

    let json = extract_json_array(text).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "failed to locate a JSON array in model output"
        ))
    })?;
    let questions: Vec<InterviewQuestion> = serde_json::from_str(json).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("failed to parse questions: {e}"))
    })?;

    Ok(Json(QuestionsResponse { questions }))
}

/// Returns the span from the first `[` to the last `]`, if any.
/// Tolerates prose or code fences around the array.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
