//! Stateless proxies to the hosted model.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::error;

use zflow_ai::sanitize;
use zflow_types::api::{ChatResponse, GenerateCodeResponse, PromptRequest};

use crate::{ApiError, AppState};

/// POST /api/ai-chat: Forward the prompt, return the raw reply text.
pub async fn ai_chat(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let prompt = require_prompt(payload)?;

    let completion = state.chat_model.send_message(&prompt).await.map_err(|e| {
        error!("AI chat error: {}", e);
        ApiError::Upstream {
            context: "Failed to get AI response",
            details: e.to_string(),
        }
    })?;

    Ok(Json(ChatResponse {
        result: completion.text,
        success: true,
    }))
}

/// POST /api/gen-ai-code: Forward the prompt, return the validated file map
/// together with the other members of the model's JSON.
pub async fn gen_ai_code(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<GenerateCodeResponse>, ApiError> {
    let prompt = require_prompt(payload)?;

    let code = state
        .code_model
        .send_message(&prompt)
        .await
        .and_then(|completion| sanitize::parse_generated_code(&completion.text))
        .map_err(|e| {
            error!("Code generation error: {}", e);
            ApiError::Upstream {
                context: "Failed to generate code",
                details: e.to_string(),
            }
        })?;

    Ok(Json(GenerateCodeResponse {
        code,
        success: true,
    }))
}

fn require_prompt(payload: Result<Json<PromptRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(req) = payload?;
    match req.prompt {
        Some(prompt) if !prompt.trim().is_empty() => Ok(prompt),
        _ => Err(ApiError::InvalidInput("Prompt is required".into())),
    }
}
