use axum::{ extract::{ rejection::JsonRejection, State }, Json };
use log::{ debug, error, info };
use std::time::Instant;

use crate::llm::ProviderKind;
use crate::models::api::{ AssistantRequest, AssistantResponse, ChatRequest, ChatResponse };
use crate::notify::Notification;
use crate::server::api::AppState;
use crate::server::error::ApiError;

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    let message = required(req.message, "Message is required")?;

    let provider = state.providers.resolve(req.provider.as_deref()).ok_or_else(|| {
        match req.provider.as_deref().map(str::parse::<ProviderKind>) {
            Some(Ok(kind)) => ApiError::ProviderUnavailable(format!("{} provider is not configured", kind)),
            _ => ApiError::ProviderUnavailable("No chat provider configured".to_string()),
        }
    })?;

    let outcome = provider.chat(&message, req.history).await?;
    info!("Chat answered by {} ({} chars)", provider.kind(), outcome.text.len());

    Ok(
        Json(ChatResponse {
            text: outcome.text,
            updated_history: outcome.updated_history,
            provider: provider.kind().to_string(),
            model: provider.model().to_string(),
        })
    )
}

/// Site assistant: canned answers without providers, an apology when the
/// provider fails, and a Telegram summary of every exchange.
pub async fn assistant(
    State(state): State<AppState>,
    payload: Result<Json<AssistantRequest>, JsonRejection>
) -> Result<Json<AssistantResponse>, ApiError> {
    let started = Instant::now();
    let Json(req) = payload?;
    let question = required(req.question, "Question is required")?;

    let provider = state.providers
        .resolve(req.model.as_deref())
        .or_else(|| state.providers.default_provider());

    let (answer, model) = match provider {
        None => {
            debug!("No chat provider configured, answering in demo mode");
            (state.prompts.demo_answer(&question).to_string(), "demo".to_string())
        }
        Some(provider) => {
            let model = provider.kind().to_string();
            match provider.chat(&question, Vec::new()).await {
                Ok(outcome) => (outcome.text, model),
                Err(e) => {
                    error!("Assistant provider {} failed: {}", model, e);
                    (state.prompts.unavailable_message.clone(), model)
                }
            }
        }
    };

    state.notify(Notification::ai_chat(&question, &answer, &model));

    Ok(
        Json(AssistantResponse {
            answer,
            model,
            response_time: started.elapsed().as_millis() as u64,
        })
    )
}
