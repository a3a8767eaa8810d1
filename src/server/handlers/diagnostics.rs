use axum::{
    extract::State,
    http::{ header, HeaderMap, StatusCode },
    response::{ IntoResponse, Response },
    Json,
};
use chrono::Utc;
use log::{ info, warn };
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::llm::chat::{ ChatProvider, ProviderError };
use crate::llm::ProviderKind;
use crate::server::api::AppState;
use crate::server::error::ApiError;

pub const DEBUG_TOKEN_HEADER: &str = "x-admin-debug-token";
const SMOKE_PROMPT: &str = "Say hello";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyReport {
    pub present: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_format: Option<bool>,
}

impl KeyReport {
    fn of(value: Option<&str>) -> Self {
        Self {
            present: value.is_some(),
            length: value.map(str::len).unwrap_or(0),
            valid_format: None,
        }
    }

    fn with_prefix(value: Option<&str>, prefix: &str) -> Self {
        Self {
            valid_format: value.map(|v| v.trim().starts_with(prefix)),
            ..Self::of(value)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmokeTest {
    pub ok: bool,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn smoke_test(provider: Arc<dyn ChatProvider>) -> SmokeTest {
    let mut report = SmokeTest {
        ok: false,
        provider: provider.kind().to_string(),
        model: provider.model().to_string(),
        reply: None,
        status: None,
        body: None,
        error: None,
    };
    info!("Running {} smoke test", report.provider);
    match provider.chat(SMOKE_PROMPT, Vec::new()).await {
        Ok(outcome) => {
            report.ok = true;
            report.reply = Some(outcome.text);
        }
        Err(ProviderError::Upstream { status, body, .. }) => {
            report.status = Some(status);
            report.body = Some(body);
        }
        Err(e) => {
            warn!("{} smoke test failed: {}", report.provider, e);
            report.error = Some(e.to_string());
        }
    }
    report
}

pub async fn debug_env(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let env = &state.settings.env;
    let creds = &state.settings.credentials;

    if env.is_production() {
        let presented = headers.get(DEBUG_TOKEN_HEADER).and_then(|v| v.to_str().ok());
        let authorized = matches!(
            (env.admin_debug_token.as_deref(), presented),
            (Some(expected), Some(given)) if expected == given
        );
        if !authorized {
            warn!("Debug endpoint requested without a valid admin token");
            return Err(ApiError::NotFound);
        }
    }

    let mut telegram = json!({
        "hasToken": creds.telegram_bot_token.is_some(),
        "hasChatId": creds.telegram_chat_id.is_some(),
    });
    if !env.is_production() {
        telegram["tokenLength"] = json!(creds.telegram_bot_token.as_deref().map(str::len).unwrap_or(0));
    }

    let body = json!({
        "timestamp": Utc::now().to_rfc3339(),
        "environment": env.node_env,
        "vercelEnv": env.vercel_env,
        "telegramConfigured": telegram,
        "otherVars": {
            "hasGeminiKey": creds.gemini_key().is_some(),
            "hasOpenRouterKey": creds.openrouter.is_some(),
            "hasAnthropicKey": creds.anthropic.is_some(),
            "hasTogetherKey": creds.together.is_some(),
        },
        "providers": state.providers.configured(),
        "deployment": {
            "region": env.vercel_region.as_deref().unwrap_or("unknown"),
            "url": env.vercel_url.as_deref().unwrap_or("unknown"),
            "gitCommit": env.git_commit.as_deref().unwrap_or("unknown"),
        },
    });

    Ok(([(header::CACHE_CONTROL, "no-store, max-age=0")], Json(body)).into_response())
}

pub async fn test_env(State(state): State<AppState>) -> Json<serde_json::Value> {
    let env = &state.settings.env;
    let creds = &state.settings.credentials;

    let gemini = KeyReport::with_prefix(creds.gemini.as_deref(), "AIzaSy");
    let gemini_alt = KeyReport::with_prefix(creds.google_gemini.as_deref(), "AIzaSy");
    let anthropic = KeyReport::with_prefix(creds.anthropic.as_deref(), "sk-ant-");
    let openrouter = KeyReport::of(creds.openrouter.as_deref());
    let together = KeyReport::of(creds.together.as_deref());
    let tg_token = KeyReport::of(creds.telegram_bot_token.as_deref());
    let tg_chat = KeyReport::of(creds.telegram_chat_id.as_deref());

    let mut recommendations = Vec::new();
    if state.providers.is_empty() {
        recommendations.push(
            "Add GOOGLE_GEMINI_API_KEY, OPENROUTER_API_KEY, ANTHROPIC_API_KEY or TOGETHER_API_KEY to enable the assistant"
        );
    }
    if !tg_token.present {
        recommendations.push("Add TELEGRAM_BOT_TOKEN for notifications");
    }
    if !tg_chat.present {
        recommendations.push("Add TELEGRAM_CHAT_ID for notifications");
    }
    if gemini.valid_format == Some(false) || gemini_alt.valid_format == Some(false) {
        recommendations.push("Check the Gemini API key format, it should start with AIzaSy");
    }
    if anthropic.valid_format == Some(false) {
        recommendations.push("Check the Anthropic API key format, it should start with sk-ant-");
    }

    Json(
        json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "env": {
            "nodeEnv": env.node_env,
            "vercelEnv": env.vercel_env.as_deref().unwrap_or("not set"),
        },
        "apiKeys": {
            "gemini": gemini,
            "geminiAlternative": gemini_alt,
            "openrouter": openrouter,
            "anthropic": anthropic,
            "together": together,
            "telegram": {
                "token": tg_token,
                "chatId": tg_chat,
            },
        },
        "defaultProvider": state.providers.default_provider().map(|p| p.kind()),
        "recommendations": recommendations,
    })
    )
}

pub async fn simple_test(State(state): State<AppState>) -> Result<Json<SmokeTest>, ApiError> {
    let provider = state.providers
        .default_provider()
        .ok_or_else(|| ApiError::ProviderUnavailable("No chat provider configured".to_string()))?;
    Ok(Json(smoke_test(provider).await))
}

pub async fn check_openrouter(State(state): State<AppState>) -> Response {
    let key = state.settings.credentials.openrouter.as_deref();
    let (Some(key), Some(provider)) = (key, state.providers.get(ProviderKind::OpenRouter)) else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "No OpenRouter API key" })),
        ).into_response();
    };

    let key_info = json!({
        "length": key.len(),
        "hasSpaces": key != key.trim(),
    });
    let test = smoke_test(provider).await;

    Json(json!({
        "success": true,
        "keyInfo": key_info,
        "testResponse": test,
    })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_report_never_includes_key_material() {
        let report = KeyReport::with_prefix(Some("AIzaSyABCDEF"), "AIzaSy");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"present":true,"length":12,"validFormat":true}"#);
    }

    #[test]
    fn absent_key_reports_zero_length() {
        let report = KeyReport::of(None);
        assert!(!report.present);
        assert_eq!(report.length, 0);
        assert!(report.valid_format.is_none());
    }
}
