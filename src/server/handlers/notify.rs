use axum::{
    extract::{ rejection::JsonRejection, State },
    http::{ header, HeaderMap },
    Json,
};
use chrono::Utc;
use log::{ debug, error, warn };
use serde_json::Value as JsonValue;

use crate::models::api::{ FeedbackRequest, NotifyRequest, SuccessResponse };
use crate::notify::Notification;
use crate::server::api::AppState;
use crate::server::error::ApiError;

pub const FEEDBACK_MAX_BYTES: usize = 16 * 1024;
pub const FEEDBACK_MAX_COMMENT: usize = 1000;

/// Sends synchronously and reports Telegram's verdict as `success`.
pub async fn telegram_notify(
    State(state): State<AppState>,
    payload: Result<Json<NotifyRequest>, JsonRejection>
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload?;
    let notification = Notification::from_request(&req.kind, req.data);

    let Some(client) = state.telegram.as_ref() else {
        warn!("Telegram credentials not configured, {} notification skipped", notification.kind());
        return Ok(Json(SuccessResponse { success: false }));
    };

    let success = match client.send(&notification.render()).await {
        Ok(ok) => ok,
        Err(e) => {
            error!("Telegram API error: {}", e);
            false
        }
    };
    Ok(Json(SuccessResponse { success }))
}

fn parse_rating(raw: Option<&JsonValue>) -> Option<f64> {
    let value = match raw? {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (value.is_finite() && (1.0..=5.0).contains(&value)).then_some(value)
}

pub async fn feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<FeedbackRequest>, JsonRejection>
) -> Result<Json<SuccessResponse>, ApiError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if declared > FEEDBACK_MAX_BYTES {
        return Err(ApiError::PayloadTooLarge("Request too large".to_string()));
    }

    let Json(req) = payload?;

    let rating = parse_rating(req.rating.as_ref()).ok_or_else(||
        ApiError::Unprocessable("Invalid rating".to_string())
    )?;

    let comment = match req.comment {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) if s.chars().count() <= FEEDBACK_MAX_COMMENT => s,
        Some(_) => {
            return Err(ApiError::PayloadTooLarge("Comment too long".to_string()));
        }
    };

    debug!("Feedback received: rating={} comment_len={}", rating, comment.len());
    state.notify(Notification::Feedback {
        rating,
        comment,
        context: req.context.unwrap_or(JsonValue::Null),
        timestamp: Utc::now().to_rfc3339(),
    });

    Ok(Json(SuccessResponse { success: true }))
}
