use axum::{
    extract::{ rejection::JsonRejection, Path, Query },
    Json,
};

use crate::mock::{ self, analytics::{ self, DateRange, GoogleAnalyticsSnapshot, YandexMetrikaSnapshot } };
use crate::models::api::{
    AgentListResponse,
    AnalyticsQuery,
    BalanceResponse,
    BalanceUpdateRequest,
    BalanceUpdateResponse,
    DeactivateResponse,
    PaymentStatusQuery,
    PaymentStatusResponse,
    PaymentVerifyRequest,
    PaymentVerifyResponse,
    TransactionHistoryResponse,
    UsageResponse,
};
use crate::server::error::ApiError;

pub async fn list_agents() -> Json<AgentListResponse> {
    Json(AgentListResponse {
        success: true,
        agents: mock::agents(),
    })
}

pub async fn deactivate_agent(Path(id): Path<String>) -> Result<Json<DeactivateResponse>, ApiError> {
    let agent = mock::deactivate_agent(&id)?;
    Ok(
        Json(DeactivateResponse {
            success: true,
            message: "Agent deactivated successfully".to_string(),
            agent,
        })
    )
}

pub async fn get_balance() -> Json<BalanceResponse> {
    Json(mock::current_balance())
}

pub async fn update_balance(
    payload: Result<Json<BalanceUpdateRequest>, JsonRejection>
) -> Result<Json<BalanceUpdateResponse>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(mock::apply_balance_update(&req)?))
}

pub async fn transaction_history() -> Json<TransactionHistoryResponse> {
    Json(mock::transaction_history())
}

pub async fn verify_payment(
    payload: Result<Json<PaymentVerifyRequest>, JsonRejection>
) -> Result<Json<PaymentVerifyResponse>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(mock::verify_payment(&req)?))
}

pub async fn payment_status(
    Query(query): Query<PaymentStatusQuery>
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    Ok(Json(mock::payment_status(&query)?))
}

pub async fn agent_usage() -> Json<UsageResponse> {
    Json(mock::usage())
}

pub async fn google_analytics(Query(query): Query<AnalyticsQuery>) -> Json<GoogleAnalyticsSnapshot> {
    Json(analytics::google_snapshot(DateRange::parse(query.date_range.as_deref())))
}

pub async fn yandex_analytics(Query(query): Query<AnalyticsQuery>) -> Json<YandexMetrikaSnapshot> {
    Json(analytics::yandex_snapshot(DateRange::parse(query.date_range.as_deref())))
}
