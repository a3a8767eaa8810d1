use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

use super::chat::ChatMessage;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub cost_per_hour: f64,
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub success: bool,
    pub agents: Vec<Agent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivatedAgent {
    pub id: u32,
    pub is_active: bool,
    pub deactivated_at: String,
    pub usage_cost: f64,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub success: bool,
    pub message: String,
    pub agent: DeactivatedAgent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance: f64,
    pub currency: String,
    pub last_updated: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdateRequest {
    pub amount: Option<f64>,
    pub tx_hash: Option<String>,
    pub operation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdateResponse {
    pub success: bool,
    pub new_balance: f64,
    pub transaction_id: String,
    pub tx_hash: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: u32,
    pub date: String,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionHistoryResponse {
    pub transactions: Vec<TransactionRecord>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifyRequest {
    pub payload: Option<JsonValue>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifyResponse {
    pub success: bool,
    pub verified: bool,
    pub tx_hash: String,
    pub status: String,
    pub block_number: Option<u64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusQuery {
    pub tx_hash: Option<String>,
    pub chain: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub tx_hash: String,
    pub chain: String,
    pub status: String,
    pub confirmed: bool,
    pub explorer_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUsage {
    pub agent_id: u32,
    pub name: String,
    pub hours: f64,
    pub cost: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub success: bool,
    pub period: String,
    pub total_hours: f64,
    pub total_cost: f64,
    pub currency: String,
    pub agents: Vec<AgentUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub date_range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub provider: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub text: String,
    pub updated_history: Vec<ChatMessage>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    pub question: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub answer: String,
    pub model: String,
    pub response_time: u64,
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: Option<JsonValue>,
    #[serde(default)]
    pub comment: Option<JsonValue>,
    #[serde(default)]
    pub context: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
