//! Synthesized data for the dashboard endpoints. Nothing here is persisted;
//! the integration points that a real backend would need are kept as stubs.

pub mod analytics;

use chrono::{ Duration, Utc };
use lazy_static::lazy_static;
use log::debug;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::models::api::{
    Agent,
    AgentUsage,
    BalanceResponse,
    BalanceUpdateRequest,
    BalanceUpdateResponse,
    DeactivatedAgent,
    PaymentStatusQuery,
    PaymentStatusResponse,
    PaymentVerifyRequest,
    PaymentVerifyResponse,
    TransactionHistoryResponse,
    TransactionRecord,
    UsageResponse,
};

pub const MOCK_BALANCE: f64 = 100.0;
pub const CURRENCY: &str = "USD";
pub const DEFAULT_CHAIN: &str = "base";
const HISTORY_PAGE_SIZE: u32 = 10;

lazy_static! {
    static ref AGENT_CATALOG: Vec<Agent> = vec![
        Agent {
            id: 1,
            name: "Sales Assistant".to_string(),
            description: "Qualifies leads and answers product questions around the clock".to_string(),
            is_active: true,
            cost_per_hour: 0.5,
        },
        Agent {
            id: 2,
            name: "Support Agent".to_string(),
            description: "Resolves common customer requests and escalates the rest".to_string(),
            is_active: false,
            cost_per_hour: 0.75,
        },
        Agent {
            id: 3,
            name: "Analytics Advisor".to_string(),
            description: "Summarizes traffic and conversion trends with recommendations".to_string(),
            is_active: false,
            cost_per_hour: 1.0,
        }
    ];
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MockError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid agent id: {0}")]
    InvalidAgentId(String),
    #[error("Payment verification failed")]
    VerificationFailed,
}

pub fn agents() -> Vec<Agent> {
    AGENT_CATALOG.clone()
}

pub fn deactivate_agent(raw_id: &str) -> Result<DeactivatedAgent, MockError> {
    let id: u32 = raw_id
        .trim()
        .parse()
        .map_err(|_| MockError::InvalidAgentId(raw_id.to_string()))?;

    // Not implemented: session check, agent state update and usage billing.
    debug!("Agent {} deactivation is not persisted", id);

    Ok(DeactivatedAgent {
        id,
        is_active: false,
        deactivated_at: Utc::now().to_rfc3339(),
        usage_cost: 0.0,
    })
}

pub fn current_balance() -> BalanceResponse {
    // Not implemented: per-user balance lookup.
    BalanceResponse {
        balance: MOCK_BALANCE,
        currency: CURRENCY.to_string(),
        last_updated: Utc::now().to_rfc3339(),
    }
}

fn verify_transaction(tx_hash: &str) -> bool {
    debug!("On-chain verification of {} is not implemented, accepting", tx_hash);
    true
}

/// Applies a top-up (or a "subtract"/"withdraw" operation) to the mock
/// balance. `amount` and a non-empty `txHash` are checked first.
pub fn apply_balance_update(req: &BalanceUpdateRequest) -> Result<BalanceUpdateResponse, MockError> {
    let amount = req.amount.ok_or(MockError::MissingField("amount"))?;
    let tx_hash = blank_to_none(req.tx_hash.as_deref()).ok_or(MockError::MissingField("txHash"))?;

    verify_transaction(tx_hash);

    let new_balance = match req.operation.as_deref() {
        Some("subtract") | Some("withdraw") => MOCK_BALANCE - amount,
        _ => MOCK_BALANCE + amount,
    };

    Ok(BalanceUpdateResponse {
        success: true,
        new_balance,
        transaction_id: Uuid::new_v4().to_string(),
        tx_hash: tx_hash.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn days_ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).format("%Y-%m-%d").to_string()
}

fn deposit(id: u32, days: i64, description: &str, amount: f64, tx_hash: &str) -> TransactionRecord {
    TransactionRecord {
        id,
        date: days_ago(days),
        description: description.to_string(),
        amount,
        kind: "deposit".to_string(),
        status: "completed".to_string(),
        tx_hash: Some(tx_hash.to_string()),
        chain: Some(DEFAULT_CHAIN.to_string()),
        token: Some("USDC".to_string()),
        agent_id: None,
    }
}

fn payment(id: u32, days: i64, description: &str, amount: f64, agent_id: &str) -> TransactionRecord {
    TransactionRecord {
        id,
        date: days_ago(days),
        description: description.to_string(),
        amount,
        kind: "payment".to_string(),
        status: "completed".to_string(),
        tx_hash: None,
        chain: None,
        token: None,
        agent_id: Some(agent_id.to_string()),
    }
}

/// First page of the mock ledger, newest first.
pub fn transaction_history() -> TransactionHistoryResponse {
    // Not implemented: per-user ledger query, pagination and filtering.
    let transactions = vec![
        deposit(1, 0, "Balance top-up via x402", 500.0, "0x1234...5678"),
        payment(2, 1, "AI agent service charge", -50.0, "agent-001"),
        deposit(3, 2, "Balance top-up", 1000.0, "0xabcd...efgh"),
        payment(4, 3, "Analytics report charge", -25.0, "agent-002")
    ];

    TransactionHistoryResponse {
        total: transactions.len(),
        transactions,
        page: 1,
        limit: HISTORY_PAGE_SIZE,
    }
}

/// Verifies and settles a signed payment payload. Only the presence of
/// `payload` is checked; settlement is simulated.
pub fn verify_payment(req: &PaymentVerifyRequest) -> Result<PaymentVerifyResponse, MockError> {
    match &req.payload {
        None | Some(serde_json::Value::Null) => {
            return Err(MockError::MissingField("payload"));
        }
        Some(_) => {}
    }

    let tx_hash = blank_to_none(req.tx_hash.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| format!("0x{}", Uuid::new_v4().simple()));

    if !verify_transaction(&tx_hash) {
        return Err(MockError::VerificationFailed);
    }

    Ok(PaymentVerifyResponse {
        success: true,
        verified: true,
        tx_hash,
        status: "settled".to_string(),
        block_number: None,
        message: "Payment verified and settled".to_string(),
    })
}

pub fn explorer_url(tx_hash: &str, chain: &str) -> String {
    let base = match chain {
        "ethereum" => "https://etherscan.io",
        "polygon" => "https://polygonscan.com",
        "base-sepolia" => "https://sepolia.basescan.org",
        _ => "https://basescan.org",
    };
    format!("{}/tx/{}", base, tx_hash)
}

pub fn payment_status(query: &PaymentStatusQuery) -> Result<PaymentStatusResponse, MockError> {
    let tx_hash = blank_to_none(query.tx_hash.as_deref()).ok_or(MockError::MissingField("txHash"))?;
    let chain = blank_to_none(query.chain.as_deref()).unwrap_or(DEFAULT_CHAIN);

    let confirmed = verify_transaction(tx_hash);

    Ok(PaymentStatusResponse {
        success: true,
        tx_hash: tx_hash.to_string(),
        chain: chain.to_string(),
        status: (if confirmed { "confirmed" } else { "pending" }).to_string(),
        confirmed,
        explorer_url: explorer_url(tx_hash, chain),
    })
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = (10f64).powi(places);
    (value * factor).round() / factor
}

pub fn usage() -> UsageResponse {
    let mut rng = rand::thread_rng();
    let agents: Vec<AgentUsage> = AGENT_CATALOG.iter()
        .map(|agent| {
            let hours = round_to(rng.gen_range(0.0..120.0), 1);
            AgentUsage {
                agent_id: agent.id,
                name: agent.name.clone(),
                hours,
                cost: round_to(hours * agent.cost_per_hour, 2),
            }
        })
        .collect();

    let total_hours = round_to(agents.iter().map(|a| a.hours).sum(), 1);
    let total_cost = round_to(agents.iter().map(|a| a.cost).sum(), 2);

    UsageResponse {
        success: true,
        period: "current_month".to_string(),
        total_hours,
        total_cost,
        currency: CURRENCY.to_string(),
        agents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(amount: Option<f64>, tx: Option<&str>, op: Option<&str>) -> BalanceUpdateRequest {
        BalanceUpdateRequest {
            amount,
            tx_hash: tx.map(str::to_string),
            operation: op.map(str::to_string),
        }
    }

    #[test]
    fn catalog_has_three_agents_with_rates() {
        let rates: Vec<f64> = agents().iter().map(|a| a.cost_per_hour).collect();
        assert_eq!(rates, vec![0.5, 0.75, 1.0]);
    }

    #[test]
    fn missing_amount_is_checked_first() {
        let err = apply_balance_update(&update(None, None, None)).unwrap_err();
        assert_eq!(err, MockError::MissingField("amount"));
    }

    #[test]
    fn blank_tx_hash_is_missing() {
        let err = apply_balance_update(&update(Some(5.0), Some("  "), None)).unwrap_err();
        assert_eq!(err, MockError::MissingField("txHash"));
    }

    #[test]
    fn deposit_and_withdraw_adjust_mock_balance() {
        let up = apply_balance_update(&update(Some(25.0), Some("0xabc"), None)).unwrap();
        assert_eq!(up.new_balance, 125.0);
        assert_eq!(up.tx_hash, "0xabc");
        assert!(Uuid::parse_str(&up.transaction_id).is_ok());

        let down = apply_balance_update(&update(Some(40.0), Some("0xdef"), Some("withdraw"))).unwrap();
        assert_eq!(down.new_balance, 60.0);
    }

    #[test]
    fn history_lists_deposits_and_payments() {
        let history = transaction_history();
        assert_eq!(history.total, 4);
        assert_eq!((history.page, history.limit), (1, 10));
        assert_eq!(history.transactions[0].date, Utc::now().format("%Y-%m-%d").to_string());
        let net: f64 = history.transactions.iter().map(|t| t.amount).sum();
        assert_eq!(net, 1425.0);
        assert!(history.transactions.iter().filter(|t| t.kind == "payment").all(|t| t.tx_hash.is_none()));
    }

    #[test]
    fn payment_verify_requires_payload() {
        let err = verify_payment(&PaymentVerifyRequest::default()).unwrap_err();
        assert_eq!(err, MockError::MissingField("payload"));

        let req = PaymentVerifyRequest {
            payload: Some(serde_json::Value::Null),
            tx_hash: Some("0xfeed".into()),
        };
        assert_eq!(verify_payment(&req).unwrap_err(), MockError::MissingField("payload"));
    }

    #[test]
    fn payment_verify_settles_with_given_or_generated_hash() {
        let req = PaymentVerifyRequest {
            payload: Some(serde_json::json!({ "signature": "0x01" })),
            tx_hash: Some("0xfeed".into()),
        };
        let verified = verify_payment(&req).unwrap();
        assert!(verified.verified);
        assert_eq!(verified.tx_hash, "0xfeed");

        let req = PaymentVerifyRequest { tx_hash: None, ..req };
        let verified = verify_payment(&req).unwrap();
        assert!(verified.tx_hash.starts_with("0x"));
        assert_eq!(verified.tx_hash.len(), 34);
    }

    #[test]
    fn payment_status_needs_tx_hash_and_defaults_chain() {
        let missing = PaymentStatusQuery { tx_hash: Some(" ".into()), chain: None };
        assert_eq!(payment_status(&missing).unwrap_err(), MockError::MissingField("txHash"));

        let query = PaymentStatusQuery { tx_hash: Some("0xabc".into()), chain: None };
        let status = payment_status(&query).unwrap();
        assert_eq!(status.chain, "base");
        assert_eq!(status.explorer_url, "https://basescan.org/tx/0xabc");

        assert_eq!(explorer_url("0x1", "polygon"), "https://polygonscan.com/tx/0x1");
    }

    #[test]
    fn deactivate_rejects_non_numeric_id() {
        assert_eq!(deactivate_agent("abc").unwrap_err(), MockError::InvalidAgentId("abc".into()));
        let agent = deactivate_agent("2").unwrap();
        assert_eq!(agent.id, 2);
        assert!(!agent.is_active);
    }

    #[test]
    fn usage_totals_match_agents() {
        let usage = usage();
        assert_eq!(usage.agents.len(), 3);
        let cost: f64 = usage.agents.iter().map(|a| a.cost).sum();
        assert!((usage.total_cost - cost).abs() < 0.01);
        for agent in &usage.agents {
            assert!(agent.hours >= 0.0 && agent.hours <= 120.0);
        }
    }
}
