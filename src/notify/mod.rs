pub mod dispatcher;
pub mod telegram;

use serde_json::Value as JsonValue;

pub use self::dispatcher::NotificationDispatcher;
pub use self::telegram::{ NotifyError, TelegramClient };

/// Messages sent to the operators' Telegram chat.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    RoiCalculation {
        revenue: JsonValue,
        costs: JsonValue,
        roi: JsonValue,
        timestamp: String,
    },
    ContactForm {
        name: String,
        phone: Option<String>,
        email: Option<String>,
        message: Option<String>,
        timestamp: String,
    },
    AiChat {
        question: String,
        answer: String,
        model: String,
        timestamp: String,
    },
    Feedback {
        rating: f64,
        comment: String,
        context: JsonValue,
        timestamp: String,
    },
    Generic(JsonValue),
}

fn field(data: &JsonValue, key: &str) -> Option<String> {
    match data.get(key)? {
        JsonValue::Null => None,
        JsonValue::String(s) if s.trim().is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn display(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "-".to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => group_thousands(i),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    if value < 0 { format!("-{}", out) } else { out }
}

impl Notification {
    /// Maps a `{type, data}` payload from the notify endpoint. Unknown
    /// types keep the raw data.
    pub fn from_request(kind: &str, data: JsonValue) -> Self {
        let timestamp = field(&data, "timestamp").unwrap_or_else(now);
        match kind {
            "roi_calculation" =>
                Notification::RoiCalculation {
                    revenue: data.get("revenue").cloned().unwrap_or(JsonValue::Null),
                    costs: data.get("costs").cloned().unwrap_or(JsonValue::Null),
                    roi: data.get("roi").cloned().unwrap_or(JsonValue::Null),
                    timestamp,
                },
            "contact_form" =>
                Notification::ContactForm {
                    name: field(&data, "name").unwrap_or_else(|| "-".to_string()),
                    phone: field(&data, "phone"),
                    email: field(&data, "email"),
                    message: field(&data, "message"),
                    timestamp,
                },
            "ai_chat" =>
                Notification::AiChat {
                    question: field(&data, "question").unwrap_or_default(),
                    answer: field(&data, "answer").unwrap_or_default(),
                    model: field(&data, "model").unwrap_or_default(),
                    timestamp,
                },
            _ => Notification::Generic(data),
        }
    }

    pub fn ai_chat(question: &str, answer: &str, model: &str) -> Self {
        Notification::AiChat {
            question: question.to_string(),
            answer: truncate_answer(answer, 500),
            model: model.to_string(),
            timestamp: now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::RoiCalculation { .. } => "roi_calculation",
            Notification::ContactForm { .. } => "contact_form",
            Notification::AiChat { .. } => "ai_chat",
            Notification::Feedback { .. } => "feedback",
            Notification::Generic(_) => "generic",
        }
    }

    /// Telegram Markdown body.
    pub fn render(&self) -> String {
        match self {
            Notification::RoiCalculation { revenue, costs, roi, timestamp } =>
                format!(
                    "🧮 *New ROI calculation*\n\n💰 Revenue: {}₽\n📊 Costs: {}₽\n📈 ROI: {}%\n⏱ Time: {}",
                    display(revenue),
                    display(costs),
                    display(roi),
                    timestamp
                ),
            Notification::ContactForm { name, phone, email, message, timestamp } =>
                format!(
                    "📬 *New request*\n\n👤 Name: {}\n📞 Phone: {}\n📧 Email: {}\n💬 Message: {}\n⏱ Time: {}",
                    name,
                    phone.as_deref().unwrap_or("not provided"),
                    email.as_deref().unwrap_or("not provided"),
                    message.as_deref().unwrap_or("no message"),
                    timestamp
                ),
            Notification::AiChat { question, answer, model, timestamp } =>
                format!(
                    "🤖 *AI chat activity*\n\n❓ Question: {}\n💡 Answer: {}\n🎯 Model: {}\n⏱ Time: {}",
                    question,
                    answer,
                    model,
                    timestamp
                ),
            Notification::Feedback { rating, comment, context, timestamp } => {
                let comment = if comment.is_empty() { "-" } else { comment.as_str() };
                let context = match context {
                    JsonValue::Object(map) if !map.is_empty() => pretty(context),
                    _ => "-".to_string(),
                };
                format!(
                    "⭐ *New feedback*\n\nRating: {}/5\nComment: {}\nContext: {}\nTime: {}",
                    rating,
                    comment,
                    context,
                    timestamp
                )
            }
            Notification::Generic(data) => format!("📢 *Notification*\n\n{}", pretty(data)),
        }
    }
}

fn pretty(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Cuts to `limit` characters and appends "..." when anything was dropped.
pub fn truncate_answer(answer: &str, limit: usize) -> String {
    match answer.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &answer[..idx]),
        None => answer.to_string(),
    }
}
