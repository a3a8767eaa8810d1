pub mod chat;
pub mod diagnostics;
pub mod mock;
pub mod notify;

pub async fn health() -> &'static str {
    "ok"
}
