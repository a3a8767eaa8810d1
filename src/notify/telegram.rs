use log::debug;
use reqwest::Client;
use serde::{ Deserialize, Serialize };
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram returned HTTP {status}: {body}")]
    Api {
        status: u16,
        body: String,
    },
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    ok: bool,
}

pub struct TelegramClient {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, bot_token: String, chat_id: String) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    /// Posts one Markdown message; the returned flag is Telegram's own `ok`.
    pub async fn send(&self, text: &str) -> Result<bool, NotifyError> {
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let resp = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Api { status: status.as_u16(), body });
        }

        let parsed: SendMessageResponse = resp.json().await?;
        debug!("Telegram sendMessage ok={}", parsed.ok);
        Ok(parsed.ok)
    }
}
