use axum::{
    extract::DefaultBodyLimit,
    http::{ header, HeaderName, HeaderValue },
    middleware::from_fn_with_state,
    routing::{ get, post },
    Router,
};
use log::{ debug, error, info };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use tower_http::set_header::SetResponseHeaderLayer;

use super::guard::{ origin_guard, OriginGuard, OriginPolicy };
use super::handlers::{ self, chat, diagnostics, mock, notify };
use super::rate_limit::{ rate_limit, ApiRateLimiter };
use crate::config::prompt::PromptConfig;
use crate::config::Settings;
use crate::llm::chat::ProviderRegistry;
use crate::notify::{ Notification, NotificationDispatcher, TelegramClient };

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub prompts: Arc<PromptConfig>,
    pub providers: ProviderRegistry,
    pub telegram: Option<Arc<TelegramClient>>,
    pub notifier: Option<NotificationDispatcher>,
    pub guard: Arc<OriginGuard>,
    pub rate_limiter: Option<Arc<ApiRateLimiter>>,
}

impl AppState {
    /// Must be called inside a Tokio runtime: the notification dispatcher
    /// spawns its worker here.
    pub fn new(
        settings: Settings,
        prompts: PromptConfig,
        providers: ProviderRegistry
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let policy = if settings.strict_origin_check {
            OriginPolicy::Strict
        } else {
            OriginPolicy::Substring
        };
        let guard = Arc::new(OriginGuard::new(policy, &settings.origin_guard_header)?);

        let telegram = match (
            settings.credentials.telegram_bot_token.clone(),
            settings.credentials.telegram_chat_id.clone(),
        ) {
            (Some(token), Some(chat_id)) =>
                Some(Arc::new(TelegramClient::new(&settings.telegram_api_base, token, chat_id))),
            _ => None,
        };
        let notifier = telegram.clone().map(NotificationDispatcher::spawn);

        let rate_limiter = settings.rate_limit.then(|| Arc::new(ApiRateLimiter::default()));

        Ok(Self {
            settings: Arc::new(settings),
            prompts: Arc::new(prompts),
            providers,
            telegram,
            notifier,
            guard,
            rate_limiter,
        })
    }

    pub fn notify(&self, notification: Notification) {
        match &self.notifier {
            Some(dispatcher) => {
                dispatcher.notify(notification);
            }
            None => debug!("Telegram not configured, skipping {} notification", notification.kind()),
        }
    }
}

fn security_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/agents/list", get(mock::list_agents))
        .route("/api/agents/deactivate/{id}", post(mock::deactivate_agent))
        .route("/api/balance/get", get(mock::get_balance))
        .route("/api/balance/update", post(mock::update_balance))
        .route("/api/transactions/history", get(mock::transaction_history))
        .route("/api/payment/verify", get(mock::payment_status).post(mock::verify_payment))
        .route("/api/agent/usage", get(mock::agent_usage))
        .route("/api/analytics/google", get(mock::google_analytics))
        .route("/api/analytics/yandex", get(mock::yandex_analytics))
        .route("/api/chat", post(chat::chat))
        .route("/api/assistant", post(chat::assistant))
        .route("/api/telegram-notify", post(notify::telegram_notify))
        .route(
            "/api/feedback",
            post(notify::feedback).layer(DefaultBodyLimit::max(notify::FEEDBACK_MAX_BYTES))
        )
        .route("/api/debug", get(diagnostics::debug_env))
        .route("/api/test-env", get(diagnostics::test_env))
        .route("/api/simple-test", get(diagnostics::simple_test))
        .route("/api/check-openrouter", get(diagnostics::check_openrouter));

    if let Some(limiter) = state.rate_limiter.clone() {
        app = app.layer(from_fn_with_state(limiter, rate_limit));
    }

    app.layer(from_fn_with_state(state.guard.clone(), origin_guard))
        .layer(cors)
        .layer(security_header(header::X_FRAME_OPTIONS, "DENY"))
        .layer(security_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .layer(security_header(header::X_XSS_PROTECTION, "1; mode=block"))
        .layer(security_header(header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .layer(
            security_header(
                HeaderName::from_static("permissions-policy"),
                "camera=(), microphone=(), geolocation=()"
            )
        )
        .with_state(state)
}

pub async fn start_http_server(
    server_addr: &str,
    state: AppState,
    tls: Option<(String, String)>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = server_addr.parse::<SocketAddr>()?;

    if let Some(limiter) = &state.rate_limiter {
        limiter.spawn_pruner();
    }

    let app = router(state);

    if let Some((cert_path, key_path)) = tls {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let tls_config = axum_server::tls_rustls::RustlsConfig
            ::from_pem_file(&cert_path, &key_path).await
            .map_err(|e| format!("Failed to load TLS certificate '{}' / key '{}': {}", cert_path, key_path, e))?;

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server
            ::bind_rustls(addr, tls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>()).await
            .map_err(|e| {
                error!("HTTPS server error: {}", e);
                e
            })?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("Starting HTTP API server on: http://{}", addr);
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    }

    Ok(())
}
