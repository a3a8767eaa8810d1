pub mod cli;
pub mod config;
pub mod llm;
pub mod mock;
pub mod models;
pub mod notify;
pub mod server;

use cli::Args;
use config::prompt::{ load_prompts, PromptConfig };
use config::Settings;
use llm::chat::ProviderRegistry;
use log::info;
use server::api::AppState;
use server::Server;
use std::error::Error;

fn configured(flag: bool) -> &'static str {
    if flag { "configured" } else { "not configured" }
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let settings = Settings::from_args(&args)?;
    let creds = &settings.credentials;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Environment: {}", settings.env.node_env);
    info!("Default Chat Provider: {}", settings.default_provider);
    if let Some(model) = &settings.chat_model {
        info!("Chat Model Override: {}", model);
    }
    info!("Gemini Key: {}", configured(creds.gemini_key().is_some()));
    info!("OpenRouter Key: {}", configured(creds.openrouter.is_some()));
    info!("Anthropic Key: {}", configured(creds.anthropic.is_some()));
    info!("Together Key: {}", configured(creds.together.is_some()));
    info!("Telegram: {}", configured(creds.telegram_configured()));
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("(built-in)"));
    info!("Origin Guard: header={} strict={}", settings.origin_guard_header, settings.strict_origin_check);
    info!("Rate Limiting: {}", settings.rate_limit);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let prompts = match args.prompts_path.as_deref() {
        Some(path) => load_prompts(path).map_err(|e| format!("Failed to load prompts from '{}': {}", path, e))?,
        None => PromptConfig::default(),
    };

    let providers = ProviderRegistry::from_configs(
        settings.provider_configs(&prompts),
        settings.default_provider
    )?;
    if providers.is_empty() {
        info!("No chat provider configured, the assistant will answer in demo mode");
    }

    let state = AppState::new(settings, prompts, providers)?;
    let server = Server::new(args.server_addr.clone(), state, args);
    server.run().await?;

    Ok(())
}
