use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP API to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    // --- Deployment Environment ---
    /// Runtime environment; "production" locks down the debug endpoint.
    #[arg(long = "node-env", env = "NODE_ENV", default_value = "development")]
    pub node_env: String,

    #[arg(long, env = "VERCEL_ENV")]
    pub vercel_env: Option<String>,

    #[arg(long, env = "VERCEL_REGION")]
    pub vercel_region: Option<String>,

    #[arg(long, env = "VERCEL_URL")]
    pub vercel_url: Option<String>,

    #[arg(long, env = "VERCEL_GIT_COMMIT_SHA")]
    pub vercel_git_commit_sha: Option<String>,

    /// Token required in `x-admin-debug-token` to reach /api/debug in production.
    #[arg(long, env = "ADMIN_DEBUG_TOKEN")]
    pub admin_debug_token: Option<String>,

    // --- Chat Provider Args ---
    /// Default chat provider (gemini, openrouter, anthropic, together)
    #[arg(long, env = "CHAT_PROVIDER", default_value = "gemini")]
    pub chat_provider: String,

    /// Model override for the default chat provider.
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    #[arg(long, env = "GOOGLE_GEMINI_API_KEY", hide_env_values = true)]
    pub google_gemini_api_key: Option<String>,

    /// Fallback Gemini key, used when GOOGLE_GEMINI_API_KEY is unset.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "TOGETHER_API_KEY", hide_env_values = true)]
    pub together_api_key: Option<String>,

    /// Public site URL, sent to OpenRouter as HTTP-Referer.
    #[arg(long, env = "SITE_URL", default_value = "https://neuroexpert.vercel.app")]
    pub site_url: String,

    /// Path to a JSON prompt configuration file. Built-in prompts are used if unset.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- Notification Args ---
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, env = "TELEGRAM_API_BASE", default_value = "https://api.telegram.org")]
    pub telegram_api_base: String,

    // --- Request Guard Args ---
    /// Header that lets origin-less state-changing requests through the origin guard.
    #[arg(long, env = "ORIGIN_GUARD_HEADER", default_value = "X-Requested-With")]
    pub origin_guard_header: String,

    /// Compare Origin host to Host exactly instead of by substring.
    #[arg(long, env = "STRICT_ORIGIN_CHECK", default_value = "false")]
    pub strict_origin_check: bool,

    /// Per-client, per-route rate limiting on /api/*.
    #[arg(long, env = "RATE_LIMIT", default_value = "true", action = clap::ArgAction::Set)]
    pub rate_limit: bool,
}
