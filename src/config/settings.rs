use std::error::Error;

use crate::cli::Args;
use crate::config::prompt::PromptConfig;
use crate::llm::{ ProviderConfig, ProviderKind };

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Deployment metadata surfaced by the diagnostic endpoints.
#[derive(Clone, Debug)]
pub struct RuntimeEnv {
    pub node_env: String,
    pub vercel_env: Option<String>,
    pub vercel_region: Option<String>,
    pub vercel_url: Option<String>,
    pub git_commit: Option<String>,
    pub admin_debug_token: Option<String>,
}

impl Default for RuntimeEnv {
    fn default() -> Self {
        Self {
            node_env: "development".to_string(),
            vercel_env: None,
            vercel_region: None,
            vercel_url: None,
            git_commit: None,
            admin_debug_token: None,
        }
    }
}

impl RuntimeEnv {
    pub fn is_production(&self) -> bool {
        self.node_env.eq_ignore_ascii_case("production")
    }
}

#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub google_gemini: Option<String>,
    pub gemini: Option<String>,
    pub openrouter: Option<String>,
    pub anthropic: Option<String>,
    pub together: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Credentials {
    pub fn gemini_key(&self) -> Option<&str> {
        self.google_gemini.as_deref().or(self.gemini.as_deref())
    }

    pub fn key_for(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Gemini => self.gemini_key(),
            ProviderKind::OpenRouter => self.openrouter.as_deref(),
            ProviderKind::Anthropic => self.anthropic.as_deref(),
            ProviderKind::Together => self.together.as_deref(),
        }
    }

    pub fn telegram_configured(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub env: RuntimeEnv,
    pub credentials: Credentials,
    pub default_provider: ProviderKind,
    pub chat_model: Option<String>,
    pub site_url: String,
    pub telegram_api_base: String,
    pub origin_guard_header: String,
    pub strict_origin_check: bool,
    pub rate_limit: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: RuntimeEnv::default(),
            credentials: Credentials::default(),
            default_provider: ProviderKind::Gemini,
            chat_model: None,
            site_url: "https://neuroexpert.vercel.app".to_string(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            origin_guard_header: "X-Requested-With".to_string(),
            strict_origin_check: false,
            rate_limit: true,
        }
    }
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let default_provider: ProviderKind = args.chat_provider.parse()?;

        Ok(Self {
            env: RuntimeEnv {
                node_env: args.node_env.clone(),
                vercel_env: non_empty(&args.vercel_env),
                vercel_region: non_empty(&args.vercel_region),
                vercel_url: non_empty(&args.vercel_url),
                git_commit: non_empty(&args.vercel_git_commit_sha),
                admin_debug_token: non_empty(&args.admin_debug_token),
            },
            credentials: Credentials {
                google_gemini: non_empty(&args.google_gemini_api_key),
                gemini: non_empty(&args.gemini_api_key),
                openrouter: non_empty(&args.openrouter_api_key),
                anthropic: non_empty(&args.anthropic_api_key),
                together: non_empty(&args.together_api_key),
                telegram_bot_token: non_empty(&args.telegram_bot_token),
                telegram_chat_id: non_empty(&args.telegram_chat_id),
            },
            default_provider,
            chat_model: non_empty(&args.chat_model),
            site_url: args.site_url.clone(),
            telegram_api_base: args.telegram_api_base.clone(),
            origin_guard_header: args.origin_guard_header.clone(),
            strict_origin_check: args.strict_origin_check,
            rate_limit: args.rate_limit,
        })
    }

    /// One config per vendor; the model override only applies to the
    /// default provider.
    pub fn provider_configs(&self, prompts: &PromptConfig) -> Vec<ProviderConfig> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| {
                let model = if kind == self.default_provider { self.chat_model.clone() } else { None };
                ProviderConfig::new(
                    kind,
                    self.credentials.key_for(kind).map(str::to_string),
                    prompts.system_prompt.clone()
                )
                    .with_model(model)
                    .with_site_url(Some(self.site_url.clone()))
            })
            .collect()
    }
}
