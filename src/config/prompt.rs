use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use log::info;

#[derive(Debug)]
pub enum PromptError {
    MissingField(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::MissingField(key) => write!(f, "Prompt field '{}' is missing or empty", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are the AI assistant of NeuroExpert, a studio that builds \
websites, online stores, mobile apps and SaaS platforms with a built-in AI specialist. \
Answer briefly and professionally, give concrete recommendations, and offer to connect \
the visitor with a manager for pricing details.";

const DEFAULT_DEMO_ANSWER: &str = "I am the NeuroExpert AI assistant. We build websites, apps and \
online stores with a built-in AI specialist. Would you like to know more about our services?";

const DEFAULT_UNAVAILABLE: &str = "Sorry, the AI assistant is temporarily unavailable. \
Please call +7 (904) 047-63-83 or write to aineuroexpert@gmail.com.";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DemoResponse {
    pub keyword: String,
    pub answer: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub system_prompt: String,
    #[serde(default)]
    pub demo_responses: Vec<DemoResponse>,
    #[serde(default = "default_demo_answer")]
    pub demo_default: String,
    #[serde(default = "default_unavailable")]
    pub unavailable_message: String,
}

fn default_demo_answer() -> String {
    DEFAULT_DEMO_ANSWER.to_string()
}

fn default_unavailable() -> String {
    DEFAULT_UNAVAILABLE.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        let demo = |keyword: &str, answer: &str| DemoResponse {
            keyword: keyword.to_string(),
            answer: answer.to_string(),
        };
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            demo_responses: vec![
                demo(
                    "price",
                    "Plans start at 39,900₽/month for small projects. The Business plan is \
                     89,900₽/month; large platforms start at 199,900₽/month."
                ),
                demo(
                    "what can you",
                    "We build online stores with AI consultants, mobile apps with a built-in \
                     assistant, corporate sites with an AI sales team, learning platforms and SaaS."
                ),
                demo(
                    "how long",
                    "A launch takes 2-4 weeks: a landing page about 2 weeks, an online store 3, \
                     a mobile app 4."
                )
            ],
            demo_default: default_demo_answer(),
            unavailable_message: default_unavailable(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PromptError::MissingField("system_prompt".to_string()));
        }
        if self.demo_default.trim().is_empty() {
            return Err(PromptError::MissingField("demo_default".to_string()));
        }
        Ok(())
    }

    /// Canned answer for demo mode: first entry whose keyword occurs in the
    /// lowercased question.
    pub fn demo_answer(&self, question: &str) -> &str {
        let lowered = question.to_lowercase();
        self.demo_responses
            .iter()
            .find(|r| lowered.contains(&r.keyword.to_lowercase()))
            .map(|r| r.answer.as_str())
            .unwrap_or(&self.demo_default)
    }
}

pub fn load_prompts(path: &str) -> Result<PromptConfig, PromptError> {
    let file_content = fs::read_to_string(path)?;
    let config = load_prompts_from_str(&file_content)?;
    info!("Loaded prompt configuration from '{}'", path);
    Ok(config)
}

pub fn load_prompts_from_str(json: &str) -> Result<PromptConfig, PromptError> {
    let config: PromptConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_answer_matches_keyword_case_insensitively() {
        let prompts = PromptConfig::default();
        assert!(prompts.demo_answer("What's the PRICE of a store?").contains("39,900"));
        assert_eq!(prompts.demo_answer("tell me a joke"), prompts.demo_default);
    }

    #[test]
    fn parses_partial_file_with_defaults() {
        let config = load_prompts_from_str(
            r#"{ "system_prompt": "Be kind.", "demo_responses": [{ "keyword": "hours", "answer": "24/7" }] }"#
        ).unwrap();
        assert_eq!(config.system_prompt, "Be kind.");
        assert_eq!(config.demo_answer("opening hours?"), "24/7");
        assert_eq!(config.unavailable_message, DEFAULT_UNAVAILABLE);
    }

    #[test]
    fn blank_system_prompt_is_rejected() {
        let err = load_prompts_from_str(r#"{ "system_prompt": "  " }"#).unwrap_err();
        assert_eq!(err.to_string(), "Prompt field 'system_prompt' is missing or empty");
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = load_prompts("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, PromptError::IoError(_)));
    }
}
