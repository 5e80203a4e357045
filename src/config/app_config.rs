use crate::errors::ConfigError;
use crate::ollama::prompt::{DEFAULT_REVIEW_TEMPLATE, DIFF_PLACEHOLDER};
use serde::Deserialize;
use std::collections::HashMap;

use super::{
    ollama_config::{OllamaConfig, PartialOllamaConfig},
    review_config::{PartialReviewConfig, ReviewConfig},
};

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "~/.config/prreview";
pub const USER_PROMPT_PATH: &str = "~/.config/prreview/prompts";

// Configuration file names
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const REVIEW_PROMPT: &str = "review.md";

/// Commented template written by `prreview init`
pub const CONFIG_TEMPLATE: &str = include_str!("../../assets/config.example.toml");

/// A prompt template loaded from disk, with the path it came from.
#[derive(Debug, Clone)]
pub struct PromptSource {
    pub origin: String,
    pub content: String,
}

/// Main Application Configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ollama: OllamaConfig,
    pub review: ReviewConfig,
    /// Review prompt template, guaranteed to contain `{diff}`
    pub review_prompt: String,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    pub ollama: Option<PartialOllamaConfig>,
    pub review: Option<PartialReviewConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            ollama: OllamaConfig::default(),
            review: ReviewConfig::default(),
            review_prompt: DEFAULT_REVIEW_TEMPLATE.to_string(),
        }
    }
}

impl AppConfig {
    /// Create AppConfig from partial config and environment, with the built-in prompt
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        Ok(AppConfig {
            ollama: OllamaConfig::from_env_or_file(partial.ollama, &env_map)?,
            review: ReviewConfig::from_partial(partial.review),
            review_prompt: DEFAULT_REVIEW_TEMPLATE.to_string(),
        })
    }

    /// Replace the review prompt with an override loaded from disk
    pub fn with_prompt(mut self, prompt: Option<PromptSource>) -> Result<Self, ConfigError> {
        if let Some(source) = prompt {
            if !source.content.contains(DIFF_PLACEHOLDER) {
                return Err(ConfigError::PromptPlaceholderMissing(source.origin));
            }
            tracing::debug!("Using review prompt from {}", source.origin);
            self.review_prompt = source.content;
        }
        Ok(self)
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn with_overrides(mut self, api_url: Option<String>, model_name: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.ollama.api_url = url;
        }
        if let Some(model) = model_name {
            self.ollama.model_name = model;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_as_partial_config() {
        let partial: PartialAppConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        let config = AppConfig::from_partial_and_env(Some(partial), HashMap::new()).unwrap();
        assert_eq!(config.ollama, OllamaConfig::default());
        assert_eq!(config.review, ReviewConfig::default());
    }

    #[test]
    fn test_prompt_override_requires_placeholder() {
        let prompt = PromptSource {
            origin: "prompts/review.md".to_string(),
            content: "Review this please".to_string(),
        };
        let err = AppConfig::default().with_prompt(Some(prompt)).unwrap_err();
        assert!(matches!(err, ConfigError::PromptPlaceholderMissing(origin) if origin == "prompts/review.md"));

        let prompt = PromptSource {
            origin: "prompts/review.md".to_string(),
            content: "Focus on SQL.\n{diff}\n".to_string(),
        };
        let config = AppConfig::default().with_prompt(Some(prompt)).unwrap();
        assert_eq!(config.review_prompt, "Focus on SQL.\n{diff}\n");
    }

    #[test]
    fn test_cli_overrides() {
        let config = AppConfig::default()
            .with_overrides(Some("http://gpu-box:11434/api/generate".to_string()), None);
        assert_eq!(config.ollama.api_url, "http://gpu-box:11434/api/generate");
        assert_eq!(config.ollama.model_name, "codellama");
    }
}
