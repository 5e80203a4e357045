use crate::errors::ConfigError;
use std::{collections::HashMap, env, fs, path::Path, path::PathBuf};

use super::{
    app_config::{
        AppConfig, PartialAppConfig, PromptSource, CONFIG_FILE_NAME, CONFIG_TEMPLATE,
        REVIEW_PROMPT, USER_CONFIG_PATH, USER_PROMPT_PATH,
    },
    ollama_config::{
        ENV_CONNECT_TIMEOUT, ENV_OLLAMA_MODEL, ENV_OLLAMA_URL, ENV_REQUEST_TIMEOUT, ENV_STREAM,
    },
};

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self { base_path: None }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    /// Load complete application configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let config_path = self.config_file_path();
        let partial_config = self.load_partial_config(&config_path)?;
        let env_map = self.collect_env_vars();

        let config = AppConfig::from_partial_and_env(partial_config, env_map)?;
        let prompt = self.load_prompt(config.review.prompt_file.as_deref())?;
        config.with_prompt(prompt)
    }

    /// Path of `config.toml` (not required to exist)
    pub fn config_file_path(&self) -> PathBuf {
        self.extract_file_path(USER_CONFIG_PATH, CONFIG_FILE_NAME)
    }

    /// Write the commented configuration template
    pub fn initialize_config(&self, force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = self.config_file_path();
        if config_path.exists() && !force {
            return Err(ConfigError::AlreadyExists(
                config_path.to_string_lossy().to_string(),
            ));
        }

        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).map_err(|e| {
                ConfigError::FileWrite(config_dir.to_string_lossy().to_string(), e)
            })?;
        }
        fs::write(&config_path, CONFIG_TEMPLATE).map_err(|e| {
            ConfigError::FileWrite(config_path.to_string_lossy().to_string(), e)
        })?;

        tracing::info!("Initialized configuration file: {:?}", config_path);
        Ok(config_path)
    }

    /// Resolve a path under the user config tree, honouring the test base path
    fn extract_file_path(&self, base_dir: &str, file_name: &str) -> PathBuf {
        self.expand(base_dir).join(file_name)
    }

    fn expand(&self, path: &str) -> PathBuf {
        match &self.base_path {
            Some(base_path) if path.starts_with("~/") => {
                base_path.join(path.trim_start_matches("~/"))
            }
            _ => PathBuf::from(shellexpand::tilde(path).as_ref()),
        }
    }

    /// Load partial configuration from TOML file
    fn load_partial_config(
        &self,
        config_path: &Path,
    ) -> Result<Option<PartialAppConfig>, ConfigError> {
        if !config_path.exists() {
            tracing::debug!("No configuration file at {:?}, using defaults", config_path);
            return Ok(None);
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::FileRead(config_path.to_string_lossy().to_string(), e)
        })?;

        let partial_config: PartialAppConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::TomlParse(config_path.to_string_lossy().to_string(), e)
        })?;

        Ok(Some(partial_config))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let env_keys = [
            ENV_OLLAMA_URL,
            ENV_OLLAMA_MODEL,
            ENV_CONNECT_TIMEOUT,
            ENV_REQUEST_TIMEOUT,
            ENV_STREAM,
        ];

        let mut env_map = HashMap::new();
        for key in &env_keys {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }

    /// Load the review prompt override: an explicit file first, then the user prompt directory
    fn load_prompt(&self, prompt_file: Option<&str>) -> Result<Option<PromptSource>, ConfigError> {
        let path = match prompt_file {
            Some(explicit) => self.expand(explicit),
            None => {
                let default_path = self.extract_file_path(USER_PROMPT_PATH, REVIEW_PROMPT);
                if !default_path.exists() {
                    return Ok(None);
                }
                default_path
            }
        };

        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::FileRead(path.to_string_lossy().to_string(), e))?;
        Ok(Some(PromptSource {
            origin: path.to_string_lossy().to_string(),
            content,
        }))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
