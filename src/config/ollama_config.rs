use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const ENV_OLLAMA_URL: &str = "PRREVIEW_OLLAMA_URL";
pub const ENV_OLLAMA_MODEL: &str = "PRREVIEW_OLLAMA_MODEL";
pub const ENV_CONNECT_TIMEOUT: &str = "PRREVIEW_CONNECT_TIMEOUT";
pub const ENV_REQUEST_TIMEOUT: &str = "PRREVIEW_REQUEST_TIMEOUT";
pub const ENV_STREAM: &str = "PRREVIEW_STREAM";

/// Ollama endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Full URL of the generate endpoint
    pub api_url: String,
    pub model_name: String,
    pub connect_timeout_secs: u64,
    /// Upper bound for receiving the complete response, in either transfer mode
    pub request_timeout_secs: u64,
    /// Try the incremental transfer before the single blocking request
    pub stream: bool,
}

/// Partial Ollama configuration as read from the TOML file
#[derive(Deserialize, Debug, Default)]
pub struct PartialOllamaConfig {
    pub api_url: Option<String>,
    pub model_name: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub stream: Option<bool>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            api_url: default_api_url(),
            model_name: default_model_name(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            stream: true,
        }
    }
}

impl OllamaConfig {
    /// Environment values override the file, the file overrides built-in defaults.
    pub fn from_env_or_file(
        file_config: Option<PartialOllamaConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let file_config = file_config.unwrap_or_default();

        let api_url = env_map
            .get(ENV_OLLAMA_URL)
            .cloned()
            .or(file_config.api_url)
            .unwrap_or_else(default_api_url);

        let model_name = env_map
            .get(ENV_OLLAMA_MODEL)
            .cloned()
            .or(file_config.model_name)
            .unwrap_or_else(default_model_name);

        let connect_timeout_secs = parse_env(env_map, ENV_CONNECT_TIMEOUT)?
            .or(file_config.connect_timeout_secs)
            .unwrap_or_else(default_connect_timeout);

        let request_timeout_secs = parse_env(env_map, ENV_REQUEST_TIMEOUT)?
            .or(file_config.request_timeout_secs)
            .unwrap_or_else(default_request_timeout);

        let stream = parse_env(env_map, ENV_STREAM)?
            .or(file_config.stream)
            .unwrap_or(true);

        let config = OllamaConfig {
            api_url,
            model_name,
            connect_timeout_secs,
            request_timeout_secs,
            stream,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ollama.connect_timeout_secs".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs < self.connect_timeout_secs {
            return Err(ConfigError::InvalidValue(
                "ollama.request_timeout_secs".to_string(),
                "must not be shorter than the connect timeout".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match env_map.get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("cannot parse '{raw}'"))
        }),
    }
}

// Default functions
fn default_api_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_model_name() -> String {
    "codellama".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OllamaConfig::from_env_or_file(None, &HashMap::new()).unwrap();
        assert_eq!(config.api_url, "http://localhost:11434/api/generate");
        assert_eq!(config.model_name, "codellama");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert!(config.stream);
    }

    #[test]
    fn test_env_overrides_file() {
        let file_config = PartialOllamaConfig {
            api_url: Some("http://file:11434/api/generate".to_string()),
            model_name: Some("mistral".to_string()),
            connect_timeout_secs: Some(3),
            request_timeout_secs: Some(60),
            stream: Some(true),
        };

        let mut env_map = HashMap::new();
        env_map.insert(ENV_OLLAMA_MODEL.to_string(), "phi3:mini".to_string());
        env_map.insert(ENV_STREAM.to_string(), "false".to_string());

        let config = OllamaConfig::from_env_or_file(Some(file_config), &env_map).unwrap();
        assert_eq!(config.api_url, "http://file:11434/api/generate");
        assert_eq!(config.model_name, "phi3:mini");
        assert_eq!(config.connect_timeout_secs, 3);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(!config.stream);
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let mut env_map = HashMap::new();
        env_map.insert(ENV_REQUEST_TIMEOUT.to_string(), "soon".to_string());

        let err = OllamaConfig::from_env_or_file(None, &env_map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == ENV_REQUEST_TIMEOUT));
    }

    #[test]
    fn test_request_timeout_must_cover_connect_timeout() {
        let file_config = PartialOllamaConfig {
            connect_timeout_secs: Some(10),
            request_timeout_secs: Some(2),
            ..Default::default()
        };
        assert!(OllamaConfig::from_env_or_file(Some(file_config), &HashMap::new()).is_err());
    }
}
