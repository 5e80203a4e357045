pub mod app_config;
pub mod loader;
pub mod ollama_config;
pub mod review_config;

// Re-export commonly used types
pub use app_config::AppConfig;
pub use loader::ConfigLoader;
pub use ollama_config::OllamaConfig;
pub use review_config::ReviewConfig;

pub use app_config::{CONFIG_FILE_NAME, REVIEW_PROMPT};
