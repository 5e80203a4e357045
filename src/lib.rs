pub mod args;
pub mod config;
pub mod errors;
pub mod git;
pub mod handlers;
pub mod logging;
pub mod ollama;
pub mod review;
pub mod types;

// Re-export commonly used items for convenience
pub use config::AppConfig;
pub use errors::AppError;
