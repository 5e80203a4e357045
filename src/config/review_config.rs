use serde::Deserialize;

/// Configuration for review runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    /// Branches tried, in order, when no target branch is given
    pub preferred_target_branches: Vec<String>,

    /// Custom prompt template (supports ~ expansion); must contain `{diff}`
    pub prompt_file: Option<String>,
}

/// Partial Review Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialReviewConfig {
    pub preferred_target_branches: Option<Vec<String>>,
    pub prompt_file: Option<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self::from_partial(None)
    }
}

impl ReviewConfig {
    /// Create ReviewConfig from partial config with defaults
    pub fn from_partial(partial: Option<PartialReviewConfig>) -> Self {
        let partial = partial.unwrap_or_default();

        Self {
            preferred_target_branches: partial
                .preferred_target_branches
                .unwrap_or_else(default_preferred_target_branches),
            prompt_file: partial.prompt_file.filter(|path| !path.trim().is_empty()),
        }
    }
}

fn default_preferred_target_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string(), "develop".to_string()]
}
