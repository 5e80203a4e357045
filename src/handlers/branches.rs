use crate::{
    config::AppConfig,
    errors::AppError,
    git::{default_target_branch, list_local_branches},
};
use colored::Colorize;
use std::path::Path;

/// Prints local branches, marking the one `review` compares against by default.
pub fn handle_branches(config: &AppConfig, repo: &Path) -> Result<(), AppError> {
    let branches = list_local_branches(repo)?;
    if branches.is_empty() {
        println!("No local branches found.");
        return Ok(());
    }

    let default_target = default_target_branch(&branches, &config.review.preferred_target_branches);
    for branch in &branches {
        if default_target.as_deref() == Some(branch.as_str()) {
            println!("* {} {}", branch.bold(), "(default target)".dimmed());
        } else {
            println!("  {}", branch);
        }
    }
    Ok(())
}
