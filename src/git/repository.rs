use super::operations::GitOps;
use crate::errors::GitError;
use crate::types::review::has_git_metadata;
use std::path::Path;

/// Local branch names of the repository, in `for-each-ref` order.
pub fn list_local_branches(repo_path: &Path) -> Result<Vec<String>, GitError> {
    if !has_git_metadata(repo_path) {
        return Err(GitError::NotARepository(repo_path.to_path_buf()));
    }
    let output = GitOps::new(repo_path).execute_checked(&[
        "for-each-ref",
        "--format=%(refname:short)",
        "refs/heads/",
    ])?;
    Ok(output.stdout_lines())
}

/// True when `refs/heads/<name>` resolves in the repository.
pub fn local_branch_exists(git: &GitOps, name: &str) -> Result<bool, GitError> {
    let reference = format!("refs/heads/{name}");
    let output = git.execute(&["rev-parse", "--verify", "--quiet", reference.as_str()])?;
    Ok(output.is_success())
}

/// Picks the branch a review compares against when none is given.
///
/// The first preferred name that exists locally wins; otherwise the first
/// local branch; `None` when the repository has no branches yet.
pub fn default_target_branch(branches: &[String], preferred: &[String]) -> Option<String> {
    preferred
        .iter()
        .find(|candidate| branches.iter().any(|branch| branch == *candidate))
        .or_else(|| branches.first())
        .cloned()
}
