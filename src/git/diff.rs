use super::operations::GitOps;
use super::repository::local_branch_exists;
use crate::errors::{map_command_error, GitError};
use crate::types::review::{DiffResult, HEAD_REF};
use std::path::Path;

/// Computes what a target ref adds on top of a base branch.
///
/// The diff runs from the merge base of the two refs to the target, so
/// commits made on the base after the branches diverged never show up.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffResolver;

impl DiffResolver {
    pub fn new() -> Self {
        DiffResolver
    }

    pub fn resolve(
        &self,
        repo_path: &Path,
        base_ref: &str,
        target_ref: &str,
    ) -> Result<DiffResult, GitError> {
        let git = GitOps::new(repo_path);

        for reference in [base_ref, target_ref] {
            if reference != HEAD_REF && !local_branch_exists(&git, reference)? {
                return Err(GitError::RefNotFound(reference.to_string()));
            }
        }

        let base_rev = qualified_ref(base_ref);
        let target_rev = qualified_ref(target_ref);

        let merge_base = self.merge_base(&git, base_ref, target_ref, &base_rev, &target_rev)?;
        tracing::info!(
            "Merge base of '{}' and '{}': {}",
            base_ref,
            target_ref,
            short_sha(&merge_base)
        );

        let output = git.execute_checked(&[
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--no-prefix",
            "-U3",
            merge_base.as_str(),
            target_rev.as_str(),
            "--",
        ])?;
        let diff = DiffResult::new(&output.stdout);

        if diff.is_empty {
            tracing::info!("No differences found between '{}' and '{}'", base_ref, target_ref);
        } else {
            tracing::info!(
                lines = diff.line_count(),
                chars = diff.char_count(),
                "Diff generated"
            );
        }
        Ok(diff)
    }

    fn merge_base(
        &self,
        git: &GitOps,
        base_ref: &str,
        target_ref: &str,
        base_rev: &str,
        target_rev: &str,
    ) -> Result<String, GitError> {
        let args = ["merge-base", base_rev, target_rev];
        let output = git.execute(&args)?;
        let commit = output.stdout.trim().to_string();

        // git exits with 1 and prints nothing when the histories are unrelated.
        if output.exit_code() == Some(1) && commit.is_empty() {
            return Err(GitError::NoCommonAncestor {
                base: base_ref.to_string(),
                target: target_ref.to_string(),
            });
        }
        if !output.is_success() || commit.is_empty() {
            return Err(map_command_error(&format!("git {}", args.join(" ")), output));
        }
        Ok(commit)
    }
}

/// Full `refs/heads/` name, so a tag or path sharing the branch name cannot be picked up.
fn qualified_ref(reference: &str) -> String {
    if reference == HEAD_REF {
        reference.to_string()
    } else {
        format!("refs/heads/{}", reference)
    }
}

fn short_sha(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}
