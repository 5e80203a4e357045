pub mod diff;
pub mod operations;
pub mod repository;

pub use diff::DiffResolver;
pub use operations::GitOps;
pub use repository::{default_target_branch, list_local_branches, local_branch_exists};
