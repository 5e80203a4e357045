#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

// Helper to run git in `cwd` with a fixed identity and no signing.
pub fn run_git(args: &[&str], cwd: &Path) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test User",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to execute git");

    if !output.status.success() {
        panic!(
            "`git {}` failed with exit code {:?}:\nSTDOUT: {}\nSTDERR: {}",
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    String::from_utf8(output.stdout).expect("Failed to convert stdout to string")
}

/// A throwaway repository whose first branch is `main`.
pub struct TestRepo {
    pub dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        run_git(&["init", "-q"], dir.path());
        run_git(&["symbolic-ref", "HEAD", "refs/heads/main"], dir.path());
        TestRepo { dir }
    }

    /// `main` with one commit holding `a.txt`, plus `feature` adding a line to it
    /// and `main` moving on afterwards with an unrelated file.
    pub fn with_diverged_branches() -> Self {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "hello\n", "Initial commit");
        repo.git(&["checkout", "-q", "-b", "feature"]);
        repo.commit_file("a.txt", "hello\nworld\n", "Add world");
        repo.git(&["checkout", "-q", "main"]);
        repo.commit_file("later.txt", "main only\n", "Main moves on");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self, args: &[&str]) -> String {
        run_git(args, self.path())
    }

    pub fn commit_file(&self, name: &str, content: &str, message: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self.git(&["add", name]);
        self.git(&["commit", "-q", "-m", message]);
    }
}
