//! Shared fixtures for integration tests.
//!
//! Repositories are real: created in temp directories and inspected with
//! the git CLI, so the tests see exactly what a user would.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use docshelf::core::types::BranchName;
use docshelf::git::Git;

/// Test fixture that creates a real git repository.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new repository with an initial commit on main.
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.write("README.md", "# Test Repo\n");
        repo.run_git(&["add", "README.md"]);
        repo.run_git(&["commit", "-m", "Initial commit"]);
        repo
    }

    /// Create a repository with no commits.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
        Self { dir }
    }

    /// Get the path to the repository.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open a Git interface to this repository.
    pub fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    /// Write a file in the working tree, creating parent directories.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    pub fn run_git(&self, args: &[&str]) -> String {
        run_git(self.path(), args)
    }

    /// Run git, returning whether it succeeded.
    pub fn try_git(&self, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("failed to run git")
            .status
            .success()
    }

    /// Contents of `path` on `branch`, as git sees it.
    pub fn show(&self, branch: &str, path: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["show", &format!("{branch}:{path}")])
            .current_dir(self.path())
            .output()
            .expect("failed to run git show");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Every path on `branch`, recursively.
    pub fn ls_tree(&self, branch: &str) -> Vec<String> {
        self.run_git(&["ls-tree", "-r", "--name-only", branch])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Tip of `branch`, if it exists.
    pub fn tip(&self, branch: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(self.path())
            .output()
            .expect("failed to run git rev-parse");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Number of commits reachable from `branch`.
    pub fn commit_count(&self, branch: &str) -> usize {
        self.run_git(&["rev-list", "--count", branch])
            .trim()
            .parse()
            .unwrap()
    }

    /// Create a bare repository next to this one and add it as `origin`.
    pub fn add_origin(&self) -> TempDir {
        let remote = TempDir::new().expect("failed to create temp dir");
        run_git(remote.path(), &["init", "--bare"]);
        let url = remote.path().to_str().unwrap().to_string();
        self.run_git(&["remote", "add", "origin", &url]);
        remote
    }
}

pub fn branch(name: &str) -> BranchName {
    BranchName::new(name).unwrap()
}

/// Run a git command in the given directory, returning stdout.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}
