//! Shared fixtures for integration tests.
//!
//! A [`RemoteFixture`] is a bare repository standing in for the hosted
//! remote, plus a seed clone used to push commits to it. All setup goes
//! through the git CLI so the code under test never builds its own fixtures.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use cascade_merge::core::types::{Author, BranchName, Credentials};
use cascade_merge::git::{Git, OpenMode};

/// Branches every fixture starts with, all at the initial commit.
pub const BRANCHES: [&str; 4] = ["master", "develop", "release/1.0", "release/1.2"];

/// Bare remote plus a seed working copy.
pub struct RemoteFixture {
    dir: TempDir,
}

impl RemoteFixture {
    /// Remote with master, develop, release/1.0 and release/1.2.
    pub fn new() -> Self {
        Self::with_branches(&BRANCHES[1..])
    }

    /// Remote with master plus `branches`, all at the initial commit.
    pub fn with_branches(branches: &[&str]) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let fixture = Self { dir };

        run_git(fixture.dir.path(), &["init", "--bare", "remote.git"]);
        run_git(&fixture.remote_path(), &["symbolic-ref", "HEAD", "refs/heads/master"]);

        let seed = fixture.seed_path();
        std::fs::create_dir(&seed).unwrap();
        run_git(&seed, &["init"]);
        run_git(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        run_git(&seed, &["config", "user.email", "test@example.com"]);
        run_git(&seed, &["config", "user.name", "Test User"]);
        run_git(&seed, &["config", "commit.gpgsign", "false"]);
        run_git(&seed, &["remote", "add", "origin", &fixture.remote_url()]);

        std::fs::write(seed.join("README.md"), "# Test Repo\n").unwrap();
        run_git(&seed, &["add", "README.md"]);
        run_git(&seed, &["commit", "-m", "Initial commit"]);
        run_git(&seed, &["push", "origin", "master"]);

        for branch in branches {
            run_git(&seed, &["branch", branch, "master"]);
            run_git(&seed, &["push", "origin", branch]);
        }

        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn remote_path(&self) -> PathBuf {
        self.dir.path().join("remote.git")
    }

    pub fn remote_url(&self) -> String {
        self.remote_path().to_string_lossy().into_owned()
    }

    pub fn seed_path(&self) -> PathBuf {
        self.dir.path().join("seed")
    }

    /// A path for a working copy, not yet created.
    pub fn workdir(&self, name: &str) -> PathBuf {
        self.dir.path().join("work").join(name)
    }

    /// Clone (or open) a working copy named `name` through the client.
    pub fn client(&self, name: &str) -> (Git, OpenMode) {
        let path = self.workdir(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        Git::open_or_clone(
            &path,
            &self.remote_url(),
            Credentials::default(),
            Author::default(),
        )
        .expect("open_or_clone failed")
    }

    /// Commit `content` to `file` on `branch` in the seed and push it.
    pub fn commit_on(&self, branch: &str, file: &str, content: &str, message: &str) -> String {
        self.commit_as(branch, file, content, message, "Test User", "test@example.com")
    }

    /// Like [`RemoteFixture::commit_on`], with an explicit author.
    pub fn commit_as(
        &self,
        branch: &str,
        file: &str,
        content: &str,
        message: &str,
        name: &str,
        email: &str,
    ) -> String {
        let seed = self.seed_path();
        run_git(&seed, &["fetch", "origin"]);
        run_git(&seed, &["checkout", "-B", branch, &format!("origin/{branch}")]);
        if let Some(parent) = Path::new(file).parent() {
            std::fs::create_dir_all(seed.join(parent)).unwrap();
        }
        std::fs::write(seed.join(file), content).unwrap();
        run_git(&seed, &["add", file]);
        run_git(
            &seed,
            &[
                "-c",
                &format!("user.name={name}"),
                "-c",
                &format!("user.email={email}"),
                "commit",
                "-m",
                message,
            ],
        );
        run_git(&seed, &["push", "origin", branch]);
        self.remote_head(branch)
    }

    /// Create `branch` on the remote at `from`.
    pub fn create_remote_branch(&self, branch: &str, from: &str) {
        run_git(&self.remote_path(), &["branch", branch, from]);
    }

    /// Delete `branch` on the remote.
    pub fn delete_remote_branch(&self, branch: &str) {
        run_git(&self.remote_path(), &["branch", "-D", branch]);
    }

    /// Push an orphan branch with unrelated history.
    pub fn push_orphan(&self, branch: &str) {
        let seed = self.seed_path();
        run_git(&seed, &["checkout", "--orphan", branch]);
        run_git(&seed, &["rm", "-rf", "--quiet", "."]);
        std::fs::write(seed.join("orphan.txt"), "unrelated\n").unwrap();
        run_git(&seed, &["add", "orphan.txt"]);
        run_git(&seed, &["commit", "-m", "Unrelated root"]);
        run_git(&seed, &["push", "origin", branch]);
        run_git(&seed, &["checkout", "-f", "master"]);
    }

    /// Tip of `branch` on the remote.
    pub fn remote_head(&self, branch: &str) -> String {
        git_output(
            &self.remote_path(),
            &["rev-parse", &format!("refs/heads/{branch}")],
        )
    }

    /// Tips of all fixture branches on the remote.
    pub fn remote_heads(&self) -> Vec<(String, String)> {
        BRANCHES
            .iter()
            .map(|b| (b.to_string(), self.remote_head(b)))
            .collect()
    }

    /// Parent commits of the remote tip of `branch`.
    pub fn parents(&self, branch: &str) -> Vec<String> {
        let line = git_output(
            &self.remote_path(),
            &["rev-list", "--parents", "-n", "1", &format!("refs/heads/{branch}")],
        );
        line.split_whitespace().skip(1).map(String::from).collect()
    }

    /// Subject line of the remote tip of `branch`.
    pub fn message(&self, branch: &str) -> String {
        self.log_format(branch, "%s")
    }

    /// `Name <email>` of the remote tip's author.
    pub fn author(&self, branch: &str) -> String {
        self.log_format(branch, "%an <%ae>")
    }

    /// `Name <email>` of the remote tip's committer.
    pub fn committer(&self, branch: &str) -> String {
        self.log_format(branch, "%cn <%ce>")
    }

    fn log_format(&self, branch: &str, format: &str) -> String {
        git_output(
            &self.remote_path(),
            &[
                "log",
                "-1",
                &format!("--format={format}"),
                &format!("refs/heads/{branch}"),
            ],
        )
    }

    /// Content of `file` at the remote tip of `branch`, `None` if absent.
    pub fn file_on(&self, branch: &str, file: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["show", &format!("refs/heads/{branch}:{file}")])
            .current_dir(self.remote_path())
            .output()
            .expect("git show failed");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `ancestor` is reachable from the remote tip of `branch`.
    pub fn contains(&self, branch: &str, ancestor: &str) -> bool {
        Command::new("git")
            .args([
                "merge-base",
                "--is-ancestor",
                ancestor,
                &format!("refs/heads/{branch}"),
            ])
            .current_dir(self.remote_path())
            .status()
            .expect("git merge-base failed")
            .success()
    }
}

/// Shorthand for a valid branch name.
pub fn branch(name: &str) -> BranchName {
    BranchName::new(name).expect("invalid branch name in test")
}

/// Run a git command in the given directory.
pub fn run_git(dir: &Path, args: &[&str]) {
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
}

/// Run a git command and return its trimmed stdout.
pub fn git_output(dir: &Path, args: &[&str]) -> String {
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
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}
