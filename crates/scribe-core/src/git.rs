//! Commit history through the `git` command line.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("no repository path set")]
    NoRepository,

    #[error("repository path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a git repository: {}", path.display())]
    NotARepository { path: PathBuf, stderr: String },

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

/// Remembers the repository chosen by the operator and reads its history.
///
/// Shared between the commits workflow and the chat tools.
#[derive(Debug, Default)]
pub struct GitRepository {
    path: Mutex<Option<PathBuf>>,
}

impl GitRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_repository_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::debug!(path = %path.display(), "repository path set");
        *self.path.lock().await = Some(path);
    }

    pub async fn repository_path(&self) -> Option<PathBuf> {
        self.path.lock().await.clone()
    }

    /// The `count` most recent commits, one `- {subject} ({author}, {date})` line each.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is set, the path is missing, or it is not a repository.
    pub async fn latest_commits(&self, count: usize) -> Result<String, GitError> {
        let path = self.repository_path().await.ok_or(GitError::NoRepository)?;
        read_log(&path, count).await
    }
}

async fn read_log(path: &Path, count: usize) -> Result<String, GitError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(GitError::PathNotFound(path.to_path_buf()));
    }
    if count == 0 {
        return Ok(String::new());
    }

    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["log", "--no-color", "--date=iso-strict"])
        .arg(format!("--max-count={count}"))
        .arg("--pretty=format:- %s (%an, %ad)")
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        tracing::warn!(path = %path.display(), %stderr, "git log failed");
        return Err(GitError::NotARepository {
            path: path.to_path_buf(),
            stderr,
        });
    }

    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    if !log.is_empty() && !log.ends_with('\n') {
        log.push('\n');
    }
    tracing::debug!(path = %path.display(), count, "read commit log");
    Ok(log)
}
