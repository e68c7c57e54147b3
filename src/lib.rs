// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

//! Clone, open and work with git and mercurial repositories through one
//! interface.
//!
//! All work is done by running the version control tools installed on the
//! system.

mod errors;
mod log;
mod settings;
mod vcs;

use std::path::Path;

pub use errors::{Error, ErrorKind, Result};
pub use log::{parse_log, LogRecord};
pub use settings::{Settings, ToolSettings};
pub use vcs::{vcs_by_name, Git, Hg, Registry, Repository, SharedVcs, Vcs};

/// Clone the repository at `url` into `directory`
///
/// # Errors
///
/// `AlreadyExists` if `directory` is already there, `CloneFailed` and
/// friends for other problems.
#[tracing::instrument]
pub async fn clone(vcs: &SharedVcs, url: &str, directory: &Path) -> Result<Repository> {
    vcs.clone_repository(url, directory).await?;
    Ok(Repository::new(directory.to_path_buf(), vcs.clone()))
}

/// Open the working copy in `directory`
///
/// Unless `Settings::verify_open` was set, this does not check whether
/// `directory` actually is a repository of `vcs`.
///
/// # Errors
///
/// `NotFound` or `AccessDenied` if `directory` can not be used.
#[tracing::instrument]
pub async fn open(vcs: &SharedVcs, directory: &Path) -> Result<Repository> {
    vcs.open(directory).await?;
    Ok(Repository::new(directory.to_path_buf(), vcs.clone()))
}

/// Clone `url` into `directory`, or open `directory` if it exists already
///
/// An existing `directory` is not checked to be a clone of `url`.
///
/// # Errors
///
/// Any error of [`clone`] but `AlreadyExists`, any error of [`open`].
#[tracing::instrument]
pub async fn clone_or_open(vcs: &SharedVcs, url: &str, directory: &Path) -> Result<Repository> {
    match clone(vcs, url, directory).await {
        Err(e) if e.is_already_exists() => {
            tracing::debug!("{directory:?} exists, opening it instead");
            open(vcs, directory).await
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let git = vcs_by_name("git").unwrap();

        let e = open(&git, &tmp.path().join("missing")).await.unwrap_err();
        assert!(e.is_not_found());
    }

    #[tokio::test]
    async fn test_clone_runs_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.git.command = vec!["repolink-no-such-git".to_string()];
        let git = Registry::new(&settings).get("git").unwrap();

        let e = clone(&git, "https://example.com/repo.git", &tmp.path().join("clone"))
            .await
            .unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::ToolNotStarted { command, .. }
            if command.starts_with("repolink-no-such-git clone -- ")));

        let e = clone_or_open(&git, "https://example.com/repo.git", tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::ToolNotStarted { .. }));
    }

    #[tokio::test]
    async fn test_open_keeps_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let hg = vcs_by_name("hg").unwrap();

        let repository = open(&hg, tmp.path()).await.unwrap();
        assert_eq!(repository.dir(), tmp.path());
        assert_eq!(repository.vcs().name(), "hg");
    }
}
