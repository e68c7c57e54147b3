// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use std::{ffi::OsStr, path::Path};

use crate::{vcs, LogRecord, Settings, ToolSettings};

const LOG_FORMAT: &str = "--pretty=format:'%h|%an|%ad|%s'";
const FALLBACK_BRANCH: &str = "master";

fn is_destination_exists(output: &str) -> bool {
    output.contains("destination path") && output.contains("already exists")
}

fn log_range(start: Option<&str>, end: Option<&str>) -> Option<String> {
    match (start, end) {
        (None, _) => None,
        (Some(start), None) => Some(start.to_string()),
        (Some(start), Some(end)) => Some(format!("{start}..{end}")),
    }
}

#[derive(Debug)]
pub struct Git {
    tool: vcs::Tool,
    settings: ToolSettings,
    verify_open: bool,
}

impl Git {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            tool: vcs::Tool::new(
                "git",
                &settings.git.command,
                &[("GIT_TERMINAL_PROMPT", "0"), ("LC_ALL", "C")],
                settings.timeout,
            ),
            settings: settings.git.clone(),
            verify_open: settings.verify_open,
        }
    }

    /// The branch to reset to: Configured, or wherever the remote HEAD points
    async fn default_branch(&self, directory: &Path) -> String {
        if let Some(branch) = &self.settings.default_branch {
            return branch.clone();
        }

        let remote_head = format!("refs/remotes/{}/HEAD", self.settings.remote);
        let output = self
            .tool
            .run(Some(directory), &["symbolic-ref", "--short", remote_head.as_str()])
            .await;

        let prefix = format!("{}/", self.settings.remote);
        match output {
            Ok(output) if output.success => {
                let head = vcs::output_to_string(output.stdout.as_bytes());
                head.strip_prefix(&prefix).unwrap_or(&head).to_string()
            }
            _ => {
                tracing::debug!("Remote HEAD unknown, falling back to {FALLBACK_BRANCH}");
                FALLBACK_BRANCH.to_string()
            }
        }
    }

    async fn fetch(&self, directory: &Path) -> crate::Result<()> {
        let output = self
            .tool
            .run(Some(directory), &["fetch", self.settings.remote.as_str()])
            .await?;
        if output.success {
            Ok(())
        } else {
            Err(crate::Error::new_fetch_failed(output.combined))
        }
    }
}

#[async_trait::async_trait]
impl vcs::Vcs for Git {
    fn name(&self) -> &str {
        "git"
    }

    #[tracing::instrument]
    async fn clone_repository(&self, url: &str, directory: &Path) -> crate::Result<()> {
        let args = [
            OsStr::new("clone"),
            OsStr::new("--"),
            OsStr::new(url),
            directory.as_os_str(),
        ];
        let output = self.tool.run(None, &args).await?;

        if output.success {
            return Ok(());
        }
        if is_destination_exists(&output.combined) {
            return Err(crate::Error::new_already_exists(directory.to_path_buf()));
        }
        Err(crate::Error::new_clone_failed(url, output.combined))
    }

    #[tracing::instrument]
    async fn open(&self, directory: &Path) -> crate::Result<()> {
        vcs::open_directory(self, directory, self.verify_open).await
    }

    #[tracing::instrument]
    async fn is_repository(&self, directory: &Path) -> bool {
        self.tool
            .run(Some(directory), &["rev-parse", "--git-dir"])
            .await
            .is_ok_and(|o| o.success)
    }

    #[tracing::instrument]
    async fn download(&self, directory: &Path) -> crate::Result<()> {
        self.fetch(directory).await
    }

    #[tracing::instrument]
    async fn check_out(&self, directory: &Path, revision: &str) -> crate::Result<()> {
        let output = self
            .tool
            .run(Some(directory), &["checkout", "--end-of-options", revision])
            .await?;

        if output.success {
            Ok(())
        } else {
            Err(crate::Error::new_check_out_failed(revision, output.combined))
        }
    }

    #[tracing::instrument]
    async fn log(
        &self,
        directory: &Path,
        start: Option<&str>,
        end: Option<&str>,
    ) -> crate::Result<Vec<LogRecord>> {
        let mut args = vec![
            "log".to_string(),
            LOG_FORMAT.to_string(),
            "--date=short".to_string(),
            "--end-of-options".to_string(),
        ];
        if let Some(range) = log_range(start, end) {
            args.push(range);
        }

        let output = self.tool.run(Some(directory), args.as_slice()).await?;

        if output.success {
            return crate::parse_log(&output.stdout);
        }
        if output.combined.contains("unknown revision") {
            return Err(crate::Error::new_revision_not_found(start, end));
        }
        Err(crate::Error::new_log_failed(output.combined))
    }

    #[tracing::instrument]
    async fn hard_reset(&self, directory: &Path) -> crate::Result<()> {
        self.fetch(directory).await?;

        let target = format!(
            "{}/{}",
            self.settings.remote,
            self.default_branch(directory).await
        );
        tracing::debug!("Resetting {directory:?} to {target}");

        let output = self
            .tool
            .run(Some(directory), &["reset", "--hard", target.as_str()])
            .await?;
        if output.success {
            Ok(())
        } else {
            Err(crate::Error::new_reset_failed(&target, output.combined))
        }
    }

    #[tracing::instrument]
    async fn pull(&self, directory: &Path) -> crate::Result<()> {
        let output = self.tool.run(Some(directory), &["pull"]).await?;
        if output.success {
            Ok(())
        } else {
            Err(crate::Error::new_pull_failed(output.combined))
        }
    }
}
