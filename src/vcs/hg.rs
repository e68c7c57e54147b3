// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

// spell-checker:ignore revset shortdate firstline HGPLAIN

use std::{ffi::OsStr, path::Path};

use crate::{vcs, LogRecord, Settings, ToolSettings};

const LOG_TEMPLATE: &str = "'{node|short}|{author|person}|{date|shortdate}|{desc|firstline}'\n";
const FALLBACK_BRANCH: &str = "default";

fn is_destination_exists(output: &str) -> bool {
    output.contains("abort: destination")
        && (output.contains("is not empty") || output.contains("already exists"))
}

fn revset_string(revision: &str) -> String {
    let escaped = revision.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// The newest commit of `branch` that came from a remote
///
/// Local commits are drafts until pushed, so they never match.
fn reset_revset(branch: &str) -> String {
    format!("max(public() and branch({}))", revset_string(branch))
}

/// Newest first, like `git log` reports a range
fn log_revset(start: Option<&str>, end: Option<&str>) -> Option<String> {
    match (start, end) {
        (None, _) => None,
        (Some(start), None) => Some(format!("reverse(::{})", revset_string(start))),
        (Some(start), Some(end)) => Some(format!(
            "reverse(only({}, {}))",
            revset_string(end),
            revset_string(start)
        )),
    }
}

#[derive(Debug)]
pub struct Hg {
    tool: vcs::Tool,
    settings: ToolSettings,
    verify_open: bool,
}

impl Hg {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            tool: vcs::Tool::new("hg", &settings.hg.command, &[("HGPLAIN", "1")], settings.timeout),
            settings: settings.hg.clone(),
            verify_open: settings.verify_open,
        }
    }

    async fn fetch(&self, directory: &Path) -> crate::Result<()> {
        let output = self
            .tool
            .run(Some(directory), &["pull", self.settings.remote.as_str()])
            .await?;
        if output.success {
            Ok(())
        } else {
            Err(crate::Error::new_fetch_failed(output.combined))
        }
    }
}

#[async_trait::async_trait]
impl vcs::Vcs for Hg {
    fn name(&self) -> &str {
        "hg"
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
            .run(Some(directory), &["root"])
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
            .run(Some(directory), &["checkout", "--rev", revision])
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
            "--template".to_string(),
            LOG_TEMPLATE.to_string(),
        ];
        if let Some(revset) = log_revset(start, end) {
            args.push("--rev".to_string());
            args.push(revset);
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

        let target = self
            .settings
            .default_branch
            .clone()
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string());
        tracing::debug!("Resetting {directory:?} to {target}");

        let revset = reset_revset(&target);
        let output = self
            .tool
            .run(Some(directory), &["update", "--clean", "--rev", revset.as_str()])
            .await?;
        if output.success {
            Ok(())
        } else {
            Err(crate::Error::new_reset_failed(&target, output.combined))
        }
    }

    /// `pull --update` does not update when nothing new came in, so update
    /// separately.
    #[tracing::instrument]
    async fn pull(&self, directory: &Path) -> crate::Result<()> {
        let output = self
            .tool
            .run(Some(directory), &["pull", self.settings.remote.as_str()])
            .await?;
        if !output.success {
            return Err(crate::Error::new_pull_failed(output.combined));
        }

        let output = self.tool.run(Some(directory), &["update"]).await?;
        if output.success {
            Ok(())
        } else {
            Err(crate::Error::new_pull_failed(output.combined))
        }
    }
}
