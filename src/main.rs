// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;

mod arg_parse;
mod config;
mod reporter;

use arg_parse::Command;

fn log_filter(debug_level: u8) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match debug_level {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    })
}

/// Use the VCS named on the command line or find the one managing `directory`
async fn vcs_for_directory(
    registry: &repolink::Registry,
    name: Option<&str>,
    directory: &Path,
) -> Result<repolink::SharedVcs> {
    if let Some(name) = name {
        tracing::debug!("Looking for VCS {name}");
        return Ok(registry.get(name)?);
    }

    tracing::debug!("Auto-detecting VCS");
    registry.detect(directory).await.ok_or(anyhow::anyhow!(format!(
        "Could not auto-detect a supported version control system in {directory:?}"
    )))
}

async fn open_repository(
    registry: &repolink::Registry,
    name: Option<&str>,
    directory: &Path,
) -> Result<repolink::Repository> {
    let vcs = vcs_for_directory(registry, name, directory).await?;
    repolink::open(&vcs, directory)
        .await
        .context(format!("Failed to open {directory:?}"))
}

#[tracing::instrument(skip(registry, reporter))]
async fn run(
    command: Command,
    vcs_name: Option<String>,
    registry: &repolink::Registry,
    reporter: &mut reporter::Reporter<std::io::Stdout>,
) -> Result<()> {
    let vcs_name = vcs_name.as_deref();

    match command {
        Command::Clone {
            url,
            directory,
            or_open,
        } => {
            let vcs = registry.get(vcs_name.unwrap_or("git"))?;
            let repository = if or_open {
                repolink::clone_or_open(&vcs, &url, &directory).await
            } else {
                repolink::clone(&vcs, &url, &directory).await
            }
            .context(format!("Failed to clone {url}"))?;
            reporter.report_directory("Cloned into", repository.dir())?;
        }
        Command::Open { directory } => {
            let repository = open_repository(registry, vcs_name, &directory).await?;
            reporter.report_directory(
                &format!("Opened {} repository", repository.vcs().name()),
                repository.dir(),
            )?;
        }
        Command::CheckOut {
            directory,
            revision,
        } => {
            let repository = open_repository(registry, vcs_name, &directory).await?;
            let directory = repository.check_out(&revision).await?;
            reporter.report_directory(&format!("Checked out {revision} in"), &directory)?;
        }
        Command::Log {
            directory,
            from_revision,
            to_revision,
        } => {
            let repository = open_repository(registry, vcs_name, &directory).await?;
            let records = repository
                .log(from_revision.as_deref(), to_revision.as_deref())
                .await?;
            reporter.report_log(&records)?;
        }
        Command::HardReset { directory } => {
            let repository = open_repository(registry, vcs_name, &directory).await?;
            repository.hard_reset().await?;
            reporter.report_directory("Reset", repository.dir())?;
        }
        Command::Pull { directory } => {
            let repository = open_repository(registry, vcs_name, &directory).await?;
            repository.pull().await?;
            reporter.report_directory("Pulled into", repository.dir())?;
        }
        Command::Download { directory } => {
            let repository = open_repository(registry, vcs_name, &directory).await?;
            repository.download().await?;
            reporter.report_directory("Downloaded into", repository.dir())?;
        }
        Command::ListBackends => {
            reporter.report_backends(&registry.names())?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = arg_parse::command();

    let stderr_log = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(stderr_log.with_filter(log_filter(cli.debug_level)))
        .init();

    let settings = config::load_user_configuration(cli.config_file.as_deref())?;
    tracing::debug!("Using settings: {settings:?}");

    let registry = repolink::Registry::new(&settings);
    let mut reporter = reporter::Reporter::stdout();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("tokio runtime setup failed")?
        .block_on(async move {
            let _span = tracing::span!(tracing::Level::TRACE, "tokio_runtime");
            tracing::trace!("Inside tokio runtime block");

            run(cli.command, cli.vcs, &registry, &mut reporter).await
        })
}
