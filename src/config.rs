// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use std::{path::Path, time::Duration};

use anyhow::Context;

use repolink::{Settings, ToolSettings};

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TomlToolSettings {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TomlConfiguration {
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub verify_open: Option<bool>,
    #[serde(default)]
    pub git: Option<TomlToolSettings>,
    #[serde(default)]
    pub hg: Option<TomlToolSettings>,
}

fn map_command(toml_command: &str) -> anyhow::Result<Vec<String>> {
    let command = shell_words::split(toml_command.trim())
        .context(format!("Failed to parse command '{toml_command}'"))?;
    if command.is_empty() {
        return Err(anyhow::anyhow!("Command must not be empty"));
    }
    Ok(command)
}

fn map_tool(toml: Option<TomlToolSettings>, mut base: ToolSettings) -> anyhow::Result<ToolSettings> {
    let Some(toml) = toml else {
        return Ok(base);
    };

    if let Some(command) = &toml.command {
        base.command = map_command(command)?;
    }
    if let Some(remote) = toml.remote {
        if remote.is_empty() {
            return Err(anyhow::anyhow!("Remote must not be empty"));
        }
        base.remote = remote;
    }
    if toml.default_branch.is_some() {
        base.default_branch = toml.default_branch;
    }
    Ok(base)
}

fn from_string(value: &str) -> anyhow::Result<Settings> {
    let toml_config: TomlConfiguration = toml::from_str(value).context("Failed to parse toml")?;
    let base = Settings::default();

    let timeout = match toml_config.timeout_seconds {
        Some(0) => return Err(anyhow::anyhow!("timeout-seconds must be positive")),
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => base.timeout,
    };

    Ok(Settings {
        git: map_tool(toml_config.git, base.git).context("Invalid git settings")?,
        hg: map_tool(toml_config.hg, base.hg).context("Invalid hg settings")?,
        timeout,
        verify_open: toml_config.verify_open.unwrap_or(base.verify_open),
    })
}

fn from_path(path: &Path) -> anyhow::Result<Settings> {
    let config_data =
        std::fs::read_to_string(path).context(format!("Failed to read toml file {path:?}"))?;

    from_string(config_data.as_str()).context("Failed to parse toml string")
}

/// Load `config_file` or the user configuration, if there is one
pub fn load_user_configuration(config_file: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(config_file) = config_file {
        return from_path(config_file)
            .context(format!("Failed to parse configuration file {config_file:?}"));
    }

    let config_dir = dirs::config_dir()
        .map(|cd| cd.join("repolink"))
        .ok_or(anyhow::anyhow!("Config directory not found"))?;
    let config_file = config_dir.join("config.toml");

    if !config_file.exists() {
        tracing::debug!("No configuration in {config_file:?}, using defaults");
        return Ok(Settings::default());
    }

    from_path(config_file.as_path()).context(format!(
        "Failed to parse configuration file {config_file:?}"
    ))
}
