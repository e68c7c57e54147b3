// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use std::time::Duration;

/// How to run one version control tool
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ToolSettings {
    /// The executable followed by arguments to pass before every subcommand
    pub command: Vec<String>,
    /// The remote to fetch from and to reset to
    pub remote: String,
    /// The branch a hard reset moves to (or None to ask the tool)
    pub default_branch: Option<String>,
}

impl ToolSettings {
    #[must_use]
    pub fn git() -> Self {
        Self {
            command: vec!["git".to_string()],
            remote: "origin".to_string(),
            default_branch: None,
        }
    }

    #[must_use]
    pub fn hg() -> Self {
        Self {
            command: vec!["hg".to_string()],
            remote: "default".to_string(),
            default_branch: None,
        }
    }
}

/// Settings shared by all backends
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub git: ToolSettings,
    pub hg: ToolSettings,
    /// Kill tool runs that take longer than this (or None to wait forever)
    pub timeout: Option<Duration>,
    /// Make `open` check that the directory is a repository of the backend
    pub verify_open: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            git: ToolSettings::git(),
            hg: ToolSettings::hg(),
            timeout: None,
            verify_open: false,
        }
    }
}
