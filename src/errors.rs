// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use std::{fmt, path::PathBuf, time::Duration};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error returned by a repository operation.
///
/// Use [`Error::kind`] to find out what went wrong. Errors caused by a
/// failing tool carry the tool's combined output verbatim.
pub struct Error {
    kind: Box<ErrorKind>,
}

/// What went wrong
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The clone destination exists already. `Open` it instead.
    AlreadyExists { directory: PathBuf },
    NotFound {
        directory: PathBuf,
        error: std::io::Error,
    },
    AccessDenied {
        directory: PathBuf,
        error: std::io::Error,
    },
    NotARepository { directory: PathBuf, vcs: String },
    CloneFailed { url: String, output: String },
    CheckOutFailed { revision: String, output: String },
    LogFailed { output: String },
    /// One or both revisions of a log query are unknown to the tool.
    RevisionNotFound { start: String, end: String },
    MalformedLog { line: String, reason: String },
    FetchFailed { output: String },
    ResetFailed { target: String, output: String },
    PullFailed { output: String },
    UnknownBackend { name: String },
    NotImplemented { vcs: String, operation: String },
    ToolNotStarted {
        command: String,
        error: std::io::Error,
    },
    TimedOut { command: String, timeout: Duration },
    Io {
        message: String,
        error: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        let kind = Box::new(kind);
        Error { kind }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::AlreadyExists { directory } => {
                write!(f, "Destination {directory:?} already exists")
            }
            ErrorKind::NotFound { directory, error } => {
                write!(f, "Repository directory {directory:?} not found: {error}")
            }
            ErrorKind::AccessDenied { directory, error } => {
                write!(f, "Access to repository directory {directory:?} denied: {error}")
            }
            ErrorKind::NotARepository { directory, vcs } => {
                write!(f, "{directory:?} is not a {vcs} repository")
            }
            ErrorKind::CloneFailed { url, output } => {
                write!(f, "Cloning \"{url}\" failed:\n{output}")
            }
            ErrorKind::CheckOutFailed { revision, output } => {
                write!(f, "Checking out \"{revision}\" failed:\n{output}")
            }
            ErrorKind::LogFailed { output } => {
                write!(f, "Retrieving the log failed:\n{output}")
            }
            ErrorKind::RevisionNotFound { start, end } => {
                write!(f, "One or both revisions not found: '{start}' - '{end}'")
            }
            ErrorKind::MalformedLog { line, reason } => {
                write!(f, "Malformed log line \"{line}\": {reason}")
            }
            ErrorKind::FetchFailed { output } => {
                write!(f, "Fetching from the remote failed:\n{output}")
            }
            ErrorKind::ResetFailed { target, output } => {
                write!(f, "Hard reset to \"{target}\" failed:\n{output}")
            }
            ErrorKind::PullFailed { output } => {
                write!(f, "Pulling from the remote failed:\n{output}")
            }
            ErrorKind::UnknownBackend { name } => {
                write!(f, "Version control system '{name}' is not supported")
            }
            ErrorKind::NotImplemented { vcs, operation } => {
                write!(f, "{operation} is not implemented for {vcs}")
            }
            ErrorKind::ToolNotStarted { command, error } => {
                write!(f, "Could not run {command}: {error}")
            }
            ErrorKind::TimedOut { command, timeout } => {
                write!(f, "{command} did not finish within {}s", timeout.as_secs())
            }
            ErrorKind::Io { message, error } => {
                write!(f, "{message}: {error}")
            }
        }?;
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.kind {
            ErrorKind::NotFound { error, .. }
            | ErrorKind::AccessDenied { error, .. }
            | ErrorKind::ToolNotStarted { error, .. }
            | ErrorKind::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(*self.kind, ErrorKind::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(*self.kind, ErrorKind::NotFound { .. })
    }

    #[must_use]
    pub fn is_revision_not_found(&self) -> bool {
        matches!(*self.kind, ErrorKind::RevisionNotFound { .. })
    }

    /// The raw diagnostics of the tool, if a tool run caused this error
    #[must_use]
    pub fn tool_output(&self) -> Option<&str> {
        match &*self.kind {
            ErrorKind::CloneFailed { output, .. }
            | ErrorKind::CheckOutFailed { output, .. }
            | ErrorKind::LogFailed { output }
            | ErrorKind::FetchFailed { output }
            | ErrorKind::ResetFailed { output, .. }
            | ErrorKind::PullFailed { output } => Some(output),
            _ => None,
        }
    }
}

/// `pub(crate)` constructors, visible only in this crate.
impl Error {
    pub(crate) fn new_already_exists(directory: PathBuf) -> Self {
        ErrorKind::AlreadyExists { directory }.into()
    }
    /// Map a failed filesystem lookup of a repository directory
    pub(crate) fn new_directory_error(directory: PathBuf, error: std::io::Error) -> Self {
        let kind = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound { directory, error },
            std::io::ErrorKind::PermissionDenied => ErrorKind::AccessDenied { directory, error },
            _ => ErrorKind::Io {
                message: format!("Could not access {directory:?}"),
                error,
            },
        };
        kind.into()
    }
    pub(crate) fn new_not_a_repository(directory: PathBuf, vcs: &str) -> Self {
        ErrorKind::NotARepository {
            directory,
            vcs: vcs.to_string(),
        }
        .into()
    }
    pub(crate) fn new_clone_failed(url: &str, output: String) -> Self {
        ErrorKind::CloneFailed {
            url: url.to_string(),
            output,
        }
        .into()
    }
    pub(crate) fn new_check_out_failed(revision: &str, output: String) -> Self {
        ErrorKind::CheckOutFailed {
            revision: revision.to_string(),
            output,
        }
        .into()
    }
    pub(crate) fn new_log_failed(output: String) -> Self {
        ErrorKind::LogFailed { output }.into()
    }
    pub(crate) fn new_revision_not_found(start: Option<&str>, end: Option<&str>) -> Self {
        ErrorKind::RevisionNotFound {
            start: start.unwrap_or_default().to_string(),
            end: end.unwrap_or_default().to_string(),
        }
        .into()
    }
    pub(crate) fn new_malformed_log(line: &str, reason: String) -> Self {
        ErrorKind::MalformedLog {
            line: line.to_string(),
            reason,
        }
        .into()
    }
    pub(crate) fn new_fetch_failed(output: String) -> Self {
        ErrorKind::FetchFailed { output }.into()
    }
    pub(crate) fn new_reset_failed(target: &str, output: String) -> Self {
        ErrorKind::ResetFailed {
            target: target.to_string(),
            output,
        }
        .into()
    }
    pub(crate) fn new_pull_failed(output: String) -> Self {
        ErrorKind::PullFailed { output }.into()
    }
    pub(crate) fn new_unknown_backend(name: &str) -> Self {
        ErrorKind::UnknownBackend {
            name: name.to_string(),
        }
        .into()
    }
    pub(crate) fn new_not_implemented(vcs: &str, operation: &str) -> Self {
        ErrorKind::NotImplemented {
            vcs: vcs.to_string(),
            operation: operation.to_string(),
        }
        .into()
    }
    pub(crate) fn new_tool_not_started(command: String, error: std::io::Error) -> Self {
        ErrorKind::ToolNotStarted { command, error }.into()
    }
    pub(crate) fn new_timed_out(command: String, timeout: Duration) -> Self {
        ErrorKind::TimedOut { command, timeout }.into()
    }
}

#[test]
fn error_send_sync() {
    fn f<T: Send + Sync>() {}
    f::<Error>();
}
