// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

// spell-checker:ignore vcses

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{Arc, OnceLock},
    time::Duration,
};

use crate::{LogRecord, Settings};

mod git;
mod hg;

pub use git::Git;
pub use hg::Hg;

#[allow(clippy::module_name_repetitions)]
pub type SharedVcs = Arc<dyn Vcs>;

static DEFAULT_REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn output_to_string(input: &[u8]) -> String {
    let output = String::from_utf8_lossy(input);
    let output = output.strip_suffix('\n').unwrap_or(&output);
    let output = output.strip_suffix('\r').unwrap_or(output);

    output.to_string()
}

/// What a finished tool run left behind
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    /// stdout followed by stderr
    pub combined: String,
}

/// An external version control executable
#[derive(Clone, Debug)]
pub(crate) struct Tool {
    program: String,
    leading_args: Vec<String>,
    environment: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl Tool {
    pub(crate) fn new(
        default_program: &str,
        command: &[String],
        environment: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Self {
        let (program, leading_args) = match command.split_first() {
            Some((p, args)) => (p.clone(), args.to_vec()),
            None => (default_program.to_string(), vec![]),
        };

        Self {
            program,
            leading_args,
            environment: environment
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            timeout,
        }
    }

    fn describe(&self, args: &[&OsStr]) -> String {
        std::iter::once(self.program.clone())
            .chain(self.leading_args.iter().cloned())
            .chain(args.iter().map(|a| a.to_string_lossy().to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the tool in `current_directory` and wait for it to finish
    ///
    /// A non-zero exit code is not an error here: Callers map it onto the
    /// error matching their operation.
    ///
    /// # Errors
    ///
    /// `ToolNotStarted` if the process could not get spawned, `TimedOut` if
    /// it ran out of time.
    pub(crate) async fn run<S: AsRef<OsStr>>(
        &self,
        current_directory: Option<&Path>,
        args: &[S],
    ) -> crate::Result<ToolOutput> {
        let args: Vec<&OsStr> = args.iter().map(AsRef::as_ref).collect();
        let description = self.describe(&args);
        tracing::debug!("running {description} in {current_directory:?}");

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(&args)
            .envs(self.environment.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(cd) = current_directory {
            command.current_dir(cd);
        }

        let output = if let Some(timeout) = self.timeout {
            tokio::time::timeout(timeout, command.output())
                .await
                .map_err(|_| crate::Error::new_timed_out(description.clone(), timeout))?
        } else {
            command.output().await
        }
        .map_err(|e| crate::Error::new_tool_not_started(description.clone(), e))?;

        tracing::trace!("{description} => {output:?}");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let mut combined = stdout.clone();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ToolOutput {
            success: output.status.success(),
            stdout,
            combined,
        })
    }
}

/// Trait used to support different version control systems
///
/// All operations taking a `directory` run the tool inside that directory.
#[async_trait::async_trait]
pub trait Vcs: std::fmt::Debug + Send + Sync {
    /// The name of the version control system
    fn name(&self) -> &str;

    /// Clone the repository at `url` into `directory`
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the tool refuses to clone because `directory` is
    /// there already, `CloneFailed` for everything else the tool complains
    /// about.
    async fn clone_repository(&self, url: &str, directory: &Path) -> crate::Result<()>;

    /// Make sure `directory` can be used as a working copy
    ///
    /// # Errors
    ///
    /// `NotFound` or `AccessDenied` when `directory` is not accessible.
    async fn open(&self, directory: &Path) -> crate::Result<()>;

    /// Is `directory` a working copy of this version control system?
    async fn is_repository(&self, directory: &Path) -> bool;

    /// Download updates from the default remote without touching the
    /// working copy
    ///
    /// # Errors
    ///
    /// `NotImplemented` unless the backend supports it.
    async fn download(&self, _directory: &Path) -> crate::Result<()> {
        Err(crate::Error::new_not_implemented(self.name(), "download"))
    }

    /// Check out `revision`, which must be available locally already
    ///
    /// # Errors
    ///
    /// `CheckOutFailed` with the tool's diagnostics.
    async fn check_out(&self, directory: &Path, revision: &str) -> crate::Result<()>;

    /// Retrieve the commits reachable from `end` but not from `start`
    ///
    /// Without `start` the entire history is reported, without `end` all
    /// commits reachable from `start`. Records are reported newest first.
    ///
    /// # Errors
    ///
    /// `RevisionNotFound` if the tool does not know one of the revisions,
    /// `LogFailed` or `MalformedLog` otherwise.
    async fn log(
        &self,
        directory: &Path,
        start: Option<&str>,
        end: Option<&str>,
    ) -> crate::Result<Vec<LogRecord>>;

    /// Fetch from the remote and reset the working copy to the tip of its
    /// default branch, dropping all local changes
    ///
    /// # Errors
    ///
    /// `FetchFailed` (nothing was reset) or `ResetFailed` (the fetch went
    /// through already).
    async fn hard_reset(&self, directory: &Path) -> crate::Result<()>;

    /// Fetch and merge the current branch from its remote
    ///
    /// # Errors
    ///
    /// `PullFailed` with the tool's diagnostics.
    async fn pull(&self, directory: &Path) -> crate::Result<()>;
}

/// Check that `directory` exists, and optionally that `vcs` recognizes it
pub(crate) async fn open_directory(
    vcs: &dyn Vcs,
    directory: &Path,
    verify: bool,
) -> crate::Result<()> {
    let metadata = tokio::fs::metadata(directory)
        .await
        .map_err(|e| crate::Error::new_directory_error(directory.to_path_buf(), e))?;
    if !metadata.is_dir() {
        return Err(crate::Error::new_directory_error(
            directory.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    if verify && !vcs.is_repository(directory).await {
        return Err(crate::Error::new_not_a_repository(
            directory.to_path_buf(),
            vcs.name(),
        ));
    }
    Ok(())
}

/// Known version control systems by name
#[derive(Clone, Debug)]
pub struct Registry {
    vcses: Vec<SharedVcs>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Registry {
    /// Create a registry knowing git and hg
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let vcses: Vec<SharedVcs> = vec![
            Arc::new(Git::new(settings)) as SharedVcs,
            Arc::new(Hg::new(settings)) as SharedVcs,
        ];
        Self { vcses }
    }

    /// The registry used by [`vcs_by_name`]
    pub fn global() -> &'static Registry {
        DEFAULT_REGISTRY.get_or_init(Registry::default)
    }

    /// Add `vcs`, replacing any version control system of the same name
    pub fn register(&mut self, vcs: SharedVcs) {
        self.vcses.retain(|v| v.name() != vcs.name());
        self.vcses.push(vcs);
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.vcses.iter().map(|v| v.name()).collect()
    }

    /// Look up a version control system
    ///
    /// # Errors
    ///
    /// `UnknownBackend` if nothing called `name` is registered.
    pub fn get(&self, name: &str) -> crate::Result<SharedVcs> {
        self.vcses
            .iter()
            .find(|v| v.name() == name)
            .cloned()
            .ok_or_else(|| crate::Error::new_unknown_backend(name))
    }

    /// Find the version control system managing `directory`
    #[tracing::instrument(skip(self))]
    pub async fn detect(&self, directory: &Path) -> Option<SharedVcs> {
        futures::future::join_all(self.vcses.iter().map(|vcs| async move {
            vcs.is_repository(directory).await.then(|| vcs.clone())
        }))
        .await
        .into_iter()
        .flatten()
        .next()
    }
}

/// Look up a version control system with default settings
///
/// # Errors
///
/// `UnknownBackend` if nothing called `name` is known.
pub fn vcs_by_name(name: &str) -> crate::Result<SharedVcs> {
    Registry::global().get(name)
}

/// A working copy bound to the version control system managing it
///
/// The handle does not own the directory: It stays around when the handle
/// is dropped.
#[derive(Clone, Debug)]
pub struct Repository {
    directory: PathBuf,
    vcs: SharedVcs,
}

impl Repository {
    pub(crate) fn new(directory: PathBuf, vcs: SharedVcs) -> Self {
        Self { directory, vcs }
    }

    /// The root directory of the working copy
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn vcs(&self) -> &SharedVcs {
        &self.vcs
    }

    /// Download updates from the default remote
    ///
    /// # Errors
    ///
    /// See [`Vcs::download`].
    pub async fn download(&self) -> crate::Result<()> {
        self.vcs.download(&self.directory).await
    }

    /// Check out `revision` in place and return the working copy directory
    ///
    /// `revision` must have been fetched before, this does not update the
    /// repository.
    ///
    /// # Errors
    ///
    /// See [`Vcs::check_out`].
    pub async fn check_out(&self, revision: &str) -> crate::Result<PathBuf> {
        self.vcs.check_out(&self.directory, revision).await?;
        Ok(self.directory.clone())
    }

    /// List commits between `start` (exclusive) and `end` (inclusive)
    ///
    /// Empty revisions count as missing.
    ///
    /// # Errors
    ///
    /// See [`Vcs::log`].
    pub async fn log(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> crate::Result<Vec<LogRecord>> {
        let start = start.filter(|s| !s.is_empty());
        let end = end.filter(|s| !s.is_empty());
        self.vcs.log(&self.directory, start, end).await
    }

    /// # Errors
    ///
    /// See [`Vcs::hard_reset`].
    pub async fn hard_reset(&self) -> crate::Result<()> {
        self.vcs.hard_reset(&self.directory).await
    }

    /// # Errors
    ///
    /// See [`Vcs::pull`].
    pub async fn pull(&self) -> crate::Result<()> {
        self.vcs.pull(&self.directory).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_to_string() {
        assert_eq!(output_to_string(b"origin/main\n"), "origin/main");
        assert_eq!(output_to_string(b"origin/main\r\n"), "origin/main");
        assert_eq!(output_to_string(b""), "");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = Registry::default();

        assert_eq!(registry.names(), vec!["git", "hg"]);
        assert_eq!(registry.get("git").unwrap().name(), "git");
        assert_eq!(registry.get("hg").unwrap().name(), "hg");

        let e = registry.get("svn").unwrap_err();
        assert!(matches!(
            e.kind(),
            crate::ErrorKind::UnknownBackend { name } if name == "svn"
        ));
    }

    #[test]
    fn test_vcs_by_name() {
        assert_eq!(vcs_by_name("git").unwrap().name(), "git");
        assert!(vcs_by_name("").is_err());
    }

    #[derive(Debug)]
    struct Fake;

    #[async_trait::async_trait]
    impl Vcs for Fake {
        fn name(&self) -> &str {
            "git"
        }

        async fn clone_repository(&self, _url: &str, _directory: &Path) -> crate::Result<()> {
            Ok(())
        }

        async fn open(&self, directory: &Path) -> crate::Result<()> {
            open_directory(self, directory, true).await
        }

        async fn is_repository(&self, _directory: &Path) -> bool {
            false
        }

        async fn check_out(&self, _directory: &Path, _revision: &str) -> crate::Result<()> {
            Ok(())
        }

        async fn log(
            &self,
            _directory: &Path,
            _start: Option<&str>,
            _end: Option<&str>,
        ) -> crate::Result<Vec<LogRecord>> {
            Ok(vec![])
        }

        async fn hard_reset(&self, _directory: &Path) -> crate::Result<()> {
            Ok(())
        }

        async fn pull(&self, _directory: &Path) -> crate::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_register_replaces() {
        let mut registry = Registry::default();
        registry.register(Arc::new(Fake));

        assert_eq!(registry.names(), vec!["hg", "git"]);
    }

    #[tokio::test]
    async fn test_download_not_implemented_by_default() {
        let e = Fake.download(Path::new(".")).await.unwrap_err();
        assert!(matches!(e.kind(), crate::ErrorKind::NotImplemented { .. }));
    }

    #[tokio::test]
    async fn test_open_directory_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");

        let e = open_directory(&Fake, &missing, false).await.unwrap_err();
        assert!(e.is_not_found());
    }

    #[tokio::test]
    async fn test_open_directory_rejects_files() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        std::fs::write(&file, "content\n").unwrap();

        let e = open_directory(&Fake, &file, false).await.unwrap_err();
        assert!(e.is_not_found());
    }

    #[tokio::test]
    async fn test_open_directory_verified() {
        let tmp = tempfile::tempdir().unwrap();

        assert!(open_directory(&Fake, tmp.path(), false).await.is_ok());
        let e = open_directory(&Fake, tmp.path(), true).await.unwrap_err();
        assert!(matches!(e.kind(), crate::ErrorKind::NotARepository { .. }));
    }

    #[tokio::test]
    async fn test_tool_not_started() {
        let tool = Tool::new("repolink-no-such-tool", &[], &[], None);
        let e = tool.run(None, &["--version"]).await.unwrap_err();
        assert!(matches!(e.kind(), crate::ErrorKind::ToolNotStarted { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_timed_out() {
        let tool = Tool::new("sleep", &[], &[], Some(Duration::from_millis(100)));
        let e = tool.run(None, &["10"]).await.unwrap_err();
        assert!(matches!(e.kind(), crate::ErrorKind::TimedOut { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_combines_output() {
        let tool = Tool::new(
            "sh",
            &["sh".to_string(), "-c".to_string()],
            &[("REPOLINK_TEST", "value")],
            None,
        );
        let output = tool
            .run(None, &["echo out; echo $REPOLINK_TEST >&2; exit 3"])
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.combined, "out\nvalue\n");
    }
}
