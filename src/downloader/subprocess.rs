//! Backends that run an external download program per file

use super::{Backend, DlTask};
use crate::config::DownloadConfig;
use crate::error::{Error, Result, TaskError};
use crate::scheduler::WorkerContext;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Locate a program: an explicit path wins, otherwise search PATH if allowed
fn resolve_binary(explicit: Option<&Path>, program: &str, search_path: bool) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if search_path => which::which(program).ok(),
        None => None,
    }
}

/// Confirm the program exists and starts
fn check_binary(binary: Option<&Path>, program: &str) -> Result<()> {
    let Some(binary) = binary else {
        return Err(Error::NotSupported(format!(
            "the executable {program} is not installed or not in PATH"
        )));
    };

    let status = Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| {
            Error::NotSupported(format!("failed to execute {}: {e}", binary.display()))
        })?;

    if !status.success() {
        return Err(Error::NotSupported(format!(
            "{} --version exited with {status}",
            binary.display()
        )));
    }
    Ok(())
}

/// Run a prepared command with its output discarded
fn run_quiet(mut command: Command, program: &str) -> Result<()> {
    let status = command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| Error::ExternalTool(format!("failed to execute {program}: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::ExternalTool(format!("{program} exited with {status}")))
    }
}

fn missing_binary(program: &str) -> TaskError {
    Box::new(Error::NotSupported(format!(
        "the executable {program} is not installed or not in PATH"
    )))
}

/// Downloads by running `curl`
#[derive(Clone, Debug)]
pub struct CurlBackend {
    binary_path: Option<PathBuf>,
}

impl CurlBackend {
    /// Create a backend with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path: Some(binary_path),
        }
    }

    /// Attempt to find curl in PATH
    pub fn from_path() -> Option<Self> {
        which::which("curl").ok().map(Self::new)
    }

    /// Create a backend from download configuration
    ///
    /// A missing binary is reported by [`Backend::check`], not here.
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self {
            binary_path: resolve_binary(config.curl_path.as_deref(), "curl", config.search_path),
        }
    }

    /// The command line used to fetch `task`
    pub fn command(&self, task: &DlTask) -> Option<Command> {
        let binary = self.binary_path.as_ref()?;
        let mut command = Command::new(binary);
        command
            .arg("--create-dirs")
            .arg("--globoff")
            .arg("--url")
            .arg(&task.url)
            .arg("--output")
            .arg(&task.filename);
        Some(command)
    }
}

impl Backend for CurlBackend {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn check(&self) -> Result<()> {
        check_binary(self.binary_path.as_deref(), "curl")
    }

    fn fetch(&self, _ctx: &mut WorkerContext, task: &DlTask) -> std::result::Result<(), TaskError> {
        let command = self.command(task).ok_or_else(|| missing_binary("curl"))?;
        run_quiet(command, "curl")?;
        Ok(())
    }
}

/// Downloads by running `aria2c`
#[derive(Clone, Debug)]
pub struct Aria2Backend {
    binary_path: Option<PathBuf>,
}

impl Aria2Backend {
    /// Create a backend with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path: Some(binary_path),
        }
    }

    /// Attempt to find aria2c in PATH
    pub fn from_path() -> Option<Self> {
        which::which("aria2c").ok().map(Self::new)
    }

    /// Create a backend from download configuration
    ///
    /// A missing binary is reported by [`Backend::check`], not here.
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self {
            binary_path: resolve_binary(config.aria2_path.as_deref(), "aria2c", config.search_path),
        }
    }

    /// The command line used to fetch `task`
    ///
    /// aria2c takes the directory and the file name separately; a bare file
    /// name is placed in the current directory.
    ///
    /// # Errors
    ///
    /// [`Error::Other`] if `task.filename` has no file name component.
    pub fn command(&self, task: &DlTask) -> Result<Option<Command>> {
        let Some(binary) = self.binary_path.as_ref() else {
            return Ok(None);
        };
        let name = task.filename.file_name().ok_or_else(|| {
            Error::Other(format!(
                "download target {} has no file name",
                task.filename.display()
            ))
        })?;
        let dir = match task.filename.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut command = Command::new(binary);
        command
            .arg("--allow-overwrite=true")
            .arg("--always-resume=true")
            .arg("--auto-file-renaming=false")
            .arg("--continue=true")
            .arg("-d")
            .arg(dir)
            .arg("-o")
            .arg(name)
            .arg(&task.url);
        Ok(Some(command))
    }
}

impl Backend for Aria2Backend {
    fn name(&self) -> &'static str {
        "aria2"
    }

    fn check(&self) -> Result<()> {
        check_binary(self.binary_path.as_deref(), "aria2c")
    }

    fn fetch(&self, _ctx: &mut WorkerContext, task: &DlTask) -> std::result::Result<(), TaskError> {
        let command = self.command(task)?.ok_or_else(|| missing_binary("aria2c"))?;
        run_quiet(command, "aria2c")?;
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn args(command: &Command) -> Vec<&OsStr> {
        command.get_args().collect()
    }

    #[test]
    fn test_curl_command_line() {
        let backend = CurlBackend::new(PathBuf::from("/usr/bin/curl"));
        let task = DlTask::new("https://example.com/a[1].mp4", "/data/ml/01.mp4");
        let command = backend.command(&task).unwrap();

        assert_eq!(command.get_program(), "/usr/bin/curl");
        assert_eq!(
            args(&command),
            [
                "--create-dirs",
                "--globoff",
                "--url",
                "https://example.com/a[1].mp4",
                "--output",
                "/data/ml/01.mp4",
            ]
        );
    }

    #[test]
    fn test_aria2_command_line_splits_directory_and_name() {
        let backend = Aria2Backend::new(PathBuf::from("aria2c"));
        let task = DlTask::new("https://example.com/v.mp4", "/data/ml/week 1/v.mp4");
        let command = backend.command(&task).unwrap().unwrap();

        assert_eq!(
            args(&command),
            [
                "--allow-overwrite=true",
                "--always-resume=true",
                "--auto-file-renaming=false",
                "--continue=true",
                "-d",
                "/data/ml/week 1",
                "-o",
                "v.mp4",
                "https://example.com/v.mp4",
            ]
        );
    }

    #[test]
    fn test_aria2_bare_file_name_uses_current_directory() {
        let backend = Aria2Backend::new(PathBuf::from("aria2c"));
        let command = backend
            .command(&DlTask::new("https://example.com/v.mp4", "v.mp4"))
            .unwrap()
            .unwrap();
        let args = args(&command);
        assert_eq!(args[5], ".");
        assert_eq!(args[7], "v.mp4");
    }

    #[test]
    fn test_aria2_rejects_target_without_file_name() {
        let backend = Aria2Backend::new(PathBuf::from("aria2c"));
        let result = backend.command(&DlTask::new("https://example.com/", "/"));
        assert!(matches!(result, Err(Error::Other(_))));
    }

    #[test]
    fn test_check_without_binary_is_not_supported() {
        let config = DownloadConfig {
            search_path: false,
            ..Default::default()
        };
        let curl = CurlBackend::from_config(&config);
        let aria2 = Aria2Backend::from_config(&config);

        assert!(curl.command(&DlTask::new("u", "f")).is_none());
        assert!(matches!(curl.check(), Err(Error::NotSupported(_))));
        assert!(matches!(aria2.check(), Err(Error::NotSupported(_))));
    }

    #[test]
    fn test_check_with_nonexistent_binary_is_not_supported() {
        let backend = CurlBackend::new(PathBuf::from("/nonexistent/curl-binary-xyz"));
        let err = backend.check().unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
        assert!(err.to_string().contains("/nonexistent/curl-binary-xyz"));
    }

    #[test]
    fn test_explicit_path_wins_over_search() {
        let config = DownloadConfig {
            aria2_path: Some(PathBuf::from("/opt/aria2/bin/aria2c")),
            ..Default::default()
        };
        let backend = Aria2Backend::from_config(&config);
        assert_eq!(
            backend.binary_path.as_deref(),
            Some(Path::new("/opt/aria2/bin/aria2c"))
        );
    }

    #[test]
    fn test_from_path_consistency_with_which_crate() {
        assert_eq!(
            which::which("curl").is_ok(),
            CurlBackend::from_path().is_some(),
            "from_path() should return Some if and only if which::which() succeeds"
        );
        assert_eq!(
            which::which("aria2c").is_ok(),
            Aria2Backend::from_path().is_some()
        );
    }
}
