//! External tool invocation.
//!
//! Every tool the assembler calls is opaque: only its exit status is
//! interpreted. A tool that cannot be found (spawn fails with `NotFound`,
//! or a wrapper shell reports exit code 127) is a [`ToolError::Missing`];
//! any other nonzero exit is a [`ToolError::Failed`].
//!
//! # Example
//!
//! ```rust,ignore
//! use kboot_builder::process::Cmd;
//!
//! Cmd::new("mkfs.fat")
//!     .args(["-F", "32"])
//!     .arg_path(image)
//!     .error_msg("Failed to format HD image")
//!     .run_interactive()?;
//! ```

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Shell convention for "command not found".
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{program} not found (is it installed and on PATH?)")]
    Missing { program: String },

    #[error("{message} ({})", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        message: String,
        stderr: String,
    },

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn is_missing(&self) -> bool {
        matches!(self, ToolError::Missing { .. })
    }

    pub fn program(&self) -> &str {
        match self {
            ToolError::Missing { program }
            | ToolError::Failed { program, .. }
            | ToolError::Io { program, .. } => program,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    /// Captured stdout; empty for interactive runs.
    pub stdout: String,
    /// Captured stderr; empty for interactive runs.
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Builder around [`std::process::Command`] with typed tool errors.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    error_msg: Option<String>,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            error_msg: None,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Message used for [`ToolError::Failed`].
    pub fn error_msg(mut self, msg: &str) -> Self {
        self.error_msg = Some(msg.to_string());
        self
    }

    /// Return nonzero exits as `Ok` instead of [`ToolError::Failed`].
    ///
    /// A missing tool is still an error.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command line as it would be typed, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run with stdout/stderr captured.
    pub fn run(self) -> Result<CommandResult, ToolError> {
        log::debug!("running: {}", self.display());
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        self.check(result)
    }

    /// Run with stdio passed through to the terminal.
    pub fn run_interactive(self) -> Result<CommandResult, ToolError> {
        log::debug!("running: {}", self.display());
        let status = self
            .command()
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| self.spawn_error(e))?;

        self.check(CommandResult {
            status,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> ToolError {
        if source.kind() == io::ErrorKind::NotFound {
            ToolError::Missing {
                program: self.program.clone(),
            }
        } else {
            ToolError::Io {
                program: self.program.clone(),
                source,
            }
        }
    }

    fn check(&self, result: CommandResult) -> Result<CommandResult, ToolError> {
        if result.code() == Some(EXIT_COMMAND_NOT_FOUND) {
            return Err(ToolError::Missing {
                program: self.program.clone(),
            });
        }
        if result.success() || self.allow_fail {
            return Ok(result);
        }
        Err(ToolError::Failed {
            program: self.program.clone(),
            code: result.code(),
            message: self
                .error_msg
                .clone()
                .unwrap_or_else(|| format!("{} failed", self.program)),
            stderr: result.stderr.trim().to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let result = Cmd::new("sh").args(["-c", "echo hello"]).run().unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn missing_program_is_missing() {
        let err = Cmd::new("definitely_not_a_real_command_12345")
            .run()
            .unwrap_err();
        assert!(err.is_missing());
        assert_eq!(err.program(), "definitely_not_a_real_command_12345");
    }

    #[test]
    fn exit_127_is_missing() {
        let err = Cmd::new("sh").args(["-c", "exit 127"]).run().unwrap_err();
        assert!(err.is_missing());

        // allow_fail does not hide a missing tool
        let err = Cmd::new("sh")
            .args(["-c", "exit 127"])
            .allow_fail()
            .run()
            .unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn nonzero_exit_is_failure_with_message() {
        let err = Cmd::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .error_msg("Unable to compile the init program")
            .run()
            .unwrap_err();
        match &err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(*code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Unable to compile the init program (exit code 3)"
        );
    }

    #[test]
    fn allow_fail_returns_status() {
        let result = Cmd::new("sh")
            .args(["-c", "exit 4"])
            .allow_fail()
            .run()
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.code(), Some(4));
    }

    #[test]
    fn runs_in_current_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("marker"), "x").unwrap();
        let result = Cmd::new("ls").current_dir(tmp.path()).run().unwrap();
        assert!(result.stdout.contains("marker"));
    }

    #[test]
    fn display_joins_arguments() {
        let cmd = Cmd::new("dd").args(["if=/dev/zero", "of=hd.img", "bs=1M", "count=512"]);
        assert_eq!(cmd.display(), "dd if=/dev/zero of=hd.img bs=1M count=512");
    }
}
