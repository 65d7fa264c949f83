//! Blocking process execution.
//!
//! [`CommandRunner`] is the seam between the matrix engine and the operating
//! system; tests substitute a scripted runner.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::CiError;
use crate::interrupt;

/// Where a child's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture stderr interleaved into the stdout pipe.
    Merged,
    /// Capture stdout and stderr independently.
    Separate,
    /// Send both to the null device.
    Discard,
    /// Stream both to the terminal.
    Inherit,
}

/// One external command. stdin is always closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, OsString)>,
    pub output: OutputMode,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, output: OutputMode) -> Self {
        Self {
            program: program.into(),
            args,
            envs: Vec::new(),
            output,
        }
    }

    #[must_use]
    pub fn with_envs(mut self, envs: &[(String, OsString)]) -> Self {
        self.envs.extend_from_slice(envs);
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a finished child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completed {
    pub code: i32,
    /// Captured stdout, or the merged stream in [`OutputMode::Merged`].
    pub stdout: String,
    pub stderr: String,
}

impl Completed {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait CommandRunner {
    /// Runs `invocation` to completion.
    ///
    /// # Errors
    /// Returns an error only if the child could not be started or its output
    /// could not be read; a nonzero exit is reported through [`Completed::code`].
    fn run(&mut self, invocation: &Invocation) -> Result<Completed, CiError>;
}

/// Runs `invocation` and turns a pending Ctrl+C into [`CiError::Interrupted`].
///
/// Nothing is spawned once an interrupt is pending.
///
/// # Errors
/// Propagates runner errors; returns `Interrupted` if the user pressed Ctrl+C
/// before or while the child was running.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &mut R,
    invocation: &Invocation,
) -> Result<Completed, CiError> {
    if interrupt::is_interrupted() {
        return Err(CiError::Interrupted);
    }
    let completed = runner.run(invocation)?;
    if interrupt::is_interrupted() {
        return Err(CiError::Interrupted);
    }
    Ok(completed)
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<Completed, CiError> {
        debug!(command = %invocation, output = ?invocation.output, "spawning");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());
        let spawn_error = |source| CiError::Spawn {
            program: invocation.program.clone(),
            source,
        };

        let completed = match invocation.output {
            OutputMode::Merged => {
                let (mut reader, writer) = io::pipe()?;
                cmd.stdout(writer.try_clone()?).stderr(writer);
                let mut child = cmd.spawn().map_err(spawn_error)?;
                // The command holds write ends; drop it so the read sees EOF.
                drop(cmd);
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                let status = child.wait()?;
                Completed {
                    code: exit_code(status),
                    stdout: String::from_utf8_lossy(&buf).into_owned(),
                    stderr: String::new(),
                }
            }
            OutputMode::Separate => {
                let output = cmd
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .map_err(spawn_error)?;
                Completed {
                    code: exit_code(output.status),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
            OutputMode::Discard => {
                let status = cmd
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .map_err(spawn_error)?;
                Completed {
                    code: exit_code(status),
                    ..Completed::default()
                }
            }
            OutputMode::Inherit => {
                let status = cmd.status().map_err(spawn_error)?;
                Completed {
                    code: exit_code(status),
                    ..Completed::default()
                }
            }
        };

        debug!(command = %invocation, code = completed.code, "finished");
        Ok(completed)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    fn sh(script: &str, output: OutputMode) -> Invocation {
        Invocation::new("sh", vec!["-c".into(), script.into()], output)
    }

    #[test]
    fn test_display_joins_argv() {
        let inv = Invocation::new(
            "cargo",
            vec!["+1.70".into(), "--version".into()],
            OutputMode::Discard,
        );
        assert_eq!(inv.to_string(), "cargo +1.70 --version");
    }

    #[test]
    fn test_pending_interrupt_spawns_nothing() {
        let mut runner = ScriptedRunner::new();
        crate::interrupt::trigger_for_test();
        let test = Invocation::new(
            "cargo",
            vec!["test".into(), "--quiet".into()],
            OutputMode::Merged,
        );
        let result = run_checked(&mut runner, &test);
        crate::interrupt::reset();
        assert!(matches!(result, Err(CiError::Interrupted)));
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn test_interrupt_during_child_is_reported() {
        let mut runner = ScriptedRunner::new().on(
            |_| {
                crate::interrupt::trigger_for_test();
                true
            },
            Completed {
                code: 130,
                ..Completed::default()
            },
        );
        let result = run_checked(&mut runner, &sh("true", OutputMode::Discard));
        crate::interrupt::reset();
        assert!(matches!(result, Err(CiError::Interrupted)));
        assert_eq!(runner.calls.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_merged_output_interleaves_streams() {
        let completed = SystemRunner
            .run(&sh("echo out; echo err >&2; exit 3", OutputMode::Merged))
            .unwrap();
        assert_eq!(completed.code, 3);
        assert_eq!(completed.stdout, "out\nerr\n");
        assert!(completed.stderr.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_separate_output_keeps_streams_apart() {
        let completed = SystemRunner
            .run(&sh("echo out; echo err >&2", OutputMode::Separate))
            .unwrap();
        assert!(completed.success());
        assert_eq!(completed.stdout, "out\n");
        assert_eq!(completed.stderr, "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_child_sees_extra_env_and_closed_stdin() {
        let inv = sh("cat; printf %s \"$DCI_TEST_VAR\"", OutputMode::Merged)
            .with_envs(&[("DCI_TEST_VAR".into(), "-Dwarnings".into())]);
        let completed = SystemRunner.run(&inv).unwrap();
        assert_eq!(completed.stdout, "-Dwarnings");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let inv = Invocation::new("dci-no-such-program", Vec::new(), OutputMode::Discard);
        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(matches!(err, CiError::Spawn { .. }));
    }
}
