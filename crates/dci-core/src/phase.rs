//! One build-tool invocation with a progress line and fail-fast exit.

use std::io::Write;

use tracing::info;

use crate::error::CiError;
use crate::exec::{CommandRunner, Invocation, OutputMode, run_checked};
use crate::flags::FlagState;
use crate::status::StatusLine;
use crate::style::italic;
use crate::toolchain::{BuildTool, Toolchain};

/// A single cargo subcommand run, e.g. `Check for default config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub label: String,
    pub subcommand: String,
    pub args: Vec<String>,
    /// Pass `--frozen` so a stale lockfile fails instead of being rewritten.
    pub frozen: bool,
    /// Capture output (stderr merged in) and show it only on failure.
    pub capture: bool,
}

impl Phase {
    pub fn new(label: impl Into<String>, subcommand: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            subcommand: subcommand.into(),
            args: Vec::new(),
            frozen: true,
            capture: true,
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    #[must_use]
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Everything after the program name.
    pub fn command_args(&self, tool: &BuildTool, toolchain: &Toolchain) -> Vec<String> {
        let mut rest = vec![
            self.subcommand.clone(),
            "--quiet".to_string(),
            "--color".to_string(),
            "always".to_string(),
        ];
        if self.frozen {
            rest.push("--frozen".to_string());
        }
        rest.extend(self.args.iter().cloned());
        tool.args(toolchain, rest)
    }
}

/// Runs phases with the driver's build tool and flag variables.
#[derive(Debug, Clone, Copy)]
pub struct PhaseRunner<'a> {
    pub tool: &'a BuildTool,
    pub flags: &'a FlagState,
}

impl PhaseRunner<'_> {
    /// Shows `<label>…`, runs the phase, and on failure prints the captured
    /// output as permanent text.
    ///
    /// # Errors
    /// Returns [`CiError::PhaseFailed`] carrying the child's exit code when the
    /// phase fails; the caller is expected to stop the run and exit with it.
    pub fn run<R: CommandRunner + ?Sized, W: Write>(
        &self,
        status: &mut StatusLine<W>,
        runner: &mut R,
        toolchain: &Toolchain,
        phase: &Phase,
    ) -> Result<(), CiError> {
        status.print(italic(format!("{}…", phase.label)));
        info!(label = %phase.label, %toolchain, "phase started");

        let output = if phase.capture {
            OutputMode::Merged
        } else {
            OutputMode::Inherit
        };
        let inv = Invocation::new(
            self.tool.program(),
            phase.command_args(self.tool, toolchain),
            output,
        )
        .with_envs(self.flags.envs());
        let completed = run_checked(runner, &inv)?;

        if !completed.success() {
            if !completed.stdout.is_empty() {
                status.print_verbatim(&completed.stdout);
            }
            return Err(CiError::PhaseFailed {
                subcommand: phase.subcommand.clone(),
                code: completed.code,
            });
        }

        info!(label = %phase.label, "phase succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_command_shape() {
        let tool = BuildTool::new("cargo");
        let phase = Phase::new("Check for default config", "clippy").args(["--all-targets"]);
        assert_eq!(
            phase.command_args(&tool, &Toolchain::Pinned("1.70".into())),
            vec!["+1.70", "clippy", "--quiet", "--color", "always", "--frozen", "--all-targets"]
        );

        let fetch = Phase::new("Fetching dependencies", "fetch").frozen(false);
        assert_eq!(
            fetch.command_args(&tool, &Toolchain::Default),
            vec!["fetch", "--quiet", "--color", "always"]
        );
    }

    #[test]
    fn test_success_shows_label_and_passes_flags() {
        let tool = BuildTool::new("cargo");
        let mut flags = FlagState::default();
        flags.deny_warnings(true);
        let mut runner = ScriptedRunner::new();
        let mut status = StatusLine::new(Vec::new());

        PhaseRunner {
            tool: &tool,
            flags: &flags,
        }
        .run(
            &mut status,
            &mut runner,
            &Toolchain::Default,
            &Phase::new("Rustdoc for default config", "doc"),
        )
        .unwrap();

        let shown = String::from_utf8(status.into_inner()).unwrap();
        assert_eq!(shown, "\x1b[3mRustdoc for default config…\x1b[23m\n");
        assert_eq!(runner.calls[0].output, OutputMode::Merged);
        assert_eq!(runner.calls[0].envs, flags.envs());
    }

    #[test]
    fn test_failure_surfaces_output_and_code() {
        let tool = BuildTool::new("cargo");
        let flags = FlagState::default();
        let mut runner =
            ScriptedRunner::new().on_arg("test", 101, "error[E0001]: something broke\n");
        let mut status = StatusLine::new(Vec::new());

        let err = {
            let mut line = status.erasing();
            PhaseRunner {
                tool: &tool,
                flags: &flags,
            }
            .run(
                &mut line,
                &mut runner,
                &Toolchain::Default,
                &Phase::new("Tests for default config", "test"),
            )
            .unwrap_err()
        };

        assert!(matches!(
            err,
            CiError::PhaseFailed { ref subcommand, code: 101 } if subcommand == "test"
        ));
        let shown = String::from_utf8(status.into_inner()).unwrap();
        assert!(shown.ends_with("error[E0001]: something broke\n"));
    }

    #[test]
    fn test_uncaptured_phase_streams() {
        let tool = BuildTool::new("cargo");
        let flags = FlagState::default();
        let mut runner = ScriptedRunner::new();
        let mut status = StatusLine::new(Vec::new());
        PhaseRunner {
            tool: &tool,
            flags: &flags,
        }
        .run(
            &mut status,
            &mut runner,
            &Toolchain::Default,
            &Phase::new("Tests for default config", "test").capture(false),
        )
        .unwrap();
        assert_eq!(runner.calls[0].output, OutputMode::Inherit);
    }
}
