//! Toolchain probes: alternate toolchain, clippy, and the host target triple.

use std::io::Write;

use tracing::debug;

use crate::error::CiError;
use crate::exec::{CommandRunner, Invocation, OutputMode, run_checked};
use crate::status::StatusLine;
use crate::toolchain::{BuildTool, Toolchain};

/// The host target triple, split into its four conventional components.
///
/// Missing trailing components are empty strings. Components past the fourth
/// are kept only in `full`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTriple {
    pub full: String,
    pub arch: String,
    pub vendor: String,
    pub os: String,
    pub env: String,
}

impl HostTriple {
    pub fn parse(full: &str) -> Self {
        let mut parts = full.split('-').map(str::to_string);
        let mut next = || parts.next().unwrap_or_default();
        Self {
            full: full.to_string(),
            arch: next(),
            vendor: next(),
            os: next(),
            env: next(),
        }
    }

    pub fn components(&self) -> [&str; 4] {
        [&self.arch, &self.vendor, &self.os, &self.env]
    }

    /// The 32-bit cross target checked in addition to the host.
    ///
    /// Only x86_64 Linux and Windows hosts get one: the same triple with the
    /// architecture replaced by `i686`.
    pub fn secondary_target(&self) -> Option<String> {
        if self.arch != "x86_64" || !matches!(self.os.as_str(), "windows" | "linux") {
            return None;
        }
        let (_, rest) = self.full.split_once('-')?;
        Some(format!("i686-{rest}"))
    }
}

/// Whether `cargo +<version>` works, i.e. a toolchain manager can select it.
///
/// # Errors
/// Fails only if the build tool cannot be started or the user interrupts.
pub fn has_alternate_toolchain<R: CommandRunner + ?Sized>(
    runner: &mut R,
    tool: &BuildTool,
    version: &str,
) -> Result<bool, CiError> {
    let toolchain = Toolchain::Pinned(version.to_string());
    let inv = Invocation::new(
        tool.program(),
        tool.args(&toolchain, ["--version"]),
        OutputMode::Discard,
    );
    let available = run_checked(runner, &inv)?.success();
    debug!(version, available, "alternate toolchain probe");
    Ok(available)
}

/// Whether `cargo clippy` is installed for `toolchain`.
///
/// # Errors
/// Fails only if the build tool cannot be started or the user interrupts.
pub fn has_lint_tool<R: CommandRunner + ?Sized>(
    runner: &mut R,
    tool: &BuildTool,
    toolchain: &Toolchain,
) -> Result<bool, CiError> {
    let inv = Invocation::new(
        tool.program(),
        tool.args(toolchain, ["clippy", "--version"]),
        OutputMode::Discard,
    );
    let available = run_checked(runner, &inv)?.success();
    debug!(%toolchain, available, "clippy probe");
    Ok(available)
}

/// Asks rustc for its host triple.
///
/// On failure the probe's stderr is printed as permanent output.
///
/// # Errors
/// Returns [`CiError::Probe`] if the probe exits nonzero or prints no `host: ` line.
pub fn host_triple<R: CommandRunner + ?Sized, W: Write>(
    status: &mut StatusLine<W>,
    runner: &mut R,
    tool: &BuildTool,
    toolchain: &Toolchain,
) -> Result<HostTriple, CiError> {
    let inv = Invocation::new(
        tool.program(),
        tool.args(
            toolchain,
            ["rustc", "--quiet", "--lib", "--", "--version", "--verbose"],
        ),
        OutputMode::Separate,
    );
    let completed = run_checked(runner, &inv)?;
    if !completed.success() {
        status.print_verbatim(&completed.stderr);
        return Err(CiError::Probe(format!(
            "could not determine the host target: {}",
            completed.stderr.trim_end()
        )));
    }

    let triple = completed
        .stdout
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("host: "))
        .ok_or_else(|| {
            CiError::Probe(
                "output of `cargo rustc -- --version --verbose` did not contain a `host: ` line"
                    .into(),
            )
        })?;
    debug!(triple, "host target");
    Ok(HostTriple::parse(triple))
}
