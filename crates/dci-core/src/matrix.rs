//! The toolchain × target × feature matrix.
//!
//! A run is: read the MSRV, probe the toolchain, fetch dependencies, then for
//! each target pass and each toolchain run check/test/doc under the default
//! configuration and again with one extra feature. The first failing phase ends
//! the run.

use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::error::CiError;
use crate::exec::CommandRunner;
use crate::flags::FlagState;
use crate::manifest;
use crate::phase::{Phase, PhaseRunner};
use crate::probe::{self, HostTriple};
use crate::status::StatusLine;
use crate::style::{blue, green, italic, red, yellow};
use crate::toolchain::{BuildTool, Toolchain};

/// Feature exercised when neither the command line nor the manifest names one.
pub const DEFAULT_FEATURE: &str = "tokio";
pub const DEFAULT_NIGHTLY: &str = "nightly";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub manifest_path: PathBuf,
    /// Build-tool executable.
    pub cargo: String,
    /// Overrides `package.metadata.dci.feature`.
    pub feature: Option<String>,
    /// Name of the bleeding-edge toolchain.
    pub nightly: String,
    /// Capture phase output; `false` streams it to the terminal.
    pub capture: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("Cargo.toml"),
            cargo: "cargo".to_string(),
            feature: None,
            nightly: DEFAULT_NIGHTLY.to_string(),
            capture: true,
        }
    }
}

/// What the startup probes found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probes {
    pub msrv: String,
    /// `cargo +<msrv>` works, so toolchains can be selected explicitly.
    pub has_alternate_toolchain: bool,
    pub has_clippy: bool,
    pub host: HostTriple,
}

/// One pass over a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPass {
    /// `None` for the host target.
    pub target: Option<String>,
    pub run_tests: bool,
    /// Toolchains in run order.
    pub toolchains: Vec<Toolchain>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixPlan {
    pub passes: Vec<TargetPass>,
    /// `clippy` when available, otherwise `check`.
    pub check_subcommand: String,
    pub feature: String,
    /// Toolchain held to the stricter lint standard (no `-Aunknown-lints`).
    pub nightly: Toolchain,
}

impl MatrixPlan {
    /// Host pass first; an i686 pass follows on x86_64 Linux/Windows hosts.
    ///
    /// Without an alternate toolchain only the ambient toolchain is exercised.
    pub fn new(probes: &Probes, feature: &str, nightly: &str) -> Self {
        let nightly = Toolchain::Pinned(nightly.to_string());
        let toolchains = if probes.has_alternate_toolchain {
            vec![Toolchain::Pinned(probes.msrv.clone()), nightly.clone()]
        } else {
            vec![Toolchain::Default]
        };

        let mut passes = vec![TargetPass {
            target: None,
            run_tests: true,
            toolchains: toolchains.clone(),
        }];
        if let Some(target) = probes.host.secondary_target() {
            // Tests are always requested here, whatever the probes found.
            passes.push(TargetPass {
                target: Some(target),
                run_tests: true,
                toolchains,
            });
        }

        Self {
            passes,
            check_subcommand: String::from(if probes.has_clippy { "clippy" } else { "check" }),
            feature: feature.to_string(),
            nightly,
        }
    }

    pub fn allows_unknown_lints(&self, toolchain: &Toolchain) -> bool {
        *toolchain != self.nightly
    }

    /// The phases of one suite, in order.
    pub fn suite_phases(&self, pass: &TargetPass, capture: bool) -> Vec<Phase> {
        let target: Vec<String> = pass
            .target
            .iter()
            .flat_map(|t| ["--target".to_string(), t.clone()])
            .collect();
        let feature_args = ["--features".to_string(), self.feature.clone()];

        let configs = [
            ("default", &[][..]),
            (self.feature.as_str(), &feature_args[..]),
        ];

        let mut phases = Vec::new();
        for (config, features) in configs {
            let with = |extra: &[&str]| {
                features
                    .iter()
                    .cloned()
                    .chain(target.iter().cloned())
                    .chain(extra.iter().map(ToString::to_string))
                    .collect::<Vec<_>>()
            };
            phases.push(
                Phase::new(format!("Check for {config} config"), &self.check_subcommand)
                    .args(with(&["--all-targets"])),
            );
            if pass.run_tests {
                phases.push(
                    Phase::new(format!("Tests for {config} config"), "test").args(with(&[])),
                );
            }
            phases.push(
                Phase::new(format!("Rustdoc for {config} config"), "doc")
                    .args(with(&["--no-deps"])),
            );
        }

        phases.into_iter().map(|p| p.capture(capture)).collect()
    }
}

/// Drives a full matrix run.
pub struct Driver<R> {
    config: DriverConfig,
    runner: R,
    tool: BuildTool,
    flags: FlagState,
}

impl<R: CommandRunner> Driver<R> {
    /// `flags` must hold the caller's flag variables as captured at startup.
    pub fn new(config: DriverConfig, runner: R, flags: FlagState) -> Self {
        let tool = BuildTool::new(config.cargo.clone());
        Self {
            config,
            runner,
            tool,
            flags,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs the whole matrix.
    ///
    /// # Errors
    /// Stops at the first configuration, probe, or phase failure.
    pub fn run<W: Write>(&mut self, status: &mut StatusLine<W>) -> Result<(), CiError> {
        let manifest = manifest::load(&self.config.manifest_path)?;
        let feature = self
            .config
            .feature
            .clone()
            .or(manifest.settings.feature)
            .unwrap_or_else(|| DEFAULT_FEATURE.to_string());
        info!(msrv = %manifest.msrv, %feature, "starting matrix run");

        let probes = self.prepare(status, &manifest.msrv)?;
        let plan = MatrixPlan::new(&probes, &feature, &self.config.nightly);

        for pass in &plan.passes {
            let header = match &pass.target {
                None => format!("{} (host target)", yellow(&probes.host.full)),
                Some(target) => yellow(target),
            };
            status.print(header);
            let mut indented = status.indent();
            for toolchain in &pass.toolchains {
                self.suite(&mut indented, &plan, pass, toolchain)?;
            }
        }

        status.print(format!("Discontinuous integration {}", green("succeeded")));
        Ok(())
    }

    /// Probes the toolchain and fetches dependencies.
    ///
    /// # Errors
    /// Fails if the host triple cannot be determined or the fetch fails.
    pub fn prepare<W: Write>(
        &mut self,
        status: &mut StatusLine<W>,
        msrv: &str,
    ) -> Result<Probes, CiError> {
        let mut line = status.erasing();

        line.print(italic("Preparing toolchain…"));
        let has_alternate_toolchain =
            probe::has_alternate_toolchain(&mut self.runner, &self.tool, msrv)?;
        let probe_toolchain = if has_alternate_toolchain {
            Toolchain::Pinned(msrv.to_string())
        } else {
            Toolchain::Default
        };
        let has_clippy = probe::has_lint_tool(&mut self.runner, &self.tool, &probe_toolchain)?;
        line.print_permanent(format!(
            "Clippy is {}",
            if has_clippy {
                green("available")
            } else {
                red("not available")
            }
        ));

        line.print(italic("Determining host target…"));
        let host = probe::host_triple(&mut line, &mut self.runner, &self.tool, &probe_toolchain)?;

        let fetch = Phase::new("Fetching dependencies", "fetch")
            .frozen(false)
            .capture(self.config.capture);
        PhaseRunner {
            tool: &self.tool,
            flags: &self.flags,
        }
        .run(&mut line, &mut self.runner, &Toolchain::Default, &fetch)?;

        Ok(Probes {
            msrv: msrv.to_string(),
            has_alternate_toolchain,
            has_clippy,
            host,
        })
    }

    fn suite<W: Write>(
        &mut self,
        status: &mut StatusLine<W>,
        plan: &MatrixPlan,
        pass: &TargetPass,
        toolchain: &Toolchain,
    ) -> Result<(), CiError> {
        self.flags.deny_warnings(plan.allows_unknown_lints(toolchain));
        let phases = plan.suite_phases(pass, self.config.capture);

        {
            let mut line = status.erasing();
            let phase_runner = PhaseRunner {
                tool: &self.tool,
                flags: &self.flags,
            };
            for phase in &phases {
                phase_runner.run(&mut line, &mut self.runner, toolchain, phase)?;
            }
        }

        let version = toolchain
            .name()
            .map(|name| format!(" for {}", blue(name)))
            .unwrap_or_default();
        status.print(format!("Suite {}{version}", green("succeeded")));
        info!(%toolchain, target = ?pass.target, "suite succeeded");
        Ok(())
    }
}
