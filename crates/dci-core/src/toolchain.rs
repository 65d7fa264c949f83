//! Toolchain selection and build-tool command lines.

use std::fmt;

/// Which toolchain an invocation runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    /// Whatever `cargo` resolves to without a `+toolchain` selector.
    Default,
    /// An explicitly selected toolchain (`+1.70`, `+nightly`).
    Pinned(String),
}

impl Toolchain {
    /// The `+toolchain` argument, if any. Blank names select the default.
    pub fn selector(&self) -> Option<String> {
        match self {
            Toolchain::Default => None,
            Toolchain::Pinned(name) => {
                let name = name.trim();
                (!name.is_empty()).then(|| format!("+{name}"))
            }
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Toolchain::Default => None,
            Toolchain::Pinned(name) => Some(name.trim()),
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("default"))
    }
}

/// The build-tool executable (`$CARGO` or `cargo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTool {
    program: String,
}

impl BuildTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for `program`: the toolchain selector followed by `rest`.
    pub fn args<I, S>(&self, toolchain: &Toolchain, rest: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        toolchain
            .selector()
            .into_iter()
            .chain(rest.into_iter().map(Into::into))
            .collect()
    }
}
