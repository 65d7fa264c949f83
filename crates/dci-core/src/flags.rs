//! Composition of `CARGO_ENCODED_RUSTFLAGS` / `CARGO_ENCODED_RUSTDOCFLAGS`.
//!
//! Cargo splits the encoded variables on the ASCII unit separator, so flags the
//! caller already set survive untouched and ours are appended as separate tokens.
//! Each composition starts from the value captured at startup, never from the
//! previous composition. Values are kept as `OsString` so paths that are not
//! valid UTF-8 pass through byte for byte.

use std::env;
use std::ffi::{OsStr, OsString};

/// Token separator of Cargo's encoded flag variables (ASCII US).
pub const SEPARATOR: char = '\x1f';

pub const RUSTFLAGS_VAR: &str = "CARGO_ENCODED_RUSTFLAGS";
pub const RUSTDOCFLAGS_VAR: &str = "CARGO_ENCODED_RUSTDOCFLAGS";

/// Appends `-Dwarnings` (and optionally `-Aunknown-lints`) to `current`.
pub fn compose_deny_warnings(current: Option<&OsStr>, allow_unknown_lints: bool) -> OsString {
    let mut value = OsString::new();
    if let Some(current) = current {
        value.push(current);
        value.push(SEPARATOR.to_string());
    }
    value.push("-Dwarnings");
    if allow_unknown_lints {
        value.push(SEPARATOR.to_string());
        value.push("-Aunknown-lints");
    }
    value
}

/// Flag variables handed to every child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagState {
    saved_rustflags: Option<OsString>,
    saved_rustdocflags: Option<OsString>,
    active: Vec<(String, OsString)>,
}

impl FlagState {
    /// Captures the caller's flag variables. Call once at startup.
    pub fn capture() -> Self {
        Self::from_saved(env::var_os(RUSTFLAGS_VAR), env::var_os(RUSTDOCFLAGS_VAR))
    }

    pub fn from_saved(rustflags: Option<OsString>, rustdocflags: Option<OsString>) -> Self {
        Self {
            saved_rustflags: rustflags,
            saved_rustdocflags: rustdocflags,
            active: Vec::new(),
        }
    }

    /// Installs deny-warnings on both variables, each composed from its own
    /// saved value.
    pub fn deny_warnings(&mut self, allow_unknown_lints: bool) {
        self.active = vec![
            (
                RUSTFLAGS_VAR.to_string(),
                compose_deny_warnings(self.saved_rustflags.as_deref(), allow_unknown_lints),
            ),
            (
                RUSTDOCFLAGS_VAR.to_string(),
                compose_deny_warnings(self.saved_rustdocflags.as_deref(), allow_unknown_lints),
            ),
        ];
        tracing::debug!(allow_unknown_lints, "installed deny-warnings flags");
    }

    /// Variables to set on a child; empty until [`FlagState::deny_warnings`] runs.
    pub fn envs(&self) -> &[(String, OsString)] {
        &self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(s: &str) -> Option<&OsStr> {
        Some(OsStr::new(s))
    }

    #[test]
    fn test_compose_without_prior_value() {
        assert_eq!(compose_deny_warnings(None, false), "-Dwarnings");
        assert_eq!(
            compose_deny_warnings(None, true),
            "-Dwarnings\x1f-Aunknown-lints"
        );
    }

    #[test]
    fn test_compose_keeps_prior_tokens() {
        assert_eq!(
            compose_deny_warnings(os("--cfg\x1ffoo"), true),
            "--cfg\x1ffoo\x1f-Dwarnings\x1f-Aunknown-lints"
        );
        // An empty prior value is still a value.
        assert_eq!(compose_deny_warnings(os(""), false), "\x1f-Dwarnings");
    }

    #[test]
    fn test_compose_is_stable_for_fixed_base() {
        for base in [None, os(""), os("-Copt-level=1")] {
            for allow in [true, false] {
                assert_eq!(
                    compose_deny_warnings(base, allow),
                    compose_deny_warnings(base, allow)
                );
            }
        }
    }

    #[test]
    fn test_repeated_installs_do_not_accumulate() {
        let mut flags = FlagState::from_saved(Some("-Ctarget-cpu=native".into()), None);
        flags.deny_warnings(true);
        flags.deny_warnings(false);
        flags.deny_warnings(true);
        assert_eq!(
            flags.envs(),
            &[
                (
                    RUSTFLAGS_VAR.to_string(),
                    OsString::from("-Ctarget-cpu=native\x1f-Dwarnings\x1f-Aunknown-lints")
                ),
                (
                    RUSTDOCFLAGS_VAR.to_string(),
                    OsString::from("-Dwarnings\x1f-Aunknown-lints")
                ),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_base_is_preserved() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let base = OsString::from_vec(b"-L\x1f/opt/lib\xff".to_vec());
        let mut flags = FlagState::from_saved(Some(base), None);
        flags.deny_warnings(true);

        let (name, value) = &flags.envs()[0];
        assert_eq!(name, RUSTFLAGS_VAR);
        assert_eq!(
            value.as_bytes(),
            b"-L\x1f/opt/lib\xff\x1f-Dwarnings\x1f-Aunknown-lints"
        );
    }

    #[test]
    fn test_no_envs_before_install() {
        assert!(FlagState::default().envs().is_empty());
    }
}
