//! Core dci library: status line, flag composition, toolchain probing and the
//! check/test/doc matrix engine.

pub mod error;
pub mod exec;
pub mod flags;
pub mod interrupt;
pub mod logging;
pub mod manifest;
pub mod matrix;
pub mod phase;
pub mod probe;
pub mod status;
pub mod style;
pub mod toolchain;

#[cfg(test)]
pub(crate) mod testing;

pub use error::CiError;
