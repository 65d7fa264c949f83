mod cli;

use std::process;

use dci_core::CiError;
use dci_core::style::error_prefix;

fn main() {
    let code = match cli::run() {
        Ok(()) => 0,
        Err(e) => exit_code(&e),
    };
    process::exit(code);
}

/// Phase failures and interrupts exit silently with their own codes; their
/// output is already on screen. Everything else is reported here.
fn exit_code(e: &anyhow::Error) -> i32 {
    if let Some(ci) = e.downcast_ref::<CiError>()
        && matches!(ci, CiError::PhaseFailed { .. } | CiError::Interrupted)
    {
        return ci.exit_code();
    }
    eprintln!("{} {e:#}", error_prefix()); // pretty anyhow chain
    1
}
