//! Ctrl+C handling.
//!
//! The handler only raises a flag. Children in the same process group receive
//! the signal too and exit; the runner then sees the flag and stops the run.

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit code used when the run is interrupted.
pub const EXIT_CODE: i32 = 2;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INIT: Once = Once::new();

#[cfg(test)]
thread_local! {
    static TEST_INTERRUPT_OVERRIDE: std::cell::Cell<Option<bool>> = const { std::cell::Cell::new(None) };
}

/// Installs the Ctrl+C handler. Subsequent calls are no-ops.
///
/// # Errors
/// Returns an error if the handler cannot be registered.
pub fn init() -> Result<(), ctrlc::Error> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = ctrlc::set_handler(move || {
            if INTERRUPTED.load(Ordering::SeqCst) {
                // Second Ctrl+C - force exit
                std::process::exit(EXIT_CODE);
            }
            INTERRUPTED.store(true, Ordering::SeqCst);
        });
    });
    result
}

/// Checks if an interrupt has been requested.
pub fn is_interrupted() -> bool {
    #[cfg(test)]
    if let Some(val) = TEST_INTERRUPT_OVERRIDE.with(std::cell::Cell::get) {
        return val;
    }
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Resets the interrupt flag.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
    #[cfg(test)]
    TEST_INTERRUPT_OVERRIDE.with(|c| c.set(None));
}

/// Simulates Ctrl+C for the current test thread only.
#[cfg(test)]
pub(crate) fn trigger_for_test() {
    TEST_INTERRUPT_OVERRIDE.with(|c| c.set(Some(true)));
}
