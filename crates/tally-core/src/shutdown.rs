//! Graceful shutdown support via atomic flag

use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Request shutdown; long-running loops stop at their next checkpoint.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Route SIGINT/SIGTERM to [`request_shutdown`] from a background thread.
///
/// A second signal exits immediately with status 130.
pub fn install_signal_handlers() -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for sig in signals.forever() {
                if SHUTDOWN.swap(true, Ordering::Relaxed) {
                    log::error!("Received signal {sig} again, exiting");
                    std::process::exit(130);
                }
                log::warn!("Received signal {sig}, finishing current item then stopping");
            }
        })?;
    Ok(())
}
