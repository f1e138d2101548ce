//! Ctrl-C handling for long-running commands.
//!
//! The first Ctrl-C fires the run's [`CancelToken`]: the agent call in flight
//! finishes and the run stops before the next one, exiting with
//! `exit_codes::CANCELLED`. A second Ctrl-C exits immediately.

use bpt::engine::CancelToken;
use bpt::exit_codes;
use tracing::{debug, warn};

/// Watch for Ctrl-C on a background thread and cancel `token` when it arrives.
///
/// Failing to install the handler is logged and otherwise ignored; the run
/// then simply cannot be interrupted gracefully.
pub fn cancel_on_interrupt(token: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("bpt-interrupt".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    debug!("failed to start signal runtime: {}", e);
                    return;
                }
            };

            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    debug!("failed to listen for Ctrl-C: {}", e);
                    return;
                }
                warn!("interrupted; stopping after the current agent (Ctrl-C again to abort)");
                token.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(exit_codes::CANCELLED);
                }
            });
        });

    if let Err(e) = spawned {
        debug!("failed to spawn interrupt watcher: {}", e);
    }
}
