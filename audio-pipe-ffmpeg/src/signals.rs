//! Opt-in wiring of Ctrl+C and SIGTERM to a cancellation token.
//!
//! Nothing here runs unless the application asks for it. Only one handler
//! can be installed per process.

use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::session::cancellation::CancellationToken;

/// Cancel `token` on interrupt or termination.
///
/// Every stream handle sharing the token has its subprocess killed. When
/// `exit_code` is given the process exits with it after the hooks ran.
pub fn cancel_on_interrupt(token: CancellationToken, exit_code: Option<i32>) -> Result<(), PipeError> {
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, cancelling open streams");
        token.cancel();
        if let Some(code) = exit_code {
            std::process::exit(code);
        }
    })
    .map_err(|e| PipeError::InvalidConfiguration(format!("failed to install interrupt handler: {}", e)))
}
