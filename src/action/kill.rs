use std::sync::Arc;

use nix::sys::signal::Signal;
use tracing::warn;

use super::{Action, ActionContext};
use crate::error::ActionError;
use crate::host::ProcessControl;

/// Terminates the process. Always the last action.
pub struct Kill {
    process: Arc<dyn ProcessControl>,
    signal: Signal,
}

impl Kill {
    pub fn new(process: Arc<dyn ProcessControl>, signal: Signal) -> Self {
        Self { process, signal }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }
}

impl Action for Kill {
    fn name(&self) -> &'static str {
        "kill"
    }

    fn act(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        // Reports must reach the terminal before SIGKILL.
        if let Err(e) = ctx.out.flush() {
            warn!("flushing output failed: {}", e);
        }
        warn!("jvmkill is killing current process");
        self.process.raise(self.signal)?;
        Ok(())
    }
}
