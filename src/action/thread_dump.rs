use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nix::sys::signal::Signal;
use tracing::info;

use super::{banner, Action, ActionContext};
use crate::error::ActionError;
use crate::host::ProcessControl;

/// Asks the VM for a thread dump by sending it SIGQUIT, then gives it time
/// to print before the process goes away.
pub struct ThreadDump {
    process: Arc<dyn ProcessControl>,
    delay: Duration,
}

impl ThreadDump {
    pub fn new(process: Arc<dyn ProcessControl>, delay: Duration) -> Self {
        Self { process, delay }
    }
}

impl Action for ThreadDump {
    fn name(&self) -> &'static str {
        "thread dump"
    }

    fn act(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        banner(ctx.out, "Thread Dump")?;
        ctx.out.flush()?;

        self.process.raise(Signal::SIGQUIT)?;
        info!(delay_ms = self.delay.as_millis() as u64, "waiting for thread dump");
        thread::sleep(self.delay);
        Ok(())
    }
}
