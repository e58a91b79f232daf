//! Things the agent does once the threshold fires.
//!
//! Actions run in a fixed order: heap histogram, memory pools, thread dump,
//! heap dump and finally the kill. Every action before the kill is
//! best-effort: an error or a panic is logged and the next one still runs.
//! [`Kill`] is held outside the list so nothing can be scheduled after it.

mod heap_dump;
mod heap_histogram;
mod kill;
mod pool_stats;
mod thread_dump;

pub use heap_dump::HeapDump;
pub use heap_histogram::HeapHistogram;
pub use kill::Kill;
pub use pool_stats::PoolStats;
pub use thread_dump::ThreadDump;

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::config::Configuration;
use crate::error::ActionError;
use crate::host::{ExhaustionFlags, HeapDumper, HeapWalker, ProcessControl, RuntimeTelemetry};

/// How long the thread dump action waits for the VM to print after SIGQUIT.
pub const THREAD_DUMP_DELAY: Duration = Duration::from_secs(5);

/// Everything an action may touch while handling one event.
pub struct ActionContext<'a> {
    pub flags: ExhaustionFlags,
    pub heap: &'a dyn HeapWalker,
    pub runtime: &'a dyn RuntimeTelemetry,
    pub dumper: &'a dyn HeapDumper,
    /// Report output. The VM's stdout in production.
    pub out: &'a mut dyn Write,
}

impl<'a> ActionContext<'a> {
    /// Builds a context from a single host that provides every capability.
    pub fn new<H>(flags: ExhaustionFlags, host: &'a H, out: &'a mut dyn Write) -> Self
    where
        H: HeapWalker + RuntimeTelemetry + HeapDumper,
    {
        Self { flags, heap: host, runtime: host, dumper: host, out }
    }
}

pub trait Action: Send {
    fn name(&self) -> &'static str;

    fn act(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError>;
}

pub struct ActionPipeline {
    actions: Vec<Box<dyn Action>>,
    kill: Kill,
}

impl ActionPipeline {
    pub fn builder() -> ActionPipelineBuilder {
        ActionPipelineBuilder { actions: Vec::new() }
    }

    /// The pipeline a configuration asks for.
    pub fn from_config(config: &Configuration, process: Arc<dyn ProcessControl>) -> Self {
        let mut builder = Self::builder();
        if config.print_heap_histogram {
            builder = builder.then(HeapHistogram::new(config.heap_histogram_max_entries));
        }
        if config.print_memory_usage {
            builder = builder.then(PoolStats);
        }
        if config.print_thread_dump {
            builder = builder.then(ThreadDump::new(process.clone(), THREAD_DUMP_DELAY));
        }
        if let Some(template) = &config.heap_dump_path {
            builder = builder.then(HeapDump::new(template.clone()));
        }
        builder.build(Kill::new(process, config.signal))
    }

    /// Action names in execution order, the kill included.
    pub fn names(&self) -> Vec<&'static str> {
        self.actions
            .iter()
            .map(|a| a.name())
            .chain(std::iter::once(self.kill.name()))
            .collect()
    }

    pub fn run_all(&self, ctx: &mut ActionContext<'_>) {
        for action in &self.actions {
            run_guarded(action.as_ref(), ctx);
        }
        run_guarded(&self.kill, ctx);
    }
}

pub struct ActionPipelineBuilder {
    actions: Vec<Box<dyn Action>>,
}

impl ActionPipelineBuilder {
    pub fn then<A: Action + 'static>(mut self, action: A) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn build(self, kill: Kill) -> ActionPipeline {
        ActionPipeline { actions: self.actions, kill }
    }
}

fn run_guarded(action: &dyn Action, ctx: &mut ActionContext<'_>) {
    debug!(action = action.name(), "running action");
    let result = panic::catch_unwind(AssertUnwindSafe(|| action.act(ctx)))
        .unwrap_or_else(|payload| Err(ActionError::Panicked(panic_message(payload.as_ref()))));

    if let Err(e) = result {
        error!("{} action failed: {}", action.name(), e);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Writes the blank line and `>>>` heading that precede each report section.
pub(crate) fn banner(out: &mut dyn Write, title: &str) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, ">>> {}", title)
}
