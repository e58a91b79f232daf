//! Glue between ResourceExhausted notifications and the action pipeline.
//!
//! The agent goes `Unconfigured -> Configured -> Armed` exactly once, inside
//! `Agent_OnLoad`: the option string becomes a
//! [`Configuration`](crate::config::Configuration), and [`Controller::arm`]
//! turns that into an event window plus a pipeline. After that the only
//! entry point is [`Controller::on_host_notification`], which may be called
//! from any number of JVM threads at once.
//!
//! A single lock covers the heuristic update and the whole pipeline run, so
//! two notifications can never both decide to fire, and a heap walk never
//! overlaps another one.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::action::{ActionContext, ActionPipeline};
use crate::config::Configuration;
use crate::host::ProcessControl;
use crate::threshold::{EventWindow, Heuristic};

struct Inner {
    heuristic: Box<dyn Heuristic>,
    pipeline: ActionPipeline,
}

pub struct Controller {
    inner: Mutex<Inner>,
}

impl Controller {
    pub fn new(heuristic: Box<dyn Heuristic>, pipeline: ActionPipeline) -> Self {
        Self { inner: Mutex::new(Inner { heuristic, pipeline }) }
    }

    /// Builds the event window and pipeline a configuration asks for.
    pub fn arm(config: &Configuration, process: Arc<dyn ProcessControl>) -> Self {
        let heuristic = EventWindow::new(config.time_threshold, config.count_threshold);
        let pipeline = ActionPipeline::from_config(config, process);
        debug!(actions = ?pipeline.names(), "controller armed");
        Self::new(Box::new(heuristic), pipeline)
    }

    /// Handles one ResourceExhausted notification.
    ///
    /// Runs the pipeline on the calling thread when the heuristic fires.
    /// Action failures are logged by the pipeline and never escape.
    pub fn on_host_notification(&self, ctx: &mut ActionContext<'_>) {
        let mut inner = self.inner.lock();

        if ctx.flags.is_java_heap() {
            info!("Resource exhaustion event: the JVM was unable to allocate memory from the heap.");
        }
        if ctx.flags.is_threads() {
            info!("Resource exhaustion event: the JVM was unable to create a thread.");
        }

        if inner.heuristic.on_event() {
            inner.pipeline.run_all(ctx);
        } else if ctx.flags.is_oom_error() {
            info!("The JVM is about to throw a java.lang.OutOfMemoryError.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Kill};
    use crate::error::{ActionError, HostError};
    use crate::host::{
        ExhaustionFlags, HeapDumper, HeapWalker, MemoryUsage, PoolUsage, ReachedObject,
        RuntimeTelemetry, Visit,
    };
    use crate::sys::jni::jclass;
    use nix::errno::Errno;
    use nix::sys::signal::Signal;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoHost;

    impl HeapWalker for NoHost {
        fn loaded_classes(&self) -> Result<Vec<jclass>, HostError> {
            Ok(Vec::new())
        }
        fn class_signature(&self, _: jclass) -> Result<String, HostError> {
            Err(HostError::Unavailable("no classes".into()))
        }
        fn set_class_tag(&self, _: jclass, _: i64) -> Result<(), HostError> {
            Ok(())
        }
        fn follow_references(
            &self,
            _: &mut dyn FnMut(ReachedObject<'_>) -> Visit,
        ) -> Result<(), HostError> {
            Ok(())
        }
    }

    impl RuntimeTelemetry for NoHost {
        fn heap_memory_usage(&self) -> Result<MemoryUsage, HostError> {
            Ok(MemoryUsage::default())
        }
        fn non_heap_memory_usage(&self) -> Result<MemoryUsage, HostError> {
            Ok(MemoryUsage::default())
        }
        fn memory_pools(&self) -> Result<Vec<PoolUsage>, HostError> {
            Ok(Vec::new())
        }
    }

    impl HeapDumper for NoHost {
        fn dump_heap(&self, _: &Path) -> Result<(), HostError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingProcess {
        raised: AtomicUsize,
    }

    impl ProcessControl for CountingProcess {
        fn raise(&self, _: Signal) -> Result<(), Errno> {
            self.raised.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Scripted(Vec<bool>);

    impl Heuristic for Scripted {
        fn on_event(&mut self) -> bool {
            if self.0.is_empty() {
                false
            } else {
                self.0.remove(0)
            }
        }
    }

    struct Noop;

    impl Action for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }
        fn act(&self, _: &mut ActionContext<'_>) -> Result<(), ActionError> {
            Ok(())
        }
    }

    #[test]
    fn pipeline_runs_only_when_heuristic_fires() {
        let process = Arc::new(CountingProcess::default());
        let pipeline = ActionPipeline::builder()
            .then(Noop)
            .build(Kill::new(process.clone(), Signal::SIGKILL));
        let controller = Controller::new(Box::new(Scripted(vec![false, true, false])), pipeline);

        let host = NoHost;
        for _ in 0..3 {
            let mut out = Vec::new();
            let mut ctx = ActionContext::new(ExhaustionFlags::JAVA_HEAP, &host, &mut out);
            controller.on_host_notification(&mut ctx);
        }

        assert_eq!(process.raised.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn armed_with_zero_count_kills_on_first_event() {
        let process = Arc::new(CountingProcess::default());
        let config = Configuration {
            print_memory_usage: false,
            ..Configuration::default()
        };
        let controller = Controller::arm(&config, process.clone());

        let host = NoHost;
        let mut out = Vec::new();
        let mut ctx = ActionContext::new(ExhaustionFlags::OOM_ERROR, &host, &mut out);
        controller.on_host_notification(&mut ctx);

        assert_eq!(process.raised.load(Ordering::SeqCst), 1);
    }
}
