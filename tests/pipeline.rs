mod common;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{usage, FakeHost, RecordingProcess};
use jvmkill::action::{
    Action, ActionContext, ActionPipeline, HeapHistogram, Kill, PoolStats, ThreadDump,
};
use jvmkill::config::Configuration;
use jvmkill::error::ActionError;
use jvmkill::host::{ExhaustionFlags, PoolUsage, ProcessControl};
use nix::errno::Errno;
use nix::sys::signal::Signal;

struct Say(&'static str);

impl Action for Say {
    fn name(&self) -> &'static str {
        self.0
    }

    fn act(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        writeln!(ctx.out, "{}", self.0)?;
        Ok(())
    }
}

struct Fail;

impl Action for Fail {
    fn name(&self) -> &'static str {
        "fail"
    }

    fn act(&self, _: &mut ActionContext<'_>) -> Result<(), ActionError> {
        Err(io::Error::new(io::ErrorKind::Other, "disk on fire").into())
    }
}

struct Panic;

impl Action for Panic {
    fn name(&self) -> &'static str {
        "panic"
    }

    fn act(&self, _: &mut ActionContext<'_>) -> Result<(), ActionError> {
        panic!("diagnostic blew up")
    }
}

fn run(pipeline: &ActionPipeline, host: &FakeHost, flags: ExhaustionFlags) -> String {
    let mut out = Vec::new();
    let mut ctx = ActionContext::new(flags, host, &mut out);
    pipeline.run_all(&mut ctx);
    String::from_utf8(out).unwrap()
}

#[test]
fn actions_run_in_registration_order() {
    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(Say("first"))
        .then(Say("second"))
        .then(Say("third"))
        .build(Kill::new(process.clone(), Signal::SIGKILL));

    let out = run(&pipeline, &FakeHost::new(), ExhaustionFlags::JAVA_HEAP);

    assert_eq!(out, "first\nsecond\nthird\n");
    assert_eq!(process.signals(), vec![Signal::SIGKILL]);
    assert_eq!(pipeline.names(), vec!["first", "second", "third", "kill"]);
}

#[test]
fn failing_action_does_not_stop_the_kill() {
    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(Fail)
        .then(Say("after"))
        .build(Kill::new(process.clone(), Signal::SIGTERM));

    let out = run(&pipeline, &FakeHost::new(), ExhaustionFlags::JAVA_HEAP);

    assert_eq!(out, "after\n");
    assert_eq!(process.signals(), vec![Signal::SIGTERM]);
}

#[test]
fn panicking_action_does_not_stop_the_kill() {
    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(Panic)
        .then(Say("after"))
        .build(Kill::new(process.clone(), Signal::SIGKILL));

    let out = run(&pipeline, &FakeHost::new(), ExhaustionFlags::JAVA_HEAP);

    assert_eq!(out, "after\n");
    assert_eq!(process.signals(), vec![Signal::SIGKILL]);
}

#[test]
fn failed_histogram_still_kills() {
    let mut host = FakeHost::new();
    let class = host.class("La;");
    let object = host.object(class, 8, &[]);
    host.root(object);
    let host = host.failing("follow_references");

    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(HeapHistogram::new(10))
        .build(Kill::new(process.clone(), Signal::SIGKILL));

    let out = run(&pipeline, &host, ExhaustionFlags::JAVA_HEAP);

    assert!(!out.contains(">>> Heap Histogram"));
    assert_eq!(process.signals(), vec![Signal::SIGKILL]);
}

#[test]
fn histogram_is_printed_with_java_names() {
    let mut host = FakeHost::new();
    let string = host.class("Ljava/lang/String;");
    let chars = host.class("[C");
    let array = host.object(chars, 100, &[]);
    let s = host.object(string, 24, &[array]);
    host.root(s);

    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(HeapHistogram::new(0))
        .build(Kill::new(process, Signal::SIGKILL));

    let out = run(&pipeline, &host, ExhaustionFlags::OOM_ERROR | ExhaustionFlags::JAVA_HEAP);

    assert_eq!(
        out,
        "\n\
         >>> Heap Histogram\n\
         | Instance Count | Total Bytes | Class Name       |\n\
         | 1              | 100         | char[]           |\n\
         | 1              | 24          | java.lang.String |\n"
    );
}

#[test]
fn configured_pipeline_prints_histogram_then_memory() {
    let mut host = FakeHost::new();
    let class = host.class("Lcom/acme/Big;");
    let object = host.object(class, 512, &[]);
    host.root(object);
    host.heap = usage(16, 8, 32, 64);
    host.non_heap = usage(2, 4, 6, -1);
    host.pools = vec![PoolUsage { name: "Metaspace".into(), usage: usage(0, 1, 2, -1) }];

    let config = Configuration::parse("printHeapHistogram=1,signal=SIGTERM").unwrap();
    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::from_config(&config, process.clone());

    let out = run(&pipeline, &host, ExhaustionFlags::JAVA_HEAP);

    let histogram = out.find(">>> Heap Histogram").unwrap();
    let pools = out.find(">>> Memory Pools").unwrap();
    assert!(histogram < pools);
    assert!(out.contains("| 1              | 512         | com.acme.Big |"));
    assert!(out.contains("   Metaspace: init 0, used 1, committed 2, max -1\n"));
    assert_eq!(process.signals(), vec![Signal::SIGTERM]);
}

#[test]
fn pool_stats_alone() {
    let mut host = FakeHost::new();
    host.heap = usage(100, 50, 200, 400);
    host.non_heap = usage(1, 2, 3, -1);

    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(PoolStats)
        .build(Kill::new(process, Signal::SIGKILL));

    let out = run(&pipeline, &host, ExhaustionFlags::JAVA_HEAP);

    assert_eq!(
        out,
        "\n\
         >>> Memory Pools\n\
         Memory usage:\n\
         \x20  Heap memory: init 100, used 50, committed 200, max 400\n\
         \x20  Non-heap memory: init 1, used 2, committed 3, max -1\n\
         \n\
         Memory pool usage:\n"
    );
}

#[test]
fn histogram_runs_twice_with_the_same_counts() {
    let mut host = FakeHost::new();
    let class = host.class("Lcom/acme/Leak;");
    let inner = host.object(class, 32, &[]);
    let outer = host.object(class, 32, &[inner]);
    host.root(outer);

    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(HeapHistogram::new(0))
        .build(Kill::new(process.clone(), Signal::SIGUSR1));

    let first = run(&pipeline, &host, ExhaustionFlags::JAVA_HEAP);
    let second = run(&pipeline, &host, ExhaustionFlags::JAVA_HEAP);

    assert!(first.contains("| 2              | 64          | com.acme.Leak |"));
    assert_eq!(first, second);
    assert_eq!(process.signals(), vec![Signal::SIGUSR1, Signal::SIGUSR1]);
}

#[test]
fn thread_dump_signals_quit_before_the_kill() {
    let process = Arc::new(RecordingProcess::default());
    let pipeline = ActionPipeline::builder()
        .then(ThreadDump::new(process.clone(), Duration::ZERO))
        .build(Kill::new(process.clone(), Signal::SIGKILL));

    let out = run(&pipeline, &FakeHost::new(), ExhaustionFlags::JAVA_HEAP);

    assert_eq!(out, "\n>>> Thread Dump\n");
    assert_eq!(process.signals(), vec![Signal::SIGQUIT, Signal::SIGKILL]);
}

#[test]
fn refused_thread_dump_still_kills() {
    let process = Arc::new(RecordingProcess::refusing(Signal::SIGQUIT));
    let pipeline = ActionPipeline::builder()
        .then(ThreadDump::new(process.clone(), Duration::ZERO))
        .then(Say("after"))
        .build(Kill::new(process.clone(), Signal::SIGKILL));

    let out = run(&pipeline, &FakeHost::new(), ExhaustionFlags::JAVA_HEAP);

    assert_eq!(out, "\n>>> Thread Dump\nafter\n");
    assert_eq!(process.signals(), vec![Signal::SIGKILL]);
}

/// Holds writes back until `flush`, like a buffered stdout.
struct Buffered {
    pending: Vec<u8>,
    flushed: Arc<Mutex<Vec<u8>>>,
}

impl Write for Buffered {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushed.lock().unwrap().append(&mut self.pending);
        Ok(())
    }
}

/// Remembers what had reached the terminal when each signal was raised.
struct Snapshots {
    flushed: Arc<Mutex<Vec<u8>>>,
    seen: Mutex<Vec<(Signal, String)>>,
}

impl ProcessControl for Snapshots {
    fn raise(&self, signal: Signal) -> Result<(), Errno> {
        let visible = String::from_utf8(self.flushed.lock().unwrap().clone()).unwrap();
        self.seen.lock().unwrap().push((signal, visible));
        Ok(())
    }
}

#[test]
fn thread_dump_banner_is_flushed_before_quit() {
    let flushed = Arc::new(Mutex::new(Vec::new()));
    let process = Arc::new(Snapshots { flushed: flushed.clone(), seen: Mutex::new(Vec::new()) });
    let pipeline = ActionPipeline::builder()
        .then(ThreadDump::new(process.clone(), Duration::ZERO))
        .build(Kill::new(process.clone(), Signal::SIGKILL));

    let host = FakeHost::new();
    let mut out = Buffered { pending: Vec::new(), flushed };
    let mut ctx = ActionContext::new(ExhaustionFlags::JAVA_HEAP, &host, &mut out);
    pipeline.run_all(&mut ctx);

    let seen = process.seen.lock().unwrap();
    assert_eq!(seen[0], (Signal::SIGQUIT, "\n>>> Thread Dump\n".to_string()));
    assert_eq!(seen[1].0, Signal::SIGKILL);
}
