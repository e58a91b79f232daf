//! # jvmkill
//!
//! A JVMTI agent that kills the JVM when it runs out of resources.
//!
//! A JVM that keeps throwing `OutOfMemoryError` is usually still alive but
//! useless. Loaded with `-agentpath`, this agent listens for
//! `ResourceExhausted` events, and once more than `count` of them arrive
//! within `time` seconds it prints diagnostics and signals the process.
//!
//! ```bash
//! java -agentpath:/path/to/libjvmkill.so=time=10,count=2,printHeapHistogram=1 MyApp
//! ```
//!
//! Options are described in [`config`]. Diagnostics go to stderr through
//! `tracing`, filtered by the `JVMKILL_LOG` environment variable. Reports
//! (histogram, memory usage) go to stdout.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Agent_OnLoad / ResourceExhausted (FFI)          │
//! │     export_agent!, Agent, get_default_callbacks()        │
//! ├─────────────────────────────────────────────────────────┤
//! │                    jvm::JvmKill                          │
//! │   parses options, arms the Controller, wraps JNIEnv      │
//! ├─────────────────────────────────────────────────────────┤
//! │          controller  ->  threshold  ->  action           │
//! │   one lock around "should we fire?" and the pipeline     │
//! ├─────────────────────────────────────────────────────────┤
//! │                host capability traits                    │
//! │   HeapWalker, RuntimeTelemetry, HeapDumper, Process...   │
//! ├─────────────────────────────────────────────────────────┤
//! │    jvm::{JvmtiHeap, Management} over env / sys FFI       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Option string parsing |
//! | [`threshold`] | The time-window heuristic |
//! | [`heap`] | Class tagging, heap walk, histogram table |
//! | [`action`] | Histogram, memory pools, thread dump, heap dump, kill |
//! | [`controller`] | Serialises events and runs the pipeline |
//! | [`host`] | Capability traits the core is written against |
//! | [`jvm`] | JVMTI/JNI implementations of those traits |
//! | [`sys::jni`], [`sys::jvmti`] | Raw FFI, only the slots the agent uses |
//! | [`env`] | `Jvmti` and `JniEnv` wrappers |

pub mod sys;
pub mod env;

// Implementation modules (use `env` module for the public API)
#[doc(hidden)]
pub mod jvmti_wrapper;
#[doc(hidden)]
pub mod jni_wrapper;

pub mod action;
pub mod config;
pub mod controller;
pub mod error;
pub mod heap;
pub mod host;
pub mod jvm;
pub mod logging;
pub mod threshold;

pub use crate::sys::jni as jni;
pub use crate::sys::jvmti as jvmti;

use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

/// An agent loaded into the JVM through [`export_agent!`].
///
/// Methods may be called from any JVM thread, concurrently.
pub trait Agent: Sync + Send {
    /// Called from `Agent_OnLoad`. Return [`jni::JNI_ERR`] to abort VM startup.
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint;

    fn on_unload(&self) {}

    /// Called on the thread that ran out of heap, threads or some other
    /// resource. `flags` is the `JVMTI_RESOURCE_EXHAUSTED_*` bitmask.
    fn resource_exhausted(&self, _jni: *mut jni::JNIEnv, _flags: jni::jint, _description: *const c_char) {}
}

// This holds the Agent instance so the static C functions can find it.
pub static GLOBAL_AGENT: OnceLock<Box<dyn Agent>> = OnceLock::new();

/// Helper to initialize the global agent (called by the macro)
pub fn set_global_agent(agent: Box<dyn Agent>) -> Result<(), ()> {
    GLOBAL_AGENT.set(agent).map_err(|_| ())
}

unsafe extern "system" fn trampoline_resource_exhausted(
    _env: *mut jvmti::jvmtiEnv,
    jni: *mut jni::JNIEnv,
    flags: jni::jint,
    _reserved: *const std::os::raw::c_void,
    description: *const c_char,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        // Unwinding into the VM is undefined behaviour.
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            agent.resource_exhausted(jni, flags, description)
        }));
    }
}

/// Event callbacks routed to [`GLOBAL_AGENT`]. Only `ResourceExhausted` is
/// wired, every other slot is left empty.
pub fn get_default_callbacks() -> jvmti::jvmtiEventCallbacks {
    let mut callbacks = jvmti::jvmtiEventCallbacks::default();
    callbacks.ResourceExhausted = Some(trampoline_resource_exhausted);
    callbacks
}

/// Exports an agent type as a loadable JVMTI agent library.
///
/// Generates `Agent_OnLoad` and `Agent_OnUnload`. The type must implement
/// [`Agent`] and [`Default`]; one instance is created per VM and stored in
/// [`GLOBAL_AGENT`].
///
/// ```rust,ignore
/// export_agent!(jvmkill::jvm::JvmKill);
/// ```
#[macro_export]
macro_rules! export_agent {
    ($agent_type:ty) => {
        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnLoad(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let loaded = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let agent = Box::new(<$agent_type>::default());
                if $crate::set_global_agent(agent).is_err() {
                    return $crate::sys::jni::JNI_ERR;
                }

                let options_str = if options.is_null() {
                    std::borrow::Cow::Borrowed("")
                } else {
                    std::ffi::CStr::from_ptr(options).to_string_lossy()
                };

                match $crate::GLOBAL_AGENT.get() {
                    Some(global_agent) => global_agent.on_load(vm, &options_str),
                    None => $crate::sys::jni::JNI_ERR,
                }
            }));
            loaded.unwrap_or($crate::sys::jni::JNI_ERR)
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut $crate::sys::jni::JavaVM) {
            if let Some(agent) = $crate::GLOBAL_AGENT.get() {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| agent.on_unload()));
            }
        }
    };
}

export_agent!(jvm::JvmKill);
