use std::ffi::CStr;
use std::io;
use std::os::raw::c_char;
use std::ptr;
use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info};

use super::{JvmtiHeap, Management};
use crate::action::ActionContext;
use crate::config::Configuration;
use crate::controller::Controller;
use crate::env::{JniEnv, Jvmti};
use crate::error::{AgentError, HostError};
use crate::host::{CurrentProcess, ExhaustionFlags};
use crate::logging;
use crate::sys::jni::{self, jint, JNI_ERR, JNI_OK};
use crate::sys::jvmti::{jvmtiCapabilities, JVMTI_EVENT_RESOURCE_EXHAUSTED};
use crate::Agent;

struct Armed {
    jvmti: Jvmti,
    controller: Controller,
}

/// The agent `libjvmkill` exports.
#[derive(Default)]
pub struct JvmKill {
    armed: OnceLock<Armed>,
}

impl JvmKill {
    fn arm(&self, vm: *mut jni::JavaVM, options: &str) -> Result<(), AgentError> {
        if self.armed.get().is_some() {
            return Err(AgentError::AlreadyArmed);
        }

        let config = Configuration::parse(options)?;
        debug!(?config, "parsed options");

        let jvmti = Jvmti::new(vm).map_err(AgentError::Env)?;
        if config.print_heap_histogram {
            let mut caps = jvmtiCapabilities::default();
            caps.set_can_tag_objects(true);
            jvmti
                .add_capabilities(&caps)
                .map_err(|error| HostError::Jvmti { operation: "AddCapabilities", error })?;
        }
        jvmti
            .set_event_callbacks(crate::get_default_callbacks())
            .map_err(|error| HostError::Jvmti { operation: "SetEventCallbacks", error })?;

        let controller = Controller::arm(&config, Arc::new(CurrentProcess));
        self.armed
            .set(Armed { jvmti, controller })
            .map_err(|_| AgentError::AlreadyArmed)?;

        let armed = self.armed.get().ok_or(AgentError::AlreadyArmed)?;
        armed
            .jvmti
            .set_event_notification_mode(true, JVMTI_EVENT_RESOURCE_EXHAUSTED, ptr::null_mut())
            .map_err(|error| HostError::Jvmti { operation: "SetEventNotificationMode", error })?;

        info!(
            "jvmkill armed: time={}s count={} signal={}",
            config.time_threshold,
            config.count_threshold,
            config.signal.as_str()
        );
        Ok(())
    }
}

impl Agent for JvmKill {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jint {
        logging::init();

        match self.arm(vm, options) {
            Ok(()) => JNI_OK,
            Err(e) => {
                error!("jvmkill failed to load: {}", e);
                JNI_ERR
            }
        }
    }

    fn resource_exhausted(&self, jni: *mut jni::JNIEnv, flags: jint, description: *const c_char) {
        let Some(armed) = self.armed.get() else {
            return;
        };
        if !description.is_null() {
            // SAFETY: the VM passes a NUL-terminated modified UTF-8 string.
            let description = unsafe { CStr::from_ptr(description) };
            debug!(description = %description.to_string_lossy(), flags, "ResourceExhausted");
        }

        // SAFETY: the pointer is the current thread's JNIEnv, handed to us
        // by the event callback.
        let env = unsafe { JniEnv::from_raw(jni) };
        let heap = JvmtiHeap::new(&armed.jvmti);
        let management = Management::new(&env);
        let mut out = io::stdout();

        let mut ctx = ActionContext {
            flags: ExhaustionFlags::from_bits(flags),
            heap: &heap,
            runtime: &management,
            dumper: &management,
            out: &mut out,
        };
        armed.controller.on_host_notification(&mut ctx);
    }
}
