// jvmkill/src/jvmti_wrapper.rs
use crate::sys::jni;
use crate::sys::jvmti;
use std::os::raw::c_char;
use std::ptr;

/// A safe wrapper around the raw JVMTI Environment pointer.
pub struct Jvmti {
    env: *mut jvmti::jvmtiEnv,
}

// A jvmtiEnv is valid on every thread of the VM that created it.
unsafe impl Send for Jvmti {}
unsafe impl Sync for Jvmti {}

impl Jvmti {
    /// Connects to the JVM and retrieves the JVMTI environment.
    pub fn new(vm: *mut jni::JavaVM) -> Result<Self, jni::jint> {
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();

        unsafe {
            // vm: *mut JavaVM = *mut *const JNIInvokeInterface_
            let get_env_fn = (**vm).GetEnv;

            let res = get_env_fn(vm, &mut env_ptr, jvmti::JVMTI_VERSION_1_2);

            if res != jni::JNI_OK {
                return Err(res);
            }
        }

        if env_ptr.is_null() {
            return Err(jni::JNI_ERR);
        }

        Ok(Jvmti {
            env: env_ptr as *mut jvmti::jvmtiEnv,
        })
    }

    pub fn add_capabilities(&self, new_caps: &jvmti::jvmtiCapabilities) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let add_caps_fn = (*(*self.env).functions)
                .AddCapabilities
                .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;

            let err = add_caps_fn(self.env, new_caps);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn set_event_callbacks(&self, callbacks: jvmti::jvmtiEventCallbacks) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let set_callbacks_fn = (*(*self.env).functions)
                .SetEventCallbacks
                .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let size = std::mem::size_of::<jvmti::jvmtiEventCallbacks>() as jni::jint;

            let err = set_callbacks_fn(self.env, &callbacks, size);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn set_event_notification_mode(&self, enable: bool, event_type: u32, thread: jni::jthread) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let set_mode_fn = (*(*self.env).functions)
                .SetEventNotificationMode
                .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let mode = if enable { jvmti::JVMTI_ENABLE } else { jvmti::JVMTI_DISABLE };

            // thread can be null (all threads)
            let err = set_mode_fn(self.env, mode, event_type, thread);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        unsafe {
            let deallocate_fn = (*(*self.env).functions)
                .Deallocate
                .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = deallocate_fn(self.env, mem);

            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Returns the class signature in JVM internal form (`Ljava/lang/String;`).
    pub fn get_class_signature(&self, klass: jni::jclass) -> Result<String, jvmti::jvmtiError> {
        let mut sig_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let get_class_sig_fn = (*(*self.env).functions)
                .GetClassSignature
                .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            // The generic signature is not needed, a null out-pointer skips it.
            let err = get_class_sig_fn(self.env, klass, &mut sig_ptr, ptr::null_mut());

            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
            if sig_ptr.is_null() {
                return Err(jvmti::jvmtiError::NULL_POINTER);
            }

            let signature = std::ffi::CStr::from_ptr(sig_ptr).to_string_lossy().into_owned();
            self.deallocate(sig_ptr as *mut u8)?;

            Ok(signature)
        }
    }

    pub fn get_loaded_classes(&self) -> Result<Vec<jni::jclass>, jvmti::jvmtiError> {
        let mut class_count: jni::jint = 0;
        let mut classes_ptr: *mut jni::jclass = ptr::null_mut();

        unsafe {
            let get_loaded_classes_fn = (*(*self.env).functions)
                .GetLoadedClasses
                .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = get_loaded_classes_fn(self.env, &mut class_count, &mut classes_ptr);

            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
            if classes_ptr.is_null() || class_count <= 0 {
                self.deallocate(classes_ptr as *mut u8)?;
                return Ok(Vec::new());
            }

            let classes = std::slice::from_raw_parts(classes_ptr, class_count as usize).to_vec();
            self.deallocate(classes_ptr as *mut u8)?;

            Ok(classes)
        }
    }

    pub fn set_tag(&self, object: jni::jobject, tag: jni::jlong) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let set_fn = (*(*self.env).functions)
                .SetTag
                .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
            let err = set_fn(self.env, object, tag);
            if err != jvmti::jvmtiError::NONE { return Err(err); }
        }
        Ok(())
    }

    /// Walks every object reachable from the heap roots.
    ///
    /// # Safety
    /// `user_data` must be whatever the callbacks in `callbacks` expect, and
    /// must stay valid until this call returns.
    pub unsafe fn follow_references(&self, heap_filter: jni::jint, klass: jni::jclass, initial_object: jni::jobject, callbacks: &jvmti::jvmtiHeapCallbacks, user_data: *const std::os::raw::c_void) -> Result<(), jvmti::jvmtiError> {
        let follow_fn = (*(*self.env).functions)
            .FollowReferences
            .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?;
        let err = follow_fn(self.env, heap_filter, klass, initial_object, callbacks, user_data);
        if err != jvmti::jvmtiError::NONE { return Err(err); }
        Ok(())
    }
}
