//! Safe wrapper around the JNI environment.
//!
//! The agent only needs enough JNI to drive `java.lang.management` from the
//! thread that raised the resource exhaustion event: class and method lookup,
//! a handful of `Call*MethodA` shapes, strings and local references.
//!
//! # Example
//!
//! ```rust,ignore
//! use jvmkill::env::{JniEnv, LocalRef};
//!
//! fn memory_bean(env: &JniEnv) -> Option<jni::jobject> {
//!     let factory = LocalRef::new(env, env.find_class("java/lang/management/ManagementFactory")?);
//!     let mid = env.get_static_method_id(factory.get(), "getMemoryMXBean", "()Ljava/lang/management/MemoryMXBean;")?;
//!     let bean = env.call_static_object_method(factory.get(), mid, &[]);
//!     if env.take_exception() { None } else { Some(bean) }
//! }
//! ```

use crate::sys::jni;
use std::ffi::{CStr, CString};
use std::ptr;

/// Safe wrapper around a JNI environment pointer.
///
/// # Thread Safety
///
/// A `JniEnv` is tied to a specific thread and cannot be sent across threads.
/// Each JVM thread has its own JNI environment.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Creates a JniEnv wrapper from a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure the pointer is valid and comes from the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    // =========================================================================
    // Classes and Methods
    // =========================================================================

    /// Finds a class by its fully qualified name.
    ///
    /// The name should use '/' as package separator (e.g., "java/lang/String").
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).FindClass)(self.env, c_name.as_ptr());
            if cls.is_null() { None } else { Some(cls) }
        }
    }

    /// Gets the method ID for an instance method.
    pub fn get_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() { None } else { Some(mid) }
        }
    }

    /// Gets the method ID for a static method.
    pub fn get_static_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetStaticMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() { None } else { Some(mid) }
        }
    }

    // =========================================================================
    // Exceptions
    // =========================================================================

    /// Checks if an exception is pending.
    pub fn exception_check(&self) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionCheck)(self.env) != jni::JNI_FALSE
        }
    }

    /// Clears any pending exception.
    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env);
        }
    }

    /// Prints the pending exception and stack trace to stderr.
    pub fn exception_describe(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionDescribe)(self.env);
        }
    }

    /// Describes and clears a pending exception. Returns whether there was one.
    ///
    /// A lookup that failed with a pending exception (NoClassDefFoundError,
    /// NoSuchMethodError) must be cleared before any further JNI call.
    pub fn take_exception(&self) -> bool {
        if !self.exception_check() {
            return false;
        }
        self.exception_describe();
        self.exception_clear();
        true
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// Creates a new Java string from a Rust string.
    pub fn new_string_utf(&self, s: &str) -> Option<jni::jstring> {
        let c_str = CString::new(s).ok()?;
        unsafe {
            let vtable = *self.env;
            let jstr = ((*vtable).NewStringUTF)(self.env, c_str.as_ptr());
            if jstr.is_null() { None } else { Some(jstr) }
        }
    }

    /// Gets a Rust string from a Java string.
    ///
    /// Returns `None` if the string is null. Modified UTF-8 that is not valid
    /// UTF-8 is converted lossily.
    pub fn get_string_utf(&self, s: jni::jstring) -> Option<String> {
        if s.is_null() {
            return None;
        }
        unsafe {
            let vtable = *self.env;
            let chars = ((*vtable).GetStringUTFChars)(self.env, s, ptr::null_mut());
            if chars.is_null() {
                return None;
            }
            let result = CStr::from_ptr(chars).to_string_lossy().into_owned();
            ((*vtable).ReleaseStringUTFChars)(self.env, s, chars);
            Some(result)
        }
    }

    // =========================================================================
    // Method Calls
    // =========================================================================

    /// Calls a void instance method.
    pub fn call_void_method(&self, obj: jni::jobject, method_id: jni::jmethodID, args: &[jni::jvalue]) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).CallVoidMethodA)(self.env, obj, method_id, args.as_ptr());
        }
    }

    /// Calls an int instance method.
    pub fn call_int_method(&self, obj: jni::jobject, method_id: jni::jmethodID, args: &[jni::jvalue]) -> jni::jint {
        unsafe {
            let vtable = *self.env;
            ((*vtable).CallIntMethodA)(self.env, obj, method_id, args.as_ptr())
        }
    }

    /// Calls a long instance method.
    pub fn call_long_method(&self, obj: jni::jobject, method_id: jni::jmethodID, args: &[jni::jvalue]) -> jni::jlong {
        unsafe {
            let vtable = *self.env;
            ((*vtable).CallLongMethodA)(self.env, obj, method_id, args.as_ptr())
        }
    }

    /// Calls an object instance method.
    pub fn call_object_method(&self, obj: jni::jobject, method_id: jni::jmethodID, args: &[jni::jvalue]) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).CallObjectMethodA)(self.env, obj, method_id, args.as_ptr())
        }
    }

    /// Calls an object static method.
    pub fn call_static_object_method(&self, cls: jni::jclass, method_id: jni::jmethodID, args: &[jni::jvalue]) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).CallStaticObjectMethodA)(self.env, cls, method_id, args.as_ptr())
        }
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Deletes a local reference.
    pub fn delete_local_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj);
        }
    }
}

/// A guard that automatically deletes a local reference when dropped.
///
/// The agent runs inside a single native callback, so without this every
/// `MemoryUsage` and pool bean would pile up in the callback's local frame.
pub struct LocalRef<'a> {
    env: &'a JniEnv,
    obj: jni::jobject,
}

impl<'a> LocalRef<'a> {
    /// Creates a new LocalRef guard.
    pub fn new(env: &'a JniEnv, obj: jni::jobject) -> Self {
        LocalRef { env, obj }
    }

    /// Returns the underlying jobject.
    pub fn get(&self) -> jni::jobject {
        self.obj
    }
}

impl<'a> Drop for LocalRef<'a> {
    fn drop(&mut self) {
        if !self.obj.is_null() {
            self.env.delete_local_ref(self.obj);
        }
    }
}
