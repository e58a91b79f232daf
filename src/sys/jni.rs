// jvmkill/src/sys/jni.rs
//
// JNI (Java Native Interface) bindings used by jvmkill.
//
// The function table is declared up to ExceptionCheck (index 228). Slots the
// agent never calls are opaque `*mut c_void` padding so that every typed
// slot sits at the same offset as in jni.h. Newer JDKs only append to the
// table, so a prefix declaration stays valid.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::c_char;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;
pub type jsize = jint;

// =============================================================================
// Reference Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jstring = jobject;
pub type jthread = jobject;
pub type jthrowable = jobject;

pub type jmethodID = *mut c_void;

#[repr(C)]
#[derive(Copy, Clone)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

// =============================================================================
// Constants
// =============================================================================

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;

pub const JNI_TRUE: jboolean = 1;
pub const JNI_FALSE: jboolean = 0;

type Slot = *mut c_void;

// =============================================================================
// JNINativeInterface_ - the per-thread function table
// =============================================================================

#[repr(C)]
pub struct JNINativeInterface_ {
    // Reserved slots (0-3)
    pub reserved0: Slot,
    pub reserved1: Slot,
    pub reserved2: Slot,
    pub reserved3: Slot,

    // 4: GetVersion
    pub GetVersion: unsafe extern "system" fn(env: *mut JNIEnv) -> jint,
    // 5: DefineClass
    _unused_5: Slot,
    // 6: FindClass
    pub FindClass: unsafe extern "system" fn(env: *mut JNIEnv, name: *const c_char) -> jclass,
    // 7-14: reflection, Throw, ThrowNew
    _unused_7: [Slot; 8],

    // 15-17: exception state
    pub ExceptionOccurred: unsafe extern "system" fn(env: *mut JNIEnv) -> jthrowable,
    pub ExceptionDescribe: unsafe extern "system" fn(env: *mut JNIEnv),
    pub ExceptionClear: unsafe extern "system" fn(env: *mut JNIEnv),
    // 18-22: FatalError, local frames, global refs
    _unused_18: [Slot; 5],

    // 23: DeleteLocalRef
    pub DeleteLocalRef: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject),
    // 24-32: object creation, GetObjectClass, IsInstanceOf
    _unused_24: [Slot; 9],

    // 33: GetMethodID
    pub GetMethodID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jmethodID,
    // 34-35: CallObjectMethod, CallObjectMethodV
    _unused_34: [Slot; 2],
    // 36: CallObjectMethodA
    pub CallObjectMethodA: unsafe extern "system" fn(
        env: *mut JNIEnv,
        obj: jobject,
        method_id: jmethodID,
        args: *const jvalue,
    ) -> jobject,
    // 37-50: Boolean/Byte/Char/Short, CallIntMethod, CallIntMethodV
    _unused_37: [Slot; 14],
    // 51: CallIntMethodA
    pub CallIntMethodA: unsafe extern "system" fn(
        env: *mut JNIEnv,
        obj: jobject,
        method_id: jmethodID,
        args: *const jvalue,
    ) -> jint,
    // 52-53: CallLongMethod, CallLongMethodV
    _unused_52: [Slot; 2],
    // 54: CallLongMethodA
    pub CallLongMethodA: unsafe extern "system" fn(
        env: *mut JNIEnv,
        obj: jobject,
        method_id: jmethodID,
        args: *const jvalue,
    ) -> jlong,
    // 55-62: Float/Double, CallVoidMethod, CallVoidMethodV
    _unused_55: [Slot; 8],
    // 63: CallVoidMethodA
    pub CallVoidMethodA: unsafe extern "system" fn(
        env: *mut JNIEnv,
        obj: jobject,
        method_id: jmethodID,
        args: *const jvalue,
    ),
    // 64-112: non-virtual calls, field access
    _unused_64: [Slot; 49],

    // 113: GetStaticMethodID
    pub GetStaticMethodID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jmethodID,
    // 114-115: CallStaticObjectMethod, CallStaticObjectMethodV
    _unused_114: [Slot; 2],
    // 116: CallStaticObjectMethodA
    pub CallStaticObjectMethodA: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        method_id: jmethodID,
        args: *const jvalue,
    ) -> jobject,
    // 117-166: remaining static calls, static fields, UTF-16 strings
    _unused_117: [Slot; 50],

    // 167: NewStringUTF
    pub NewStringUTF: unsafe extern "system" fn(env: *mut JNIEnv, utf: *const c_char) -> jstring,
    // 168: GetStringUTFLength
    _unused_168: Slot,
    // 169-170: modified UTF-8 access
    pub GetStringUTFChars: unsafe extern "system" fn(
        env: *mut JNIEnv,
        string: jstring,
        is_copy: *mut jboolean,
    ) -> *const c_char,
    pub ReleaseStringUTFChars: unsafe extern "system" fn(env: *mut JNIEnv, string: jstring, utf: *const c_char),
    // 171-227: arrays, natives, monitors, critical regions, weak refs
    _unused_171: [Slot; 57],

    // 228: ExceptionCheck
    pub ExceptionCheck: unsafe extern "system" fn(env: *mut JNIEnv) -> jboolean,
}

/// JNIEnv is directly the vtable pointer (C ABI definition)
pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - JavaVM function table
// =============================================================================

#[repr(C)]
pub struct JNIInvokeInterface_ {
    pub reserved0: Slot,
    pub reserved1: Slot,
    pub reserved2: Slot,

    pub DestroyJavaVM: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub AttachCurrentThread:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
    pub DetachCurrentThread: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub GetEnv:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint,
    pub AttachCurrentThreadAsDaemon:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
}

/// JavaVM is directly the vtable pointer (C ABI definition)
pub type JavaVM = *const JNIInvokeInterface_;

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    fn slot(index: usize) -> usize {
        index * size_of::<*mut c_void>()
    }

    #[test]
    fn native_interface_offsets_match_jni_h() {
        assert_eq!(offset_of!(JNINativeInterface_, GetVersion), slot(4));
        assert_eq!(offset_of!(JNINativeInterface_, FindClass), slot(6));
        assert_eq!(offset_of!(JNINativeInterface_, ExceptionOccurred), slot(15));
        assert_eq!(offset_of!(JNINativeInterface_, ExceptionClear), slot(17));
        assert_eq!(offset_of!(JNINativeInterface_, DeleteLocalRef), slot(23));
        assert_eq!(offset_of!(JNINativeInterface_, GetMethodID), slot(33));
        assert_eq!(offset_of!(JNINativeInterface_, CallObjectMethodA), slot(36));
        assert_eq!(offset_of!(JNINativeInterface_, CallIntMethodA), slot(51));
        assert_eq!(offset_of!(JNINativeInterface_, CallLongMethodA), slot(54));
        assert_eq!(offset_of!(JNINativeInterface_, CallVoidMethodA), slot(63));
        assert_eq!(offset_of!(JNINativeInterface_, GetStaticMethodID), slot(113));
        assert_eq!(offset_of!(JNINativeInterface_, CallStaticObjectMethodA), slot(116));
        assert_eq!(offset_of!(JNINativeInterface_, NewStringUTF), slot(167));
        assert_eq!(offset_of!(JNINativeInterface_, GetStringUTFChars), slot(169));
        assert_eq!(offset_of!(JNINativeInterface_, ReleaseStringUTFChars), slot(170));
        assert_eq!(offset_of!(JNINativeInterface_, ExceptionCheck), slot(228));
    }

    #[test]
    fn invoke_interface_offsets_match_jni_h() {
        assert_eq!(offset_of!(JNIInvokeInterface_, DestroyJavaVM), slot(3));
        assert_eq!(offset_of!(JNIInvokeInterface_, GetEnv), slot(6));
    }

    #[test]
    fn jvalue_is_eight_bytes() {
        assert_eq!(size_of::<jvalue>(), 8);
    }
}
