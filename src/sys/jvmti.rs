// jvmkill/src/sys/jvmti.rs
//
// JVMTI (JVM Tool Interface) bindings used by jvmkill.
//
// Function table slots are numbered from 1 as in jvmti.h, so slot N lives at
// struct index N - 1. Unused slots are opaque padding. The table is declared
// up to AddCapabilities (142).

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::fmt;
use std::os::raw::{c_char, c_uchar, c_void};

use crate::sys::jni::{jclass, jint, jlong, jobject, jthread, JNIEnv};

// --- Constants ---
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

pub const JVMTI_EVENT_RESOURCE_EXHAUSTED: u32 = 80;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

// --- Resource exhaustion flags ---
pub const JVMTI_RESOURCE_EXHAUSTED_OOM_ERROR: jint = 0x0001;
pub const JVMTI_RESOURCE_EXHAUSTED_JAVA_HEAP: jint = 0x0002;
pub const JVMTI_RESOURCE_EXHAUSTED_THREADS: jint = 0x0004;

// --- Heap visit control ---
pub const JVMTI_VISIT_OBJECTS: jint = 0x100;
pub const JVMTI_VISIT_ABORT: jint = 0x8000;

// --- Error Codes ---
//
// A transparent wrapper rather than an enum: the VM may hand back codes this
// file does not list.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: jvmtiError = jvmtiError(0);
    pub const INVALID_OBJECT: jvmtiError = jvmtiError(20);
    pub const INVALID_CLASS: jvmtiError = jvmtiError(21);
    pub const INVALID_EVENT_TYPE: jvmtiError = jvmtiError(102);
    pub const ILLEGAL_ARGUMENT: jvmtiError = jvmtiError(103);
    pub const NOT_AVAILABLE: jvmtiError = jvmtiError(98);
    pub const MUST_POSSESS_CAPABILITY: jvmtiError = jvmtiError(99);
    pub const NULL_POINTER: jvmtiError = jvmtiError(100);
    pub const OUT_OF_MEMORY: jvmtiError = jvmtiError(110);
    pub const ACCESS_DENIED: jvmtiError = jvmtiError(111);
    pub const WRONG_PHASE: jvmtiError = jvmtiError(112);
    pub const INTERNAL: jvmtiError = jvmtiError(113);
    pub const UNATTACHED_THREAD: jvmtiError = jvmtiError(115);
    pub const INVALID_ENVIRONMENT: jvmtiError = jvmtiError(116);

    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::NONE => "JVMTI_ERROR_NONE",
            Self::INVALID_OBJECT => "JVMTI_ERROR_INVALID_OBJECT",
            Self::INVALID_CLASS => "JVMTI_ERROR_INVALID_CLASS",
            Self::INVALID_EVENT_TYPE => "JVMTI_ERROR_INVALID_EVENT_TYPE",
            Self::ILLEGAL_ARGUMENT => "JVMTI_ERROR_ILLEGAL_ARGUMENT",
            Self::NOT_AVAILABLE => "JVMTI_ERROR_NOT_AVAILABLE",
            Self::MUST_POSSESS_CAPABILITY => "JVMTI_ERROR_MUST_POSSESS_CAPABILITY",
            Self::NULL_POINTER => "JVMTI_ERROR_NULL_POINTER",
            Self::OUT_OF_MEMORY => "JVMTI_ERROR_OUT_OF_MEMORY",
            Self::ACCESS_DENIED => "JVMTI_ERROR_ACCESS_DENIED",
            Self::WRONG_PHASE => "JVMTI_ERROR_WRONG_PHASE",
            Self::INTERNAL => "JVMTI_ERROR_INTERNAL",
            Self::UNATTACHED_THREAD => "JVMTI_ERROR_UNATTACHED_THREAD",
            Self::INVALID_ENVIRONMENT => "JVMTI_ERROR_INVALID_ENVIRONMENT",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "JVMTI error {}", self.0),
        }
    }
}

// --- Heap callbacks ---

pub type jvmtiHeapReferenceCallback = unsafe extern "system" fn(
    reference_kind: jint,
    reference_info: *const c_void,
    class_tag: jlong,
    referrer_class_tag: jlong,
    size: jlong,
    tag_ptr: *mut jlong,
    referrer_tag_ptr: *mut jlong,
    length: jint,
    user_data: *mut c_void,
) -> jint;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiHeapCallbacks {
    pub heap_iteration_callback: *mut c_void,
    pub heap_reference_callback: Option<jvmtiHeapReferenceCallback>,
    pub primitive_field_callback: *mut c_void,
    pub array_primitive_value_callback: *mut c_void,
    pub string_primitive_value_callback: *mut c_void,
    pub reserved5: [*mut c_void; 11],
}

impl Default for jvmtiHeapCallbacks {
    fn default() -> Self {
        Self {
            heap_iteration_callback: std::ptr::null_mut(),
            heap_reference_callback: None,
            primitive_field_callback: std::ptr::null_mut(),
            array_primitive_value_callback: std::ptr::null_mut(),
            string_primitive_value_callback: std::ptr::null_mut(),
            reserved5: [std::ptr::null_mut(); 11],
        }
    }
}

// --- Capabilities ---
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl jvmtiCapabilities {
    fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        if value {
            self.bits[word_index] |= 1 << bit_index;
        } else {
            self.bits[word_index] &= !(1 << bit_index);
        }
    }

    fn get_bit(&self, bit_offset: usize) -> bool {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        (self.bits[word_index] & (1 << bit_index)) != 0
    }

    // [0]
    pub fn set_can_tag_objects(&mut self, v: bool) { self.set_bit(0, v); }
    pub fn can_tag_objects(&self) -> bool { self.get_bit(0) }
}

// --- Function table ---

pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mode: jint, event_type: u32, event_thread: jthread) -> jvmtiError;
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;
pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetLoadedClassesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, class_count_ptr: *mut jint, classes_ptr: *mut *mut jclass) -> jvmtiError;
pub type JvmtiSetTagFn = unsafe extern "system" fn(env: *mut jvmtiEnv, object: jobject, tag: jlong) -> jvmtiError;
pub type JvmtiFollowReferencesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, heap_filter: jint, klass: jclass, initial_object: jobject, callbacks: *const jvmtiHeapCallbacks, user_data: *const c_void) -> jvmtiError;
pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(env: *mut jvmtiEnv, callbacks: *const jvmtiEventCallbacks, size_of_callbacks: jint) -> jvmtiError;
pub type JvmtiAddCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError;

type Slot = *mut c_void;

#[repr(C)]
pub struct jvmtiInterface_1_ {
    /*   1: RESERVED */
    pub reserved1: Slot,
    /*   2: Set Event Notification Mode */
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,
    /*   3-46: threads, frames, monitors, raw monitors, Allocate */
    _unused_3: [Slot; 44],
    /*  47: Deallocate */
    pub Deallocate: Option<JvmtiDeallocateFn>,
    /*  48: Get Class Signature */
    pub GetClassSignature: Option<JvmtiGetClassSignatureFn>,
    /*  49-77: class, field and method introspection */
    _unused_49: [Slot; 29],
    /*  78: Get Loaded Classes */
    pub GetLoadedClasses: Option<JvmtiGetLoadedClassesFn>,
    /*  79-106: redefinition, frames, GetTag */
    _unused_79: [Slot; 28],
    /* 107: Set Tag */
    pub SetTag: Option<JvmtiSetTagFn>,
    /* 108-114: GetObjectsWithTags, ForceGarbageCollection, 1.0 heap walks */
    _unused_108: [Slot; 7],
    /* 115: Follow References */
    pub FollowReferences: Option<JvmtiFollowReferencesFn>,
    /* 116-121: IterateThroughHeap, virtual threads, JNI function table */
    _unused_116: [Slot; 6],
    /* 122: Set Event Callbacks */
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,
    /* 123-141: GenerateEvents, extensions, environment, system properties, timers */
    _unused_123: [Slot; 19],
    /* 142: Add Capabilities */
    pub AddCapabilities: Option<JvmtiAddCapabilitiesFn>,
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

// --- Event callbacks ---

pub type JvmtiResourceExhaustedFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    flags: jint,
    reserved: *const c_void,
    description: *const c_char,
);

/// Event callback table, one slot per event number from VMInit (50) to
/// SampledObjectAlloc (86).
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiEventCallbacks {
    /* 50-79 */
    _before_resource_exhausted: [Slot; 30],
    /* 80 */
    pub ResourceExhausted: Option<JvmtiResourceExhaustedFn>,
    /* 81-86 */
    _after_resource_exhausted: [Slot; 6],
}

impl Default for jvmtiEventCallbacks {
    fn default() -> Self {
        Self {
            _before_resource_exhausted: [std::ptr::null_mut(); 30],
            ResourceExhausted: None,
            _after_resource_exhausted: [std::ptr::null_mut(); 6],
        }
    }
}
