//! [`HeapWalker`] over JVMTI tagging and `FollowReferences`.

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use crate::env::Jvmti;
use crate::error::HostError;
use crate::host::{HeapWalker, ReachedObject, Visit};
use crate::sys::jni::{jclass, jint, jlong};
use crate::sys::jvmti::{jvmtiHeapCallbacks, JVMTI_VISIT_ABORT, JVMTI_VISIT_OBJECTS};

/// Needs an environment holding `can_tag_objects`.
pub struct JvmtiHeap<'a> {
    jvmti: &'a Jvmti,
}

impl<'a> JvmtiHeap<'a> {
    pub fn new(jvmti: &'a Jvmti) -> Self {
        Self { jvmti }
    }
}

impl HeapWalker for JvmtiHeap<'_> {
    fn loaded_classes(&self) -> Result<Vec<jclass>, HostError> {
        self.jvmti
            .get_loaded_classes()
            .map_err(|error| HostError::Jvmti { operation: "GetLoadedClasses", error })
    }

    fn class_signature(&self, class: jclass) -> Result<String, HostError> {
        self.jvmti
            .get_class_signature(class)
            .map_err(|error| HostError::Jvmti { operation: "GetClassSignature", error })
    }

    fn set_class_tag(&self, class: jclass, tag: i64) -> Result<(), HostError> {
        self.jvmti
            .set_tag(class, tag)
            .map_err(|error| HostError::Jvmti { operation: "SetTag", error })
    }

    fn follow_references(
        &self,
        visitor: &mut dyn FnMut(ReachedObject<'_>) -> Visit,
    ) -> Result<(), HostError> {
        let mut walk = Walk { visitor, panic: None };
        let callbacks = jvmtiHeapCallbacks {
            heap_reference_callback: Some(heap_reference),
            ..jvmtiHeapCallbacks::default()
        };

        // SAFETY: `walk` outlives the call, and `heap_reference` is the only
        // callback that reads `user_data`.
        let result = unsafe {
            self.jvmti.follow_references(
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                &callbacks,
                &mut walk as *mut Walk<'_> as *const c_void,
            )
        };

        if let Some(message) = walk.panic {
            return Err(HostError::WalkAborted(message));
        }
        result.map_err(|error| HostError::Jvmti { operation: "FollowReferences", error })
    }
}

struct Walk<'v> {
    visitor: &'v mut dyn FnMut(ReachedObject<'_>) -> Visit,
    panic: Option<String>,
}

unsafe extern "system" fn heap_reference(
    _reference_kind: jint,
    _reference_info: *const c_void,
    class_tag: jlong,
    _referrer_class_tag: jlong,
    size: jlong,
    tag_ptr: *mut jlong,
    _referrer_tag_ptr: *mut jlong,
    _length: jint,
    user_data: *mut c_void,
) -> jint {
    if user_data.is_null() || tag_ptr.is_null() {
        return JVMTI_VISIT_OBJECTS;
    }
    let walk = &mut *(user_data as *mut Walk<'_>);
    if walk.panic.is_some() {
        return JVMTI_VISIT_ABORT;
    }

    let object = ReachedObject { class_tag, size, tag: &mut *tag_ptr };
    match panic::catch_unwind(AssertUnwindSafe(|| (walk.visitor)(object))) {
        Ok(Visit::Descend) => JVMTI_VISIT_OBJECTS,
        Ok(Visit::Prune) => 0,
        Err(_) => {
            walk.panic = Some("heap visitor panicked".to_string());
            JVMTI_VISIT_ABORT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reach(walk: &mut Walk<'_>, class_tag: jlong, tag: &mut jlong) -> jint {
        unsafe {
            heap_reference(
                0,
                ptr::null(),
                class_tag,
                0,
                16,
                tag,
                ptr::null_mut(),
                -1,
                walk as *mut Walk<'_> as *mut c_void,
            )
        }
    }

    #[test]
    fn visit_result_maps_to_jvmti_flags() {
        let mut seen = Vec::new();
        let mut visitor = |o: ReachedObject<'_>| {
            seen.push((o.class_tag, o.size));
            if *o.tag == 0 {
                *o.tag = 1;
                Visit::Descend
            } else {
                Visit::Prune
            }
        };
        let mut walk = Walk { visitor: &mut visitor, panic: None };

        let mut tag = 0;
        assert_eq!(reach(&mut walk, 7, &mut tag), JVMTI_VISIT_OBJECTS);
        assert_eq!(tag, 1);
        assert_eq!(reach(&mut walk, 7, &mut tag), 0);
        drop(walk);

        assert_eq!(seen, vec![(7, 16), (7, 16)]);
    }

    #[test]
    fn panicking_visitor_aborts_the_walk() {
        let mut visitor = |_: ReachedObject<'_>| -> Visit { panic!("boom") };
        let mut walk = Walk { visitor: &mut visitor, panic: None };

        let mut tag = 0;
        assert_eq!(reach(&mut walk, 1, &mut tag), JVMTI_VISIT_ABORT);
        assert!(walk.panic.is_some());
        assert_eq!(reach(&mut walk, 1, &mut tag), JVMTI_VISIT_ABORT);
    }
}
