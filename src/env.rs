//! High-level environment wrappers for JVMTI and JNI.
//!
//! These wrap the raw environment pointers handed to the agent by the VM and
//! turn vtable calls into `Result`/`Option` returns. Allocations made by the
//! VM on the agent's behalf (class lists, signatures) are copied into Rust
//! types and released before the wrapper returns.
//!
//! # JVMTI Environment
//!
//! [`Jvmti`] covers what jvmkill asks of JVMTI:
//!
//! - **Capabilities**: `can_tag_objects` for the heap histogram
//! - **Events**: installing the ResourceExhausted callback and enabling it
//! - **Heap**: loaded classes, class signatures, tagging, FollowReferences
//!
//! # JNI Environment
//!
//! [`JniEnv`] covers the JNI calls that drive `java.lang.management` from the
//! exhausted thread, and [`LocalRef`] deletes each local reference on drop.
//!
//! ```rust,ignore
//! use jvmkill::env::{JniEnv, LocalRef};
//!
//! fn list_class(jni: &JniEnv) {
//!     let class = LocalRef::new(jni, jni.find_class("java/util/List").unwrap());
//!     let size = jni.get_method_id(class.get(), "size", "()I");
//!     // class is deleted here
//! }
//! ```

pub use crate::jni_wrapper::{JniEnv, LocalRef};
pub use crate::jvmti_wrapper::Jvmti;
