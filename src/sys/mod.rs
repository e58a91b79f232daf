//! Raw FFI bindings to the parts of JNI and JVMTI the agent touches.
//!
//! Only the vtable slots jvmkill calls are typed. Every other slot is kept as
//! opaque padding so field offsets match `jni.h` and `jvmti.h` exactly.

pub mod jni;
pub mod jvmti;
