//! What the agent needs from its host, expressed as narrow capabilities.
//!
//! The decision and reporting code only ever talks to these traits. The
//! [`jvm`](crate::jvm) module implements them on top of JVMTI and JNI, and the
//! tests implement them in memory.

use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd;

use crate::error::HostError;
use crate::sys::jni::{jclass, jint};
use crate::sys::jvmti::{
    JVMTI_RESOURCE_EXHAUSTED_JAVA_HEAP, JVMTI_RESOURCE_EXHAUSTED_OOM_ERROR,
    JVMTI_RESOURCE_EXHAUSTED_THREADS,
};

/// The `flags` bitmask delivered with a ResourceExhausted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExhaustionFlags(jint);

impl ExhaustionFlags {
    pub const OOM_ERROR: ExhaustionFlags = ExhaustionFlags(JVMTI_RESOURCE_EXHAUSTED_OOM_ERROR);
    pub const JAVA_HEAP: ExhaustionFlags = ExhaustionFlags(JVMTI_RESOURCE_EXHAUSTED_JAVA_HEAP);
    pub const THREADS: ExhaustionFlags = ExhaustionFlags(JVMTI_RESOURCE_EXHAUSTED_THREADS);

    pub fn from_bits(bits: jint) -> Self {
        ExhaustionFlags(bits)
    }

    pub fn bits(&self) -> jint {
        self.0
    }

    pub fn contains(&self, other: ExhaustionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The VM is about to throw `OutOfMemoryError`.
    pub fn is_oom_error(&self) -> bool {
        self.contains(Self::OOM_ERROR)
    }

    pub fn is_java_heap(&self) -> bool {
        self.contains(Self::JAVA_HEAP)
    }

    /// The VM failed to create a thread. Management queries spawn threads
    /// of their own, so actions that need them must stand down.
    pub fn is_threads(&self) -> bool {
        self.contains(Self::THREADS)
    }
}

impl std::ops::BitOr for ExhaustionFlags {
    type Output = ExhaustionFlags;

    fn bitor(self, rhs: Self) -> Self {
        ExhaustionFlags(self.0 | rhs.0)
    }
}

/// An object handed to a heap walk visitor.
#[derive(Debug)]
pub struct ReachedObject<'a> {
    /// Tag of the object's class, including any marker bits set by the walk.
    pub class_tag: i64,
    /// Shallow size in bytes.
    pub size: i64,
    /// The object's own tag slot.
    pub tag: &'a mut i64,
}

/// What a heap walk visitor wants done with the referents of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Prune,
}

/// Object graph access. Class handles are JNI references valid for the
/// duration of the callback that produced them.
pub trait HeapWalker {
    fn loaded_classes(&self) -> Result<Vec<jclass>, HostError>;

    /// Signature in JVM internal form, e.g. `Ljava/lang/String;` or `[I`.
    fn class_signature(&self, class: jclass) -> Result<String, HostError>;

    fn set_class_tag(&self, class: jclass, tag: i64) -> Result<(), HostError>;

    /// Visits every object reachable from the heap roots, once per reference.
    fn follow_references(
        &self,
        visitor: &mut dyn FnMut(ReachedObject<'_>) -> Visit,
    ) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    pub init: i64,
    pub used: i64,
    pub committed: i64,
    /// -1 when undefined.
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolUsage {
    pub name: String,
    pub usage: MemoryUsage,
}

/// Read-only memory statistics, as reported by `java.lang.management`.
pub trait RuntimeTelemetry {
    fn heap_memory_usage(&self) -> Result<MemoryUsage, HostError>;
    fn non_heap_memory_usage(&self) -> Result<MemoryUsage, HostError>;
    fn memory_pools(&self) -> Result<Vec<PoolUsage>, HostError>;
}

pub trait HeapDumper {
    /// Writes an hprof dump of live objects to `path`.
    fn dump_heap(&self, path: &Path) -> Result<(), HostError>;
}

/// Signals the agent's own process.
pub trait ProcessControl: Send + Sync {
    fn raise(&self, signal: Signal) -> Result<(), Errno>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentProcess;

impl ProcessControl for CurrentProcess {
    fn raise(&self, signal: Signal) -> Result<(), Errno> {
        signal::kill(unistd::getpid(), signal)
    }
}
