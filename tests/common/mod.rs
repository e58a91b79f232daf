#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use jvmkill::error::HostError;
use jvmkill::host::{
    HeapDumper, HeapWalker, MemoryUsage, PoolUsage, ProcessControl, ReachedObject,
    RuntimeTelemetry, Visit,
};
use jvmkill::sys::jni::jclass;
use nix::errno::Errno;
use nix::sys::signal::Signal;

pub struct FakeObject {
    pub class: usize,
    pub size: i64,
    pub refs: Vec<usize>,
}

/// An in-memory VM: a set of classes, an object graph reachable from
/// `roots`, memory statistics and a heap dumper that writes a stub file.
#[derive(Default)]
pub struct FakeHost {
    pub classes: Vec<String>,
    pub objects: Vec<FakeObject>,
    pub roots: Vec<usize>,
    pub heap: MemoryUsage,
    pub non_heap: MemoryUsage,
    pub pools: Vec<PoolUsage>,
    pub fail: Option<&'static str>,

    class_tags: RefCell<HashMap<usize, i64>>,
    object_tags: RefCell<Vec<i64>>,
    pub callbacks: RefCell<usize>,
    pub telemetry_queries: RefCell<usize>,
    pub dumps: RefCell<Vec<PathBuf>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(&mut self, signature: &str) -> usize {
        self.classes.push(signature.to_string());
        self.classes.len() - 1
    }

    pub fn object(&mut self, class: usize, size: i64, refs: &[usize]) -> usize {
        self.objects.push(FakeObject { class, size, refs: refs.to_vec() });
        self.objects.len() - 1
    }

    pub fn root(&mut self, object: usize) {
        self.roots.push(object);
    }

    pub fn failing(mut self, operation: &'static str) -> Self {
        self.fail = Some(operation);
        self
    }

    fn check(&self, operation: &'static str) -> Result<(), HostError> {
        if self.fail == Some(operation) {
            Err(HostError::Unavailable(format!("{} failed on purpose", operation)))
        } else {
            Ok(())
        }
    }

    fn query(&self, operation: &'static str) -> Result<(), HostError> {
        *self.telemetry_queries.borrow_mut() += 1;
        self.check(operation)
    }

    fn handle(class: usize) -> jclass {
        (class + 1) as jclass
    }

    fn index(handle: jclass) -> usize {
        handle as usize - 1
    }
}

impl HeapWalker for FakeHost {
    fn loaded_classes(&self) -> Result<Vec<jclass>, HostError> {
        self.check("loaded_classes")?;
        Ok((0..self.classes.len()).map(Self::handle).collect())
    }

    fn class_signature(&self, class: jclass) -> Result<String, HostError> {
        self.check("class_signature")?;
        Ok(self.classes[Self::index(class)].clone())
    }

    fn set_class_tag(&self, class: jclass, tag: i64) -> Result<(), HostError> {
        self.check("set_class_tag")?;
        self.class_tags.borrow_mut().insert(Self::index(class), tag);
        Ok(())
    }

    /// Reports every reference, like JVMTI does, and only follows the
    /// referents of objects the visitor asks to descend into.
    fn follow_references(
        &self,
        visitor: &mut dyn FnMut(ReachedObject<'_>) -> Visit,
    ) -> Result<(), HostError> {
        self.check("follow_references")?;

        let mut object_tags = self.object_tags.borrow_mut();
        object_tags.resize(self.objects.len(), 0);
        let class_tags = self.class_tags.borrow();

        let mut pending: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(index) = pending.pop() {
            let object = &self.objects[index];
            let class_tag = class_tags.get(&object.class).copied().unwrap_or(0);
            *self.callbacks.borrow_mut() += 1;

            let visit = visitor(ReachedObject {
                class_tag,
                size: object.size,
                tag: &mut object_tags[index],
            });
            if visit == Visit::Descend {
                pending.extend(object.refs.iter().rev().copied());
            }
        }
        Ok(())
    }
}

impl RuntimeTelemetry for FakeHost {
    fn heap_memory_usage(&self) -> Result<MemoryUsage, HostError> {
        self.query("heap_memory_usage")?;
        Ok(self.heap)
    }

    fn non_heap_memory_usage(&self) -> Result<MemoryUsage, HostError> {
        self.query("non_heap_memory_usage")?;
        Ok(self.non_heap)
    }

    fn memory_pools(&self) -> Result<Vec<PoolUsage>, HostError> {
        self.query("memory_pools")?;
        Ok(self.pools.clone())
    }
}

impl HeapDumper for FakeHost {
    fn dump_heap(&self, path: &Path) -> Result<(), HostError> {
        self.check("dump_heap")?;
        fs::write(path, b"JAVA PROFILE 1.0.2\0")
            .map_err(|e| HostError::Unavailable(e.to_string()))?;
        self.dumps.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

/// Records signals instead of delivering them.
#[derive(Default)]
pub struct RecordingProcess {
    pub raised: Mutex<Vec<Signal>>,
    refused: Option<Signal>,
}

impl RecordingProcess {
    /// Fails delivery of `signal` with EPERM, without recording it.
    pub fn refusing(signal: Signal) -> Self {
        Self { refused: Some(signal), ..Self::default() }
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.raised.lock().unwrap().clone()
    }
}

impl ProcessControl for RecordingProcess {
    fn raise(&self, signal: Signal) -> Result<(), Errno> {
        if self.refused == Some(signal) {
            return Err(Errno::EPERM);
        }
        self.raised.lock().unwrap().push(signal);
        Ok(())
    }
}

pub fn usage(init: i64, used: i64, committed: i64, max: i64) -> MemoryUsage {
    MemoryUsage { init, used, committed, max }
}
