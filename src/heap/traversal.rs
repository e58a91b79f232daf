use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use crate::error::HostError;
use crate::heap::histogram::ObjectHistogram;
use crate::heap::tags::ClassTagTable;
use crate::host::{HeapWalker, ReachedObject, Visit};

/// Class tags are assigned below this value.
pub const CLASS_TAG_LIMIT: i64 = 1 << 31;

/// Low tag bits holding a class tag. Bits above it carry the visit epoch.
pub const CLASS_TAG_MASK: i64 = CLASS_TAG_LIMIT - 1;

const EPOCH_SHIFT: u32 = 32;
// 31 bits, keeps the tag positive
const EPOCH_LIMIT: u32 = (1 << 31) - 1;

/// Histogram walks over a host heap.
///
/// Every loaded class gets a small tag first, so the reference walk can map
/// the class tag of each reached object back to a signature. Objects are
/// counted the first time they are reached in a capture: reaching one stamps
/// the capture's epoch into the high bits of its tag, and an object already
/// stamped with the current epoch is pruned. That handles cycles, and marks
/// left behind by an earlier capture never hide objects from a later one.
///
/// Epochs are numbered per instance, so one `HeapTraversal` should serve
/// every capture against a given heap.
#[derive(Debug, Default)]
pub struct HeapTraversal {
    captures: AtomicU32,
}

impl HeapTraversal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture_histogram<W: HeapWalker + ?Sized>(
        &self,
        walker: &W,
    ) -> Result<ObjectHistogram, HostError> {
        let epoch = self.next_epoch();
        let tags = tag_loaded_classes(walker)?;
        debug!(classes = tags.len(), epoch, "tagged loaded classes");

        let stamp = i64::from(epoch) << EPOCH_SHIFT;
        let mut histogram = ObjectHistogram::new();
        let mut visitor = |object: ReachedObject<'_>| {
            if *object.tag & !CLASS_TAG_MASK == stamp {
                return Visit::Prune;
            }
            // class objects keep their class tag
            *object.tag = (*object.tag & CLASS_TAG_MASK) | stamp;

            if let Some(signature) = tags.signature(object.class_tag & CLASS_TAG_MASK) {
                histogram.record_object(signature, object.size);
            }
            Visit::Descend
        };
        walker.follow_references(&mut visitor)?;

        Ok(histogram)
    }

    fn next_epoch(&self) -> u32 {
        self.captures.fetch_add(1, Ordering::Relaxed) % EPOCH_LIMIT + 1
    }
}

fn tag_loaded_classes<W: HeapWalker + ?Sized>(walker: &W) -> Result<ClassTagTable, HostError> {
    let mut tags = ClassTagTable::new(CLASS_TAG_LIMIT);
    for class in walker.loaded_classes()? {
        let signature = walker.class_signature(class)?;
        let tag = tags.assign(signature)?;
        walker.set_class_tag(class, tag)?;
    }
    Ok(tags)
}
