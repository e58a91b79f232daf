//! Heap histogram: class tagging, the reference walk, and the table it prints.

pub mod class_name;
pub mod histogram;
pub mod tags;
pub mod traversal;

pub use class_name::java_name;
pub use histogram::{ClassStats, HistogramReport, HistogramRow, ObjectHistogram};
pub use traversal::{HeapTraversal, CLASS_TAG_LIMIT, CLASS_TAG_MASK};
