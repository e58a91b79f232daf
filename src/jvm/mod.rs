//! Host capabilities backed by a live JVM, and the exported agent.

mod agent;
mod heap;
mod management;

pub use agent::JvmKill;
pub use heap::JvmtiHeap;
pub use management::Management;
