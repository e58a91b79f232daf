use std::io::{self, Write};

use tracing::warn;

use super::{banner, Action, ActionContext};
use crate::error::ActionError;
use crate::host::{MemoryUsage, PoolUsage};

/// Prints heap, non-heap and per-pool usage from the management beans.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoolStats;

impl Action for PoolStats {
    fn name(&self) -> &'static str {
        "memory pools"
    }

    fn act(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        if ctx.flags.is_threads() {
            warn!("cannot dump memory pools since the JVM is unable to create a thread");
            return Ok(());
        }

        let heap = ctx.runtime.heap_memory_usage();
        let non_heap = ctx.runtime.non_heap_memory_usage();
        let pools = ctx.runtime.memory_pools();
        let (heap, non_heap, pools) = match (heap, non_heap, pools) {
            (Ok(h), Ok(n), Ok(p)) => (h, n, p),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                warn!("cannot query memory usage: {}", e);
                return Ok(());
            }
        };

        banner(ctx.out, "Memory Pools")?;
        write_report(ctx.out, &heap, &non_heap, &pools)?;
        ctx.out.flush()?;
        Ok(())
    }
}

fn write_report(
    out: &mut dyn Write,
    heap: &MemoryUsage,
    non_heap: &MemoryUsage,
    pools: &[PoolUsage],
) -> io::Result<()> {
    writeln!(out, "Memory usage:")?;
    write_usage(out, "Heap memory", heap)?;
    write_usage(out, "Non-heap memory", non_heap)?;

    writeln!(out)?;
    writeln!(out, "Memory pool usage:")?;
    for pool in pools {
        write_usage(out, &pool.name, &pool.usage)?;
    }
    Ok(())
}

fn write_usage(out: &mut dyn Write, name: &str, usage: &MemoryUsage) -> io::Result<()> {
    writeln!(
        out,
        "   {}: init {}, used {}, committed {}, max {}",
        name, usage.init, usage.used, usage.committed, usage.max
    )?;
    if let Some(hint) = sizing_hint(name, usage) {
        writeln!(out, "      Hint: {}", hint)?;
    }
    Ok(())
}

fn sizing_hint(name: &str, usage: &MemoryUsage) -> Option<&'static str> {
    if !near_limit(usage) {
        return None;
    }
    match name {
        "Heap memory" => Some("Heap memory is over 95% full. To increase it, increase the container size."),
        "Metaspace" => Some("Metaspace is over 95% full. To increase it, set -XX:MaxMetaspaceSize to a suitable value."),
        "Compressed Class Space" => Some("Compressed Class Space is over 95% full. To increase it, set -XX:CompressedClassSpaceSize to a suitable value."),
        _ => None,
    }
}

/// Committed at or above 95% of a defined maximum.
fn near_limit(usage: &MemoryUsage) -> bool {
    usage.max > 0 && usage.committed.saturating_mul(100) >= usage.max.saturating_mul(95)
}
