use tracing::info;

use super::{banner, Action, ActionContext};
use crate::error::ActionError;
use crate::heap::{java_name, HeapTraversal};

/// Prints the classes holding the most live bytes.
///
/// Owns the traversal so repeated runs against the same VM each start a new
/// visit epoch.
#[derive(Debug)]
pub struct HeapHistogram {
    max_entries: usize,
    traversal: HeapTraversal,
}

impl HeapHistogram {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries, traversal: HeapTraversal::new() }
    }
}

impl Action for HeapHistogram {
    fn name(&self) -> &'static str {
        "heap histogram"
    }

    fn act(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let histogram = self.traversal.capture_histogram(ctx.heap)?;
        info!(classes = histogram.len(), "heap histogram captured");

        let report = histogram.render_with(self.max_entries, java_name);
        banner(ctx.out, "Heap Histogram")?;
        write!(ctx.out, "{}", report)?;
        ctx.out.flush()?;
        Ok(())
    }
}
