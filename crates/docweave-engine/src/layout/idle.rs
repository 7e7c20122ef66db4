use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::blocks::Layout;
use crate::document::Document;
use crate::layout::LayoutContext;
use crate::platform::IdleHandle;

/// Decides how much layout work one idle slice may do
pub trait IdleBudget {
    fn has_time_remaining(&self) -> bool;
}

/// Wall-clock budget, the usual choice inside an idle callback
#[derive(Debug, Clone, Copy)]
pub struct DeadlineBudget {
    deadline: Instant,
}

impl DeadlineBudget {
    pub fn new(slice: Duration) -> Self {
        Self {
            deadline: Instant::now() + slice,
        }
    }
}

impl IdleBudget for DeadlineBudget {
    fn has_time_remaining(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// Allows a fixed number of blocks per slice
#[derive(Debug)]
pub struct BlockCountBudget {
    remaining: Cell<usize>,
}

impl BlockCountBudget {
    pub fn new(blocks: usize) -> Self {
        Self {
            remaining: Cell::new(blocks),
        }
    }
}

impl IdleBudget for BlockCountBudget {
    fn has_time_remaining(&self) -> bool {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return false;
        }
        self.remaining.set(remaining - 1);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutProgress {
    Complete,
    /// Dirty blocks remain; call again
    Pending,
}

/// Drives [`Document::layout_slice`] from host idle callbacks.
///
/// At most one callback is outstanding. Cancelling only stops scheduling;
/// whatever was laid out stays valid.
#[derive(Debug, Default)]
pub struct IdleLayout {
    pending: Option<IdleHandle>,
}

impl IdleLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<IdleHandle> {
        self.pending
    }

    /// Schedule a callback unless one is already outstanding
    pub fn start(&mut self, ctx: &LayoutContext<'_>) {
        if self.pending.is_none() {
            self.pending = Some(ctx.platform.schedule_idle_work());
        }
    }

    /// Run one slice for the callback `handle`. Reschedules while work
    /// remains. Stale handles are ignored.
    pub fn on_idle(
        &mut self,
        handle: IdleHandle,
        document: &mut Document,
        ctx: &LayoutContext<'_>,
        width: f32,
        budget: &dyn IdleBudget,
    ) -> LayoutProgress {
        if self.pending != Some(handle) {
            log::debug!("ignoring stale idle callback {handle:?}");
            return if document.needs_layout() {
                LayoutProgress::Pending
            } else {
                LayoutProgress::Complete
            };
        }
        self.pending = None;
        let progress = document.layout_slice(ctx, width, budget);
        if progress == LayoutProgress::Pending {
            self.start(ctx);
        }
        progress
    }

    pub fn cancel(&mut self, ctx: &LayoutContext<'_>) {
        if let Some(handle) = self.pending.take() {
            ctx.platform.cancel_idle_work(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MonospacePlatform;
    use crate::tests::fixtures::paragraphs;

    #[test]
    fn test_block_count_budget_runs_out() {
        let budget = BlockCountBudget::new(2);
        assert!(budget.has_time_remaining());
        assert!(budget.has_time_remaining());
        assert!(!budget.has_time_remaining());
    }

    #[test]
    fn test_idle_layout_completes_over_several_slices() {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        let ctx = LayoutContext::new(&platform);
        let mut document = paragraphs(&["one", "two", "three"]);
        let mut idle = IdleLayout::new();
        idle.start(&ctx);
        assert_eq!(platform.pending_idle_work().len(), 1);

        let mut slices = 0;
        while let Some(handle) = platform.take_idle_work() {
            slices += 1;
            let budget = BlockCountBudget::new(1);
            idle.on_idle(handle, &mut document, &ctx, 200.0, &budget);
        }
        assert_eq!(slices, 3);
        assert!(!document.needs_layout());
        assert_eq!(document.height(), 60.0);
    }

    #[test]
    fn test_cancel_stops_scheduling() {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        let ctx = LayoutContext::new(&platform);
        let mut document = paragraphs(&["one", "two"]);
        let mut idle = IdleLayout::new();
        idle.start(&ctx);
        let handle = idle.pending().unwrap();
        idle.cancel(&ctx);
        assert!(platform.pending_idle_work().is_empty());

        let progress = idle.on_idle(handle, &mut document, &ctx, 200.0, &BlockCountBudget::new(5));
        assert_eq!(progress, LayoutProgress::Pending);
        assert!(document.needs_layout());
    }
}
