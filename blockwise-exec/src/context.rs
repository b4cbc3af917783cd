//! Per-lane view of the executing group.

use crate::barrier::GroupBarrier;

/// What a lane knows about where it runs.
///
/// Device code is written against this trait so that it can run under the
/// threaded launcher or under any other realization of the group model.
pub trait ExecutionContext {
    /// Position of this lane within its group, `0..group_size()`.
    fn lane_index(&self) -> usize;

    /// Number of lanes in the group. Constant for a launch.
    fn group_size(&self) -> usize;

    /// Index of the group this lane belongs to.
    fn group_index(&self) -> usize;

    /// Wait until every lane of the group has reached a barrier.
    fn barrier(&self);
}

/// Execution context handed to a kernel by [`launch`](crate::launch).
#[derive(Clone, Copy, Debug)]
pub struct LaneContext<'a> {
    lane_index: usize,
    group_size: usize,
    group_index: usize,
    barrier: &'a GroupBarrier,
}

impl<'a> LaneContext<'a> {
    pub fn new(
        lane_index: usize,
        group_size: usize,
        group_index: usize,
        barrier: &'a GroupBarrier,
    ) -> Self {
        debug_assert!(lane_index < group_size);
        Self {
            lane_index,
            group_size,
            group_index,
            barrier,
        }
    }

    pub(crate) fn group_barrier(&self) -> &'a GroupBarrier {
        self.barrier
    }
}

impl ExecutionContext for LaneContext<'_> {
    #[inline]
    fn lane_index(&self) -> usize {
        self.lane_index
    }

    #[inline]
    fn group_size(&self) -> usize {
        self.group_size
    }

    #[inline]
    fn group_index(&self) -> usize {
        self.group_index
    }

    #[inline]
    fn barrier(&self) {
        self.barrier.wait();
    }
}
