//! Kernel launch facility.

use std::any::Any;
use std::thread;

use crate::barrier::{BarrierAborted, GroupBarrier, LaneGuard};
use crate::context::LaneContext;
use crate::residency::RESIDENCY;
use crate::{LaunchError, Result, LANE_STACK_SIZE, MAX_GROUP_SIZE};

/// Work executed once per (group, lane) pair.
pub trait Kernel: Sync {
    /// Group-local memory, allocated once per group and shared by its lanes.
    type Shared: Sync;

    /// Allocate the group-local memory for a group of `group_size` lanes.
    fn shared(&self, group_size: usize) -> Self::Shared;

    /// Body of one lane.
    fn run(&self, ctx: &LaneContext<'_>, shared: &Self::Shared);
}

/// Shape of a launch: `groups` groups of `group_size` lanes each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    pub groups: usize,
    pub group_size: usize,
}

impl LaunchConfig {
    pub fn new(groups: usize, group_size: usize) -> Self {
        Self { groups, group_size }
    }

    /// Reject empty launches and groups larger than [`MAX_GROUP_SIZE`].
    pub fn validate(&self) -> Result<()> {
        if self.groups == 0 || self.group_size == 0 || self.group_size > MAX_GROUP_SIZE {
            return Err(LaunchError::InvalidConfig {
                groups: self.groups,
                group_size: self.group_size,
            });
        }
        Ok(())
    }

    pub fn total_lanes(&self) -> usize {
        self.groups.saturating_mul(self.group_size)
    }
}

/// Run `kernel` on every lane of every group and wait for all of them.
///
/// A failure of any lane fails the whole launch; lanes already done keep
/// their side effects, there is no rollback.
#[tracing::instrument(skip_all, fields(groups = config.groups, group_size = config.group_size))]
pub fn launch<K: Kernel>(config: LaunchConfig, kernel: &K) -> Result<()> {
    config.validate()?;
    tracing::debug!(lanes = config.total_lanes(), "launching kernel");

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..config.groups)
            .into_par_iter()
            .try_for_each(|group| run_group(kernel, group, config.group_size))
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..config.groups).try_for_each(|group| run_group(kernel, group, config.group_size))
    }
}

fn run_group<K: Kernel>(kernel: &K, group_index: usize, group_size: usize) -> Result<()> {
    let _resident = RESIDENCY.acquire(group_size);
    let barrier = GroupBarrier::new(group_size);
    let shared = kernel.shared(group_size);
    tracing::trace!(group = group_index, "group resident");

    thread::scope(|scope| {
        let mut lanes = Vec::with_capacity(group_size);
        let mut spawn_error = None;

        for lane_index in 0..group_size {
            let ctx = LaneContext::new(lane_index, group_size, group_index, &barrier);
            let shared = &shared;
            let spawned = thread::Builder::new()
                .name(format!("blockwise-g{group_index}-l{lane_index}"))
                .stack_size(LANE_STACK_SIZE)
                .spawn_scoped(scope, move || {
                    let _guard = LaneGuard {
                        barrier: ctx.group_barrier(),
                    };
                    kernel.run(&ctx, shared);
                });
            match spawned {
                Ok(handle) => lanes.push(handle),
                Err(source) => {
                    barrier.abort();
                    spawn_error = Some(LaunchError::Spawn {
                        group: group_index,
                        lane: lane_index,
                        source,
                    });
                    break;
                }
            }
        }

        let mut first_panic = None;
        for (lane, handle) in lanes.into_iter().enumerate() {
            if let Err(payload) = handle.join() {
                if first_panic.is_none() && !payload.is::<BarrierAborted>() {
                    first_panic = Some(LaunchError::LanePanicked {
                        group: group_index,
                        lane,
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        match spawn_error.or(first_panic) {
            Some(err) => {
                tracing::debug!(group = group_index, error = %err, "group failed");
                Err(err)
            }
            None => Ok(()),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
