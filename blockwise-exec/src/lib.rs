//! Lane/group execution model for blockwise primitives.
//!
//! A kernel runs once per (group, lane) pair. Lanes of one group share a
//! [`GroupBarrier`] and a block of group-local memory; groups never
//! synchronize with each other inside a launch.
//!
//! Every lane is a scoped OS thread. Groups are dispatched on the rayon pool
//! when the `parallel` feature is enabled and one after another otherwise.
//!
//! # Dependency graph
//!
//! ```text
//! blockwise-exec -> blockwise-copy -> blockwise
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use blockwise_exec::{launch, ExecutionContext, Kernel, LaneContext, LaunchConfig};
//!
//! struct CountLanes(AtomicUsize);
//!
//! impl Kernel for CountLanes {
//!     type Shared = ();
//!
//!     fn shared(&self, _group_size: usize) {}
//!
//!     fn run(&self, ctx: &LaneContext<'_>, _shared: &()) {
//!         ctx.barrier();
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! let kernel = CountLanes(AtomicUsize::new(0));
//! launch(LaunchConfig::new(3, 4), &kernel).unwrap();
//! assert_eq!(kernel.0.load(Ordering::Relaxed), 12);
//! ```

mod barrier;
mod context;
mod launch;
mod ptr;
mod residency;

pub use barrier::GroupBarrier;
pub use context::{ExecutionContext, LaneContext};
pub use launch::{launch, Kernel, LaunchConfig};
pub use ptr::SendPtr;

/// Largest number of lanes a single group may have.
pub const MAX_GROUP_SIZE: usize = 1024;

/// Lanes that may be resident (spawned) at once across the whole process.
///
/// Groups beyond this budget wait for earlier groups to retire, the way a
/// device holds back blocks that do not fit on its multiprocessors.
pub const MAX_RESIDENT_LANES: usize = MAX_GROUP_SIZE;

/// Stack size of a lane thread in bytes.
pub const LANE_STACK_SIZE: usize = 256 * 1024;

/// Errors reported by a kernel launch.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Group count or group size is outside the supported range.
    #[error("invalid launch configuration: {groups} groups of {group_size} lanes")]
    InvalidConfig { groups: usize, group_size: usize },

    /// A lane thread could not be created.
    #[error("failed to spawn lane {lane} of group {group}")]
    Spawn {
        group: usize,
        lane: usize,
        #[source]
        source: std::io::Error,
    },

    /// A lane panicked while running the kernel.
    #[error("lane {lane} of group {group} panicked: {message}")]
    LanePanicked {
        group: usize,
        lane: usize,
        message: String,
    },
}

/// Result type for kernel launches.
pub type Result<T> = std::result::Result<T, LaunchError>;
