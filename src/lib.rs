//! Group-synchronous stream compaction and bulk copies.
//!
//! Device-wide operations built on the lane/group execution model of
//! [`blockwise_exec`] and the cooperative copies of [`blockwise_copy`]. The
//! input is split into one interval per group; lanes of a group work through
//! their interval in chunks of `group_size` elements and meet at a group
//! barrier between phases.
//!
//! # Primary API
//!
//! ## Stream compaction
//!
//! - [`copy_if_stencil`]: Keep `input[i]` when `pred(&stencil[i])` holds
//! - [`copy_if`]: Same, with the input as its own stencil
//! - [`copy_if_into`]: Collect the selected elements into a new `Vec`
//! - [`copy_if_with`]: Generic form over [`Source`] / [`Sink`] views and a [`Device`]
//!
//! ## Bulk copy
//!
//! - [`copy_into`]: Copy a `Pod` slice through the wide-word path
//! - [`copy_cloned_into`]: Copy any `Clone` slice element by element
//! - [`copy_into_with`]: Generic form over views and a [`Device`]
//!
//! ## Building blocks
//!
//! - [`UniformDecomposition`]: Near-equal split of an index domain into intervals
//! - [`reduce_intervals`]: Per-interval sums, scanned into [`IntervalOffsets`]
//! - [`group_inclusive_scan`]: In-group prefix sum over a [`ScanBuffer`]
//!
//! # Example
//!
//! ```rust
//! let values = [4, 9, 16, 25, 36, 49];
//! let mut evens = [0; 6];
//! let n = blockwise::copy_if(&values, &mut evens, |v| v % 2 == 0).unwrap();
//! assert_eq!(&evens[..n], &[4, 16, 36]);
//! ```
//!
//! # Dependency graph
//!
//! ```text
//! blockwise-exec -> blockwise-copy -> blockwise
//! ```

mod copy;
mod copy_if;
mod decompose;
mod device;
mod reduce;
mod scan;

// ============================================================================
// Stream compaction
// ============================================================================
pub use copy_if::{copy_if, copy_if_into, copy_if_stencil, copy_if_with};

// ============================================================================
// Bulk copy
// ============================================================================
pub use copy::{copy_cloned_into, copy_into, copy_into_with};

// ============================================================================
// Building blocks
// ============================================================================
pub use decompose::{default_decomposition, IndexRange, UniformDecomposition};
pub use device::Device;
pub use reduce::{reduce_intervals, IntervalCounts, IntervalOffsets};
pub use scan::{group_inclusive_scan, inclusive_scan_in_place, ScanBuffer};

// Views and copy widths
pub use blockwise_copy::{
    CopyWidth, ElemSlice, ElemSliceMut, Mapped, PodSlice, PodSliceMut, RefSlice, Sink, Source,
    Target, UninitSliceMut,
};

// Execution model
pub use blockwise_exec::{
    launch, ExecutionContext, Kernel, LaneContext, LaunchConfig, LaunchError, MAX_GROUP_SIZE,
};

// ============================================================================
// Constants
// ============================================================================

/// Lanes per group unless a [`Device`] says otherwise.
pub const DEFAULT_GROUP_SIZE: usize = 256;

/// Grain of the default decomposition: interval boundaries fall on multiples
/// of this many elements.
pub const WARP_SIZE: usize = 32;

/// Cap on the intervals (and groups) of the default decomposition.
pub const DEFAULT_MAX_GROUPS: usize = 8;

// ============================================================================
// Error types
// ============================================================================

/// Errors reported by the device-wide operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The kernel launch failed.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The stencil has fewer entries than the input.
    #[error("stencil has {stencil} entries, input has {input}")]
    StencilTooShort { stencil: usize, input: usize },

    /// The output cannot hold every selected element.
    #[error("output holds {available} elements, {needed} selected")]
    OutputTooShort { needed: usize, available: usize },

    /// Source and destination lengths differ.
    #[error("length mismatch: {0} vs {1}")]
    LengthMismatch(usize, usize),
}

/// Result type for device-wide operations.
pub type Result<T> = std::result::Result<T, Error>;
