//! Group-cooperative copies.
//!
//! Two layers, both called by every lane of a group with the lane's
//! [`ExecutionContext`](blockwise_exec::ExecutionContext):
//!
//! - [`copy_bytes`]: raw byte copy using 8-byte words when both addresses
//!   allow it, bytes otherwise.
//! - [`copy_elements`]: typed copy over [`Source`] / [`Sink`] views. Views
//!   over `Pod` slices go through [`copy_bytes`]; everything else is copied
//!   element by element.
//!
//! Lanes stride through the index space (`lane, lane + group_size, ...`), so
//! no lane writes an index another lane touches and no barrier is needed.
//!
//! # Dependency graph
//!
//! ```text
//! blockwise-exec -> blockwise-copy -> blockwise
//! ```

pub mod bytes;
pub mod elements;

pub use bytes::{copy_bytes, copy_bytes_with, is_wide_aligned, CopyWidth, Target, WIDE_WORD_SIZE};
pub use elements::{
    copy_elements, copy_elements_with, ElemSlice, ElemSliceMut, Mapped, PodSlice, PodSliceMut,
    RefSlice, Sink, Source, UninitSliceMut,
};
