//! Stream compaction: order-preserving copy of the elements whose stencil
//! value satisfies a predicate.
//!
//! The predicate is evaluated exactly once per element, into a flag buffer.
//! Two passes over a [`UniformDecomposition`] of that buffer follow:
//!
//! 1. count the set flags of every interval and scan the counts into
//!    per-group output offsets;
//! 2. launch one group per interval; each group walks its interval in chunks
//!    of `group_size`, ranks the selected lanes of a chunk with a group scan
//!    and writes them after everything earlier groups and chunks produced.

use std::mem::MaybeUninit;

use blockwise_copy::{
    ElemSlice, ElemSliceMut, Mapped, PodSlice, RefSlice, Sink, Source, UninitSliceMut,
};
use blockwise_exec::{launch, ExecutionContext, Kernel, LaneContext};

use crate::decompose::{default_decomposition, UniformDecomposition};
use crate::device::Device;
use crate::reduce::{reduce_intervals, IntervalOffsets};
use crate::scan::{group_inclusive_scan, ScanBuffer};
use crate::{Error, Result};

/// Scatter pass: one group per interval of `decomp`.
struct ScatterKernel<'a, I, D> {
    input: &'a I,
    flags: &'a [u8],
    offsets: &'a IntervalOffsets,
    decomp: UniformDecomposition,
    output: &'a D,
}

impl<I, D> ScatterKernel<'_, I, D>
where
    I: Source,
    D: Sink<Item = I::Item>,
{
    /// Rank and write the chunk starting at `base`; returns its selected count.
    ///
    /// `flag` is this lane's 0/1 flag, 0 for lanes past the interval end.
    fn scatter_chunk(
        &self,
        ctx: &LaneContext<'_>,
        sdata: &ScanBuffer,
        base: usize,
        output: usize,
        flag: usize,
    ) -> usize {
        let lane = ctx.lane_index();
        sdata.store(lane, flag);
        ctx.barrier();

        group_inclusive_scan(ctx, sdata);

        if flag != 0 {
            let position = output + sdata.load(lane) - 1;
            // SAFETY: `base + lane` is inside this group's interval because the
            // flag is set. The counting pass read the same flags, so `position`
            // is below the total, which fits `output`.
            unsafe { self.output.write(position, self.input.read(base + lane)) };
        }
        sdata.load(ctx.group_size() - 1)
    }
}

impl<I, D> Kernel for ScatterKernel<'_, I, D>
where
    I: Source,
    D: Sink<Item = I::Item>,
{
    type Shared = ScanBuffer;

    fn shared(&self, group_size: usize) -> ScanBuffer {
        ScanBuffer::new(group_size)
    }

    fn run(&self, ctx: &LaneContext<'_>, sdata: &ScanBuffer) {
        let group_size = ctx.group_size();
        let lane = ctx.lane_index();
        let range = self.decomp.get(ctx.group_index());

        let mut base = range.begin;
        let mut output = self.offsets.base(ctx.group_index());

        while base + group_size <= range.end {
            let flag = usize::from(self.flags[base + lane]);
            output += self.scatter_chunk(ctx, sdata, base, output, flag);
            base += group_size;
            // The buffer is refilled next iteration.
            ctx.barrier();
        }

        if base < range.end {
            let flag = if base + lane < range.end {
                usize::from(self.flags[base + lane])
            } else {
                0
            };
            self.scatter_chunk(ctx, sdata, base, output, flag);
        }
    }
}

/// Copy `input[p]` to the front of `output` for every `p` with `pred(stencil[p])`,
/// preserving order. Returns the number of elements written.
///
/// `output` must hold at least that many elements; this is checked after the
/// counting pass, before anything is written.
///
/// `pred` runs once per element, on the calling thread or the rayon pool,
/// before any lane starts. A panic in `pred` propagates out of this call;
/// only failures inside the scatter launch come back as [`Error::Launch`].
#[tracing::instrument(skip_all, fields(n = input.len(), group_size = device.group_size))]
pub fn copy_if_with<I, S, D, P>(
    device: &Device,
    input: &I,
    stencil: &S,
    output: &D,
    pred: P,
) -> Result<usize>
where
    I: Source,
    S: Source,
    D: Sink<Item = I::Item>,
    P: Fn(S::Item) -> bool + Sync,
{
    let n = input.len();
    if n == 0 {
        return Ok(0);
    }
    if stencil.len() < n {
        return Err(Error::StencilTooShort {
            stencil: stencil.len(),
            input: n,
        });
    }

    let flags = evaluate_flags(stencil, n, &pred);
    let decomp = default_decomposition(n, device);

    let counted = Mapped::new(PodSlice::new(&flags), |flag: u8| usize::from(flag));
    let offsets = reduce_intervals(&counted, &decomp)?.into_offsets();
    let total = offsets.total();
    if output.len() < total {
        return Err(Error::OutputTooShort {
            needed: total,
            available: output.len(),
        });
    }
    tracing::debug!(groups = decomp.size(), selected = total, "scattering");

    let kernel = ScatterKernel {
        input,
        flags: &flags,
        offsets: &offsets,
        decomp,
        output,
    };
    launch(device.launch_config(decomp.size()), &kernel)?;
    Ok(total)
}

/// `pred(stencil[i])` as 0/1 for `i < n`.
fn evaluate_flags<S, P>(stencil: &S, n: usize, pred: &P) -> Vec<u8>
where
    S: Source,
    P: Fn(S::Item) -> bool + Sync,
{
    debug_assert!(n <= stencil.len());
    // SAFETY: `i < n <= stencil.len()`.
    let flag = |i: usize| u8::from(pred(unsafe { stencil.read(i) }));

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..n).into_par_iter().map(flag).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..n).map(flag).collect()
    }
}

/// Copy the elements of `input` whose matching `stencil` entry satisfies
/// `pred` to the front of `output`. Returns the number copied.
///
/// ```rust
/// let input = [3, 0, 5, 0, 7, 0, 2];
/// let stencil = [1, 0, 1, 0, 1, 0, 1];
/// let mut output = [0; 7];
/// let n = blockwise::copy_if_stencil(&input, &stencil, &mut output, |s| *s != 0).unwrap();
/// assert_eq!(&output[..n], &[3, 5, 7, 2]);
/// ```
pub fn copy_if_stencil<T, U, P>(
    input: &[T],
    stencil: &[U],
    output: &mut [T],
    pred: P,
) -> Result<usize>
where
    T: Clone + Send + Sync,
    U: Sync,
    P: Fn(&U) -> bool + Sync,
{
    copy_if_with(
        &Device::default(),
        &ElemSlice::new(input),
        &RefSlice::new(stencil),
        &ElemSliceMut::new(output),
        pred,
    )
}

/// Copy the elements of `input` satisfying `pred` to the front of `output`.
/// Returns the number copied.
pub fn copy_if<T, P>(input: &[T], output: &mut [T], pred: P) -> Result<usize>
where
    T: Clone + Send + Sync,
    P: Fn(&T) -> bool + Sync,
{
    copy_if_stencil(input, input, output, pred)
}

/// Collect the elements of `input` whose `stencil` entry satisfies `pred`.
pub fn copy_if_into<T, U, P>(input: &[T], stencil: &[U], pred: P) -> Result<Vec<T>>
where
    T: Clone + Send + Sync,
    U: Sync,
    P: Fn(&U) -> bool + Sync,
{
    let mut out: Vec<T> = Vec::with_capacity(input.len());
    let spare: &mut [MaybeUninit<T>] = &mut out.spare_capacity_mut()[..input.len()];
    let written = copy_if_with(
        &Device::default(),
        &ElemSlice::new(input),
        &RefSlice::new(stencil),
        &UninitSliceMut::new(spare),
        pred,
    )?;
    // SAFETY: the scatter pass initialized exactly the first `written` slots.
    unsafe { out.set_len(written) };
    Ok(out)
}
