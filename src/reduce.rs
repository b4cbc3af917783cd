//! Per-interval reduction and the count -> offset stage.
//!
//! The stages of a compaction are typed: [`reduce_intervals`] yields
//! [`IntervalCounts`], only [`IntervalCounts::into_offsets`] turns them into
//! [`IntervalOffsets`], and the scatter launch only accepts the latter.

use blockwise_copy::Source;

use crate::decompose::{IndexRange, UniformDecomposition};
use crate::scan::inclusive_scan_in_place;
use crate::{Error, Result};

/// Number of set flags in each interval of a decomposition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalCounts(Vec<usize>);

impl IntervalCounts {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Inclusive scan of the counts, reusing their storage.
    pub fn into_offsets(mut self) -> IntervalOffsets {
        inclusive_scan_in_place(&mut self.0);
        IntervalOffsets(self.0)
    }
}

/// Cumulative counts: entry `g` is the number of selected elements in
/// intervals `0..=g`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalOffsets(Vec<usize>);

impl IntervalOffsets {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// First output position of interval `group`.
    #[inline]
    pub fn base(&self, group: usize) -> usize {
        if group == 0 {
            0
        } else {
            self.0[group - 1]
        }
    }

    /// Number of selected elements over all intervals.
    pub fn total(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }
}

/// Sum `flags` over every interval of `decomp`.
///
/// Intervals are reduced concurrently on the rayon pool with the `parallel`
/// feature.
#[tracing::instrument(skip_all, fields(intervals = decomp.size()))]
pub fn reduce_intervals<S>(flags: &S, decomp: &UniformDecomposition) -> Result<IntervalCounts>
where
    S: Source<Item = usize>,
{
    if flags.len() < decomp.domain() {
        return Err(Error::StencilTooShort {
            stencil: flags.len(),
            input: decomp.domain(),
        });
    }

    // SAFETY: every interval lies inside `[0, decomp.domain())`, checked above.
    let count = |range: IndexRange| -> usize {
        range
            .as_range()
            .map(|i| unsafe { flags.read(i) })
            .sum()
    };

    #[cfg(feature = "parallel")]
    let counts = {
        use rayon::prelude::*;
        (0..decomp.size())
            .into_par_iter()
            .map(|g| count(decomp.get(g)))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let counts = decomp.iter().map(count).collect();

    Ok(IntervalCounts(counts))
}
