//! Partition of an index domain into per-group intervals.

use crate::device::Device;
use crate::WARP_SIZE;

/// Half-open interval `[begin, end)` of the index domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub begin: usize,
    pub end: usize,
}

impl IndexRange {
    pub const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    pub const fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.begin..self.end
    }
}

/// Near-equal split of `[0, n)` into at most `max_intervals` intervals.
///
/// The domain is cut into grains of `granularity` indices. With more grains
/// than intervals, the first `grains % max_intervals` intervals take one grain
/// more than the others. Every interval except the last is a whole number of
/// grains and none is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformDecomposition {
    n: usize,
    intervals: usize,
    threshold: usize,
    small_interval: usize,
    large_interval: usize,
}

impl UniformDecomposition {
    /// `granularity` and `max_intervals` are raised to at least 1.
    pub fn new(n: usize, granularity: usize, max_intervals: usize) -> Self {
        let granularity = granularity.max(1);
        let max_intervals = max_intervals.max(1);
        let grains = n.div_ceil(granularity);

        if grains > max_intervals {
            let small_interval = granularity * (grains / max_intervals);
            Self {
                n,
                intervals: max_intervals,
                threshold: grains % max_intervals,
                small_interval,
                large_interval: small_interval + granularity,
            }
        } else {
            Self {
                n,
                intervals: grains,
                threshold: 0,
                small_interval: granularity,
                large_interval: 0,
            }
        }
    }

    /// Number of intervals.
    pub fn size(&self) -> usize {
        self.intervals
    }

    /// Length of the decomposed domain.
    pub fn domain(&self) -> usize {
        self.n
    }

    /// Interval assigned to group `i`.
    pub fn get(&self, i: usize) -> IndexRange {
        debug_assert!(i < self.intervals);
        let (begin, len) = if i < self.threshold {
            (self.large_interval * i, self.large_interval)
        } else {
            (
                self.large_interval * self.threshold + (i - self.threshold) * self.small_interval,
                self.small_interval,
            )
        };
        IndexRange::new(begin, (begin + len).min(self.n))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = IndexRange> + '_ {
        (0..self.intervals).map(move |i| self.get(i))
    }
}

/// Decomposition used by the device-wide operations: warp-sized grains, at
/// most `device.max_groups` intervals.
pub fn default_decomposition(n: usize, device: &Device) -> UniformDecomposition {
    UniformDecomposition::new(n, WARP_SIZE, device.max_groups)
}
