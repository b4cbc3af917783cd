//! Prefix sums: in-group over group-local memory, and global over per-group totals.

use std::sync::atomic::{AtomicUsize, Ordering};

use blockwise_exec::ExecutionContext;

/// Group-local array of counters, one slot per lane.
///
/// Slots are relaxed atomics; ordering between lanes comes from the group
/// barrier, which every reader must have passed since the last write.
#[derive(Debug)]
pub struct ScanBuffer {
    slots: Box<[AtomicUsize]>,
}

impl ScanBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn load(&self, index: usize) -> usize {
        self.slots[index].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn store(&self, index: usize, value: usize) {
        self.slots[index].store(value, Ordering::Relaxed);
    }
}

/// In-place inclusive prefix sum of `buffer` across the lanes of a group.
///
/// Every lane of the group must call this after the buffer has been filled
/// and a barrier issued. It returns after a final barrier, so every slot
/// holds its prefix sum on every lane.
pub fn group_inclusive_scan<C: ExecutionContext>(ctx: &C, buffer: &ScanBuffer) {
    let lane = ctx.lane_index();
    let n = ctx.group_size();
    debug_assert_eq!(buffer.len(), n);

    let mut offset = 1;
    while offset < n {
        let sum = if lane >= offset {
            Some(buffer.load(lane) + buffer.load(lane - offset))
        } else {
            None
        };
        ctx.barrier();
        if let Some(sum) = sum {
            buffer.store(lane, sum);
        }
        ctx.barrier();
        offset *= 2;
    }
}

/// Replace every value with the sum of itself and all values before it.
pub fn inclusive_scan_in_place(values: &mut [usize]) {
    let mut acc = 0usize;
    for v in values.iter_mut() {
        acc += *v;
        *v = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockwise_exec::{launch, Kernel, LaneContext, LaunchConfig};
    use std::sync::Mutex;

    /// Lane `i` of group `g` contributes `inputs[g][i]`; results are collected per group.
    struct ScanKernel {
        inputs: Vec<Vec<usize>>,
        outputs: Mutex<Vec<Vec<usize>>>,
    }

    impl Kernel for ScanKernel {
        type Shared = ScanBuffer;

        fn shared(&self, group_size: usize) -> ScanBuffer {
            ScanBuffer::new(group_size)
        }

        fn run(&self, ctx: &LaneContext<'_>, buffer: &ScanBuffer) {
            let (g, lane) = (ctx.group_index(), ctx.lane_index());
            buffer.store(lane, self.inputs[g][lane]);
            ctx.barrier();
            group_inclusive_scan(ctx, buffer);
            self.outputs.lock().unwrap()[g][lane] = buffer.load(lane);
        }
    }

    fn sequential_scan(values: &[usize]) -> Vec<usize> {
        let mut out = values.to_vec();
        inclusive_scan_in_place(&mut out);
        out
    }

    #[test]
    fn test_group_scan_matches_sequential() {
        for group_size in [1, 2, 3, 5, 8, 13, 32, 100] {
            let groups = 3;
            let inputs: Vec<Vec<usize>> = (0..groups)
                .map(|g| (0..group_size).map(|i| (i * 7 + g) % 4).collect())
                .collect();
            let kernel = ScanKernel {
                outputs: Mutex::new(vec![vec![0; group_size]; groups]),
                inputs,
            };
            launch(LaunchConfig::new(groups, group_size), &kernel).unwrap();

            let outputs = kernel.outputs.into_inner().unwrap();
            for (input, output) in kernel.inputs.iter().zip(&outputs) {
                assert_eq!(output, &sequential_scan(input), "group_size={group_size}");
            }
        }
    }

    #[test]
    fn test_inclusive_scan_in_place() {
        let mut values = vec![3, 0, 2, 5, 0];
        inclusive_scan_in_place(&mut values);
        assert_eq!(values, vec![3, 3, 5, 10, 10]);

        let mut empty: Vec<usize> = Vec::new();
        inclusive_scan_in_place(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_scan_buffer_slots() {
        let buffer = ScanBuffer::new(4);
        assert_eq!(buffer.len(), 4);
        buffer.store(2, 9);
        assert_eq!(buffer.load(2), 9);
        assert_eq!(buffer.load(0), 0);
        assert!(ScanBuffer::new(0).is_empty());
    }
}
