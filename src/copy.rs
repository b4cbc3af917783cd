//! Device-wide copy: one group per interval, each group running the
//! cooperative element copy over its interval.

use blockwise_copy::{
    copy_elements_with, CopyWidth, ElemSlice, ElemSliceMut, PodSlice, PodSliceMut, Sink, Source,
};
use blockwise_exec::{launch, ExecutionContext, Kernel, LaneContext};
use bytemuck::Pod;

use crate::decompose::{default_decomposition, UniformDecomposition};
use crate::device::Device;
use crate::{Error, Result};

struct CopyKernel<'a, S, D> {
    src: &'a S,
    dst: &'a D,
    decomp: UniformDecomposition,
    width: CopyWidth,
}

impl<S, D> Kernel for CopyKernel<'_, S, D>
where
    S: Source,
    D: Sink<Item = S::Item>,
{
    type Shared = ();

    fn shared(&self, _group_size: usize) {}

    fn run(&self, ctx: &LaneContext<'_>, _shared: &()) {
        let range = self.decomp.get(ctx.group_index());
        // SAFETY: intervals are disjoint and inside `[0, len)` of both views.
        unsafe {
            copy_elements_with(
                ctx,
                self.width,
                self.src,
                range.as_range(),
                self.dst,
                range.begin,
            );
        }
    }
}

/// Copy every item of `src` to the same index of `dst`. Returns the number
/// of items copied.
///
/// Trivial view pairs move bytes with `device.copy_width`; other pairs are
/// copied item by item.
#[tracing::instrument(skip_all, fields(n = src.len(), group_size = device.group_size))]
pub fn copy_into_with<S, D>(device: &Device, src: &S, dst: &D) -> Result<usize>
where
    S: Source,
    D: Sink<Item = S::Item>,
{
    let n = src.len();
    if dst.len() != n {
        return Err(Error::LengthMismatch(dst.len(), n));
    }
    if n == 0 {
        return Ok(0);
    }

    let decomp = default_decomposition(n, device);
    let kernel = CopyKernel {
        src,
        dst,
        decomp,
        width: device.copy_width,
    };
    launch(device.launch_config(decomp.size()), &kernel)?;
    Ok(n)
}

/// Copy a `Pod` slice: `dest[i] = src[i]`.
///
/// ```rust
/// let src = [1.5f64, 2.5, 3.5];
/// let mut dest = [0.0; 3];
/// blockwise::copy_into(&src, &mut dest).unwrap();
/// assert_eq!(dest, src);
/// ```
pub fn copy_into<T: Pod + Send + Sync>(src: &[T], dest: &mut [T]) -> Result<()> {
    copy_into_with(
        &Device::default(),
        &PodSlice::new(src),
        &PodSliceMut::new(dest),
    )?;
    Ok(())
}

/// Clone every element of `src` into `dest`, dropping the previous values.
pub fn copy_cloned_into<T: Clone + Send + Sync>(src: &[T], dest: &mut [T]) -> Result<()> {
    copy_into_with(
        &Device::default(),
        &ElemSlice::new(src),
        &ElemSliceMut::new(dest),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_copy_into_pod() {
        let mut rng = StdRng::seed_from_u64(7);
        let src: Vec<u32> = (0..1000).map(|_| rng.gen()).collect();
        let mut dest = vec![0u32; 1000];
        copy_into(&src, &mut dest).unwrap();
        assert_eq!(dest, src);
    }

    #[test]
    fn test_copy_into_with_widths() {
        let src: Vec<u8> = (0..=255).cycle().take(777).collect();
        for width in [CopyWidth::Wide, CopyWidth::Byte] {
            let device = Device::new()
                .with_group_size(16)
                .with_max_groups(4)
                .with_copy_width(width);
            let mut dest = vec![0u8; src.len()];
            let n = copy_into_with(&device, &PodSlice::new(&src), &PodSliceMut::new(&mut dest))
                .unwrap();
            assert_eq!(n, src.len());
            assert_eq!(dest, src, "{width:?}");
        }
    }

    #[test]
    fn test_copy_cloned_into() {
        let src: Vec<String> = (0..40).map(|i| format!("item-{i}")).collect();
        let mut dest = vec![String::from("old"); 40];
        copy_cloned_into(&src, &mut dest).unwrap();
        assert_eq!(dest, src);
    }

    #[test]
    fn test_length_mismatch() {
        let src = [1u8, 2, 3];
        let mut dest = [0u8; 2];
        let err = copy_into(&src, &mut dest).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch(2, 3)));
    }

    #[test]
    fn test_empty_copy() {
        let src: [u64; 0] = [];
        let mut dest: [u64; 0] = [];
        copy_into(&src, &mut dest).unwrap();
    }
}
