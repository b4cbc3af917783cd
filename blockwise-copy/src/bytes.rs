//! Bulk byte copy cooperating across the lanes of a group.

use blockwise_exec::ExecutionContext;

/// Size of the wide word used by the aligned path.
pub const WIDE_WORD_SIZE: usize = std::mem::size_of::<u64>();

/// Access granularity allowed for bulk copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CopyWidth {
    /// Wide words when both addresses are aligned to [`WIDE_WORD_SIZE`].
    Wide,
    /// Always bytes, whatever the alignment.
    Byte,
}

impl CopyWidth {
    /// Width compiled in: `Byte` with the `legacy-target` feature, `Wide` otherwise.
    pub const BUILD_DEFAULT: CopyWidth = if cfg!(feature = "legacy-target") {
        CopyWidth::Byte
    } else {
        CopyWidth::Wide
    };
}

impl Default for CopyWidth {
    fn default() -> Self {
        Self::BUILD_DEFAULT
    }
}

/// Hardware generation a launch is compiled for, as `major * 100 + minor * 10`
/// (e.g. `130` for 1.3, `200` for 2.0).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target {
    pub arch: u32,
}

impl Target {
    /// Oldest generation trusted with wide copies. Older ones mis-handle a
    /// region re-typed to a wider access, so they get byte copies.
    pub const WIDE_COPY_MIN_ARCH: u32 = 200;

    pub const fn new(arch: u32) -> Self {
        Self { arch }
    }

    pub const fn copy_width(&self) -> CopyWidth {
        if self.arch < Self::WIDE_COPY_MIN_ARCH {
            CopyWidth::Byte
        } else {
            CopyWidth::Wide
        }
    }
}

#[inline]
pub fn is_wide_aligned(ptr: *const u8) -> bool {
    (ptr as usize) % WIDE_WORD_SIZE == 0
}

/// Copy `num_bytes` bytes from `src` to `dst` with the build's [`CopyWidth`].
///
/// Must be called by every lane of the group; each lane copies its strided
/// share and returns without waiting for the others.
///
/// # Safety
/// `src` must be valid for `num_bytes` reads and `dst` for `num_bytes` writes
/// for the whole call on every lane. The regions must not overlap unless
/// `dst == src`.
pub unsafe fn copy_bytes<C: ExecutionContext>(
    ctx: &C,
    dst: *mut u8,
    src: *const u8,
    num_bytes: usize,
) {
    copy_bytes_with(ctx, CopyWidth::BUILD_DEFAULT, dst, src, num_bytes)
}

/// [`copy_bytes`] with an explicit width.
///
/// `CopyWidth::Byte` skips the alignment check and always copies bytes.
///
/// # Safety
/// Same contract as [`copy_bytes`].
pub unsafe fn copy_bytes_with<C: ExecutionContext>(
    ctx: &C,
    width: CopyWidth,
    dst: *mut u8,
    src: *const u8,
    num_bytes: usize,
) {
    if width == CopyWidth::Byte || !is_wide_aligned(dst) || !is_wide_aligned(src) {
        strided_copy(ctx, dst, src, num_bytes);
        return;
    }

    let wide_count = num_bytes / WIDE_WORD_SIZE;
    let remainder = num_bytes - wide_count * WIDE_WORD_SIZE;

    strided_copy(ctx, dst.cast::<u64>(), src.cast::<u64>(), wide_count);

    let tail = wide_count * WIDE_WORD_SIZE;
    strided_copy(ctx, dst.add(tail), src.add(tail), remainder);
}

/// Lane `i` copies elements `i, i + group_size, ...` of `[0, count)`.
#[inline]
unsafe fn strided_copy<C: ExecutionContext, T: Copy>(
    ctx: &C,
    dst: *mut T,
    src: *const T,
    count: usize,
) {
    let stride = ctx.group_size();
    let mut i = ctx.lane_index();
    while i < count {
        dst.add(i).write(src.add(i).read());
        i += stride;
    }
}
