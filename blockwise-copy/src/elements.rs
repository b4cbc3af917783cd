//! Typed element ranges and the group-cooperative element copy.
//!
//! [`Source`] and [`Sink`] are the random-access views device code reads and
//! writes through. Each view type states at compile time whether it is
//! *trivial*: its items are `bytemuck::Pod` and it addresses contiguous
//! memory. [`copy_elements`] picks its path from those constants, so the
//! choice is fixed per instantiation and the other branch is compiled out.

use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ops::Range;

use blockwise_exec::{ExecutionContext, SendPtr};
use bytemuck::Pod;

use crate::bytes::{copy_bytes_with, CopyWidth};

/// Random-access input readable concurrently by all lanes.
///
/// # Safety
/// When `TRIVIAL` is `true`, `Item` must be `Pod` and `byte_ptr()` must point
/// at `len()` contiguous, initialized items laid out as `[Item]`.
pub unsafe trait Source: Sync {
    type Item;

    /// Items are `Pod` and stored contiguously at [`byte_ptr`](Self::byte_ptr).
    const TRIVIAL: bool = false;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read item `index`.
    ///
    /// # Safety
    /// `index < self.len()`, and no lane may be writing the same item.
    unsafe fn read(&self, index: usize) -> Self::Item;

    /// Address of the first item. Only meaningful for trivial views.
    fn byte_ptr(&self) -> *const u8 {
        std::ptr::null()
    }
}

/// Random-access output writable concurrently by all lanes at distinct indices.
///
/// # Safety
/// When `TRIVIAL` is `true`, `Item` must be `Pod` and `byte_ptr_mut()` must
/// point at `len()` contiguous writable items laid out as `[Item]`.
pub unsafe trait Sink: Sync {
    type Item;

    /// Items are `Pod` and stored contiguously at [`byte_ptr_mut`](Self::byte_ptr_mut).
    const TRIVIAL: bool = false;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `value` at `index`.
    ///
    /// # Safety
    /// `index < self.len()`, and no other lane may access the same index
    /// during the launch.
    unsafe fn write(&self, index: usize, value: Self::Item);

    /// Address of the first item. Only meaningful for trivial views.
    fn byte_ptr_mut(&self) -> *mut u8 {
        std::ptr::null_mut()
    }
}

unsafe impl<S: Source + ?Sized> Source for &S {
    type Item = S::Item;
    const TRIVIAL: bool = S::TRIVIAL;

    fn len(&self) -> usize {
        (**self).len()
    }

    unsafe fn read(&self, index: usize) -> S::Item {
        (**self).read(index)
    }

    fn byte_ptr(&self) -> *const u8 {
        (**self).byte_ptr()
    }
}

unsafe impl<D: Sink + ?Sized> Sink for &D {
    type Item = D::Item;
    const TRIVIAL: bool = D::TRIVIAL;

    fn len(&self) -> usize {
        (**self).len()
    }

    unsafe fn write(&self, index: usize, value: D::Item) {
        (**self).write(index, value)
    }

    fn byte_ptr_mut(&self) -> *mut u8 {
        (**self).byte_ptr_mut()
    }
}

// ---------------------------------------------------------------------------
// Trivial views
// ---------------------------------------------------------------------------

/// Contiguous `Pod` input.
#[derive(Clone, Copy, Debug)]
pub struct PodSlice<'a, T> {
    data: &'a [T],
}

impl<'a, T: Pod> PodSlice<'a, T> {
    pub fn new(data: &'a [T]) -> Self {
        Self { data }
    }
}

unsafe impl<T: Pod + Sync> Source for PodSlice<'_, T> {
    type Item = T;
    const TRIVIAL: bool = true;

    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.data.len());
        *self.data.get_unchecked(index)
    }

    fn byte_ptr(&self) -> *const u8 {
        self.data.as_ptr().cast()
    }
}

/// Contiguous `Pod` output.
#[derive(Debug)]
pub struct PodSliceMut<'a, T> {
    ptr: SendPtr<T>,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<'a, T: Pod> PodSliceMut<'a, T> {
    pub fn new(data: &'a mut [T]) -> Self {
        Self {
            ptr: SendPtr::new(data.as_mut_ptr()),
            len: data.len(),
            _marker: PhantomData,
        }
    }
}

unsafe impl<T: Pod + Send + Sync> Sink for PodSliceMut<'_, T> {
    type Item = T;
    const TRIVIAL: bool = true;

    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.len);
        self.ptr.as_ptr().add(index).write(value);
    }

    fn byte_ptr_mut(&self) -> *mut u8 {
        self.ptr.as_ptr().cast()
    }
}

// ---------------------------------------------------------------------------
// Element-wise views
// ---------------------------------------------------------------------------

/// Input yielding clones of its items.
#[derive(Clone, Copy, Debug)]
pub struct ElemSlice<'a, T> {
    data: &'a [T],
}

impl<'a, T: Clone> ElemSlice<'a, T> {
    pub fn new(data: &'a [T]) -> Self {
        Self { data }
    }
}

unsafe impl<T: Clone + Sync> Source for ElemSlice<'_, T> {
    type Item = T;

    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.data.len());
        self.data.get_unchecked(index).clone()
    }
}

/// Input yielding references to its items.
#[derive(Clone, Copy, Debug)]
pub struct RefSlice<'a, T> {
    data: &'a [T],
}

impl<'a, T> RefSlice<'a, T> {
    pub fn new(data: &'a [T]) -> Self {
        Self { data }
    }
}

unsafe impl<'a, T: Sync> Source for RefSlice<'a, T> {
    type Item = &'a T;

    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    unsafe fn read(&self, index: usize) -> &'a T {
        debug_assert!(index < self.data.len());
        self.data.get_unchecked(index)
    }
}

/// Output over initialized items; a write drops the item it replaces.
#[derive(Debug)]
pub struct ElemSliceMut<'a, T> {
    ptr: SendPtr<T>,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<'a, T> ElemSliceMut<'a, T> {
    pub fn new(data: &'a mut [T]) -> Self {
        Self {
            ptr: SendPtr::new(data.as_mut_ptr()),
            len: data.len(),
            _marker: PhantomData,
        }
    }
}

unsafe impl<T: Send + Sync> Sink for ElemSliceMut<'_, T> {
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.len);
        *self.ptr.as_ptr().add(index) = value;
    }
}

/// Output over uninitialized slots; a write initializes the slot without
/// reading or dropping it.
#[derive(Debug)]
pub struct UninitSliceMut<'a, T> {
    ptr: SendPtr<MaybeUninit<T>>,
    len: usize,
    _marker: PhantomData<&'a mut [MaybeUninit<T>]>,
}

impl<'a, T> UninitSliceMut<'a, T> {
    pub fn new(data: &'a mut [MaybeUninit<T>]) -> Self {
        Self {
            ptr: SendPtr::new(data.as_mut_ptr()),
            len: data.len(),
            _marker: PhantomData,
        }
    }
}

unsafe impl<T: Send + Sync> Sink for UninitSliceMut<'_, T> {
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.len);
        (*self.ptr.as_ptr().add(index)).write(value);
    }
}

// ---------------------------------------------------------------------------
// Adaptors
// ---------------------------------------------------------------------------

/// Input applying `f` to every item read from `source`.
#[derive(Clone, Copy, Debug)]
pub struct Mapped<S, F> {
    source: S,
    f: F,
}

impl<S, F> Mapped<S, F> {
    pub fn new(source: S, f: F) -> Self {
        Self { source, f }
    }
}

unsafe impl<S, F, U> Source for Mapped<S, F>
where
    S: Source,
    F: Fn(S::Item) -> U + Sync,
{
    type Item = U;

    fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    unsafe fn read(&self, index: usize) -> U {
        (self.f)(self.source.read(index))
    }
}

// ---------------------------------------------------------------------------
// Element copy
// ---------------------------------------------------------------------------

/// Copy `src[range]` to `dst[result..]`, all lanes of the group cooperating.
///
/// Returns `result + range.len()`. Trivial views delegate to
/// [`copy_bytes`](crate::copy_bytes); any other pair is copied element by
/// element, lane `i` taking positions `i, i + group_size, ...`.
///
/// # Safety
/// `range.start <= range.end <= src.len()` and
/// `result + range.len() <= dst.len()`. The source and destination items
/// must not overlap, and no other code may touch the destination range
/// during the call.
pub unsafe fn copy_elements<C, S, D>(
    ctx: &C,
    src: &S,
    range: Range<usize>,
    dst: &D,
    result: usize,
) -> usize
where
    C: ExecutionContext,
    S: Source,
    D: Sink<Item = S::Item>,
{
    copy_elements_with(ctx, CopyWidth::BUILD_DEFAULT, src, range, dst, result)
}

/// [`copy_elements`] with an explicit width for the trivial path.
///
/// # Safety
/// Same contract as [`copy_elements`].
pub unsafe fn copy_elements_with<C, S, D>(
    ctx: &C,
    width: CopyWidth,
    src: &S,
    range: Range<usize>,
    dst: &D,
    result: usize,
) -> usize
where
    C: ExecutionContext,
    S: Source,
    D: Sink<Item = S::Item>,
{
    let n = range.end - range.start;

    if S::TRIVIAL && D::TRIVIAL {
        let size = mem::size_of::<S::Item>();
        copy_bytes_with(
            ctx,
            width,
            dst.byte_ptr_mut().add(result * size),
            src.byte_ptr().add(range.start * size),
            n * size,
        );
    } else {
        let stride = ctx.group_size();
        let mut i = ctx.lane_index();
        while i < n {
            dst.write(result + i, src.read(range.start + i));
            i += stride;
        }
    }

    result + n
}
