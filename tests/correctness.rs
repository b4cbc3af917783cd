use blockwise::{
    copy_if, copy_if_into, copy_if_stencil, copy_if_with, copy_into_with, CopyWidth, Device,
    ElemSlice, ElemSliceMut, Error, LaunchError, PodSlice, PodSliceMut, RefSlice, UninitSliceMut,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

fn device(group_size: usize, max_groups: usize) -> Device {
    Device::new()
        .with_group_size(group_size)
        .with_max_groups(max_groups)
}

fn reference<T: Clone>(input: &[T], stencil: &[bool]) -> Vec<T> {
    input
        .iter()
        .zip(stencil)
        .filter(|(_, keep)| **keep)
        .map(|(x, _)| x.clone())
        .collect()
}

fn random_case(len: usize, density: f64, seed: u64) -> (Vec<u64>, Vec<bool>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let input = (0..len).map(|_| rng.gen()).collect();
    let stencil = (0..len).map(|_| rng.gen_bool(density)).collect();
    (input, stencil)
}

fn compact(device: &Device, input: &[u64], stencil: &[bool]) -> (Vec<u64>, usize) {
    let mut output = vec![0u64; input.len()];
    let n = copy_if_with(
        device,
        &PodSlice::new(input),
        &RefSlice::new(stencil),
        &PodSliceMut::new(&mut output),
        |keep| *keep,
    )
    .unwrap();
    (output, n)
}

// ---------------------------------------------------------------------------
// Stream compaction
// ---------------------------------------------------------------------------

#[test]
fn test_random_compaction_matches_filter() {
    let shapes = [(32, 1), (32, 4), (64, 8), (100, 3)];
    for (seed, len) in [0usize, 1, 31, 32, 33, 255, 1000, 4099].into_iter().enumerate() {
        for &(group_size, max_groups) in &shapes {
            for density in [0.0, 0.1, 0.5, 1.0] {
                let (input, stencil) = random_case(len, density, seed as u64);
                let (output, n) = compact(&device(group_size, max_groups), &input, &stencil);
                let expected = reference(&input, &stencil);
                assert_eq!(
                    &output[..n],
                    expected.as_slice(),
                    "len={len} group_size={group_size} max_groups={max_groups} density={density}"
                );
            }
        }
    }
}

#[test]
fn test_rerun_is_idempotent() {
    let (input, stencil) = random_case(777, 0.3, 11);
    let device = device(32, 4);
    let (first, n1) = compact(&device, &input, &stencil);
    let (second, n2) = compact(&device, &input, &stencil);
    assert_eq!(n1, n2);
    assert_eq!(first, second);
}

#[test]
fn test_count_only_touches_prefix() {
    let (input, stencil) = random_case(300, 0.5, 5);
    let mut output = vec![u64::MAX; 400];
    let n = copy_if_with(
        &device(32, 4),
        &PodSlice::new(&input),
        &RefSlice::new(&stencil),
        &PodSliceMut::new(&mut output),
        |keep| *keep,
    )
    .unwrap();
    assert_eq!(n, stencil.iter().filter(|&&k| k).count());
    assert!(output[n..].iter().all(|&x| x == u64::MAX));
}

#[test]
fn test_stencil_predicate_on_values() {
    let input: Vec<i64> = (0..500).collect();
    let stencil: Vec<i64> = input.iter().map(|x| x * x % 17).collect();
    let mut output = vec![0; 500];
    let n = copy_if_stencil(&input, &stencil, &mut output, |s| *s < 4).unwrap();
    let expected: Vec<i64> = input.iter().copied().filter(|x| x * x % 17 < 4).collect();
    assert_eq!(&output[..n], expected.as_slice());
}

#[test]
fn test_longer_stencil_is_accepted() {
    let mut output = [0; 3];
    let n = copy_if_stencil(&[1, 2, 3], &[true, true, false, true], &mut output, |s| *s).unwrap();
    assert_eq!(&output[..n], &[1, 2]);
}

#[test]
fn test_non_pod_compaction() {
    let words: Vec<String> = (0..300).map(|i| format!("w{i}")).collect();
    let keep: Vec<bool> = (0..300).map(|i| i % 3 != 1).collect();

    let collected = copy_if_into(&words, &keep, |k| *k).unwrap();
    assert_eq!(collected, reference(&words, &keep));

    let mut output = vec![String::new(); 300];
    let n = copy_if(&words, &mut output, |w| w.ends_with('7')).unwrap();
    let expected: Vec<String> = words.iter().filter(|w| w.ends_with('7')).cloned().collect();
    assert_eq!(&output[..n], expected.as_slice());
}

#[test]
fn test_into_uninit_output() {
    let (input, stencil) = random_case(129, 0.5, 3);
    let mut output: Vec<MaybeUninit<u64>> = vec![MaybeUninit::uninit(); 129];
    let n = copy_if_with(
        &device(16, 2),
        &ElemSlice::new(&input),
        &RefSlice::new(&stencil),
        &UninitSliceMut::new(&mut output),
        |keep| *keep,
    )
    .unwrap();
    let written: Vec<u64> = output[..n]
        .iter()
        .map(|slot| unsafe { slot.assume_init() })
        .collect();
    assert_eq!(written, reference(&input, &stencil));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Clones fine unless it holds the poisoned value.
#[derive(Debug, PartialEq)]
struct Fragile(u32);

impl Clone for Fragile {
    fn clone(&self) -> Self {
        if self.0 == 13 {
            panic!("cannot clone 13");
        }
        Fragile(self.0)
    }
}

#[test]
fn test_lane_panic_fails_launch() {
    let input: Vec<Fragile> = (0..40).map(Fragile).collect();
    let stencil = vec![true; 40];
    let mut output: Vec<Fragile> = (0..40).map(|_| Fragile(0)).collect();

    let err = copy_if_with(
        &device(8, 2),
        &ElemSlice::new(&input),
        &RefSlice::new(&stencil),
        &ElemSliceMut::new(&mut output),
        |keep| *keep,
    )
    .unwrap_err();

    match err {
        Error::Launch(LaunchError::LanePanicked {
            group,
            lane,
            message,
        }) => {
            // 40 elements, one 32-element grain per group: element 13 is in
            // group 0, chunk 1, lane 5.
            assert_eq!((group, lane), (0, 5));
            assert_eq!(message, "cannot clone 13");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_changing_predicate_cannot_overrun_output() {
    let input: Vec<u32> = (1..=64).collect();
    let mut buffer = vec![0u32; 8];
    let calls = AtomicUsize::new(0);

    let (output, rest) = buffer.split_at_mut(1);
    let n = copy_if(&input, output, |_| calls.fetch_add(1, Ordering::SeqCst) >= 64).unwrap();

    assert_eq!(n, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 64);
    assert!(rest.iter().all(|&x| x == 0));
}

#[test]
fn test_group_size_over_limit() {
    let input = [1u32; 4];
    let mut output = [0u32; 4];
    let err = copy_if_with(
        &device(blockwise::MAX_GROUP_SIZE + 1, 1),
        &PodSlice::new(&input),
        &PodSlice::new(&input),
        &PodSliceMut::new(&mut output),
        |v| v != 0,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Launch(LaunchError::InvalidConfig { groups: 1, .. })
    ));
}

// ---------------------------------------------------------------------------
// Device-wide copy
// ---------------------------------------------------------------------------

#[test]
fn test_copy_fidelity_across_widths_and_offsets() {
    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<u8> = (0..2048).map(|_| rng.gen()).collect();

    for width in [CopyWidth::Wide, CopyWidth::Byte] {
        let device = device(32, 4).with_copy_width(width);
        for (src_off, dst_off, len) in [(0, 0, 1024), (1, 0, 1000), (0, 3, 1001), (5, 5, 7)] {
            let src = &data[src_off..src_off + len];
            let mut buf = vec![0u8; len + dst_off];
            let n = copy_into_with(
                &device,
                &PodSlice::new(src),
                &PodSliceMut::new(&mut buf[dst_off..]),
            )
            .unwrap();
            assert_eq!(n, len);
            assert_eq!(&buf[dst_off..], src, "{width:?} src+{src_off} dst+{dst_off}");
            assert!(buf[..dst_off].iter().all(|&b| b == 0));
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_compaction_preserves_order(
        input in prop::collection::vec(any::<u32>(), 0..600),
        group_size in 1usize..48,
        max_groups in 1usize..6,
        modulus in 1u32..5,
    ) {
        let device = device(group_size, max_groups);
        let mut output = vec![0u32; input.len()];
        let n = copy_if_with(
            &device,
            &PodSlice::new(&input),
            &PodSlice::new(&input),
            &PodSliceMut::new(&mut output),
            |v| v % modulus == 0,
        )
        .unwrap();

        let expected: Vec<u32> = input.iter().copied().filter(|v| v % modulus == 0).collect();
        prop_assert_eq!(n, expected.len());
        prop_assert_eq!(&output[..n], expected.as_slice());
    }

    #[test]
    fn prop_copy_matches_source(
        data in prop::collection::vec(any::<u16>(), 0..900),
        group_size in 1usize..40,
        byte_width in any::<bool>(),
    ) {
        let width = if byte_width { CopyWidth::Byte } else { CopyWidth::Wide };
        let device = device(group_size, 3).with_copy_width(width);
        let mut dest = vec![0u16; data.len()];
        copy_into_with(&device, &PodSlice::new(&data), &PodSliceMut::new(&mut dest)).unwrap();
        prop_assert_eq!(dest, data);
    }
}
