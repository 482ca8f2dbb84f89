use crate::compress::cityhash::{hash128, hash128_seeded};

// Every code path has its own length band: empty, <4, <8, 8..16, 16..128
// (murmur), and the unrolled >=128 loop with 0..3 trailing 32-byte chunks.
const BOUNDARY_LENS: &[usize] = &[
    0, 1, 3, 4, 7, 8, 9, 15, 16, 17, 31, 32, 47, 48, 63, 64, 127, 128, 129, 160, 192, 255, 256,
    1024,
];

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(7)).collect()
}

#[test]
fn deterministic_across_calls() {
    for &len in BOUNDARY_LENS {
        let data = sample(len);
        assert_eq!(hash128(&data), hash128(&data), "len {len}");
    }
}

#[test]
fn distinct_across_lengths() {
    let mut seen = std::collections::HashSet::new();
    for &len in BOUNDARY_LENS {
        assert!(seen.insert(hash128(&sample(len))), "collision at len {len}");
    }
}

#[test]
fn single_byte_flip_changes_both_halves() {
    for &len in &[9usize, 17, 64, 129, 300] {
        let data = sample(len);
        let (lo, hi) = hash128(&data);
        for pos in [0, len / 2, len - 1] {
            let mut corrupted = data.clone();
            corrupted[pos] ^= 0x01;
            let (clo, chi) = hash128(&corrupted);
            assert_ne!((lo, hi), (clo, chi), "len {len} pos {pos}");
        }
    }
}

#[test]
fn seed_changes_result() {
    let data = sample(200);
    let a = hash128_seeded(&data, (1, 2));
    let b = hash128_seeded(&data, (2, 1));
    assert_ne!(a, b);
    assert_ne!(a, hash128(&data));
}

#[test]
fn empty_input_is_stable() {
    let first = hash128(b"");
    assert_eq!(first, hash128(b""));
    assert_ne!(first, (0, 0));
}
