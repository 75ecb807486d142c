//! 3D Hilbert curve.
//!
//! Uses the transpose formulation of J. Skilling, "Programming the Hilbert curve",
//! AIP Conf. Proc. 707 (2004). The transposed coordinates are interleaved with the
//! Morton bit layout to form the key, so each octal digit again selects one octant and
//! every aligned run of `8^k` keys covers a cube.
use crate::sfc::{
    morton::{decode_key, encode_anchor},
    SfcKey, SpaceFillingCurve,
};

/// Hilbert curve on the integer grid of side `2^MAX_TREE_LEVEL`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Hilbert;

/// Axes to transposed Hilbert index, `bits` bits per coordinate.
fn axes_to_transpose(x: &mut [u32; 3], bits: u32) {
    let m = 1u32 << (bits - 1);

    // Inverse undo
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..3 {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode
    for i in 1..3 {
        x[i] ^= x[i - 1];
    }
    let mut t = 0;
    let mut q = m;
    while q > 1 {
        if x[2] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for xi in x.iter_mut() {
        *xi ^= t;
    }
}

/// Transposed Hilbert index to axes, `bits` bits per coordinate.
fn transpose_to_axes(x: &mut [u32; 3], bits: u32) {
    let n = 2u32 << (bits - 1);

    // Gray decode
    let t = x[2] >> 1;
    for i in (1..3).rev() {
        x[i] ^= x[i - 1];
    }
    x[0] ^= t;

    // Undo excess work
    let mut q = 2;
    while q != n {
        let p = q - 1;
        for i in (0..3).rev() {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q <<= 1;
    }
}

impl SpaceFillingCurve for Hilbert {
    fn encode<K: SfcKey>(anchor: [u32; 3]) -> K {
        debug_assert!(anchor.iter().all(|&c| c < (1 << K::MAX_TREE_LEVEL)));
        let mut x = anchor;
        axes_to_transpose(&mut x, K::MAX_TREE_LEVEL);
        K::from_u64(encode_anchor(&x))
    }

    fn decode<K: SfcKey>(key: K) -> [u32; 3] {
        let mut x = decode_key(key.as_u64());
        transpose_to_axes(&mut x, K::MAX_TREE_LEVEL);
        x
    }
}
