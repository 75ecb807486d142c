//! Morton (Z-order) encoding and decoding.
//!
//! Bits are interleaved with x in the most significant position of each octal digit,
//! so the octant of a child is `4 * x + 2 * y + z`.
use crate::sfc::{SfcKey, SpaceFillingCurve};

/// Bit-interleaved Z-order curve.
#[derive(Clone, Copy, Debug, Default)]
pub struct Morton;

/// Spread the lower 21 bits of `value` so that they occupy every third bit.
fn expand_bits(value: u64) -> u64 {
    let mut x = value & 0x1fffff;
    x = (x | x << 32) & 0x001f_0000_0000_ffff;
    x = (x | x << 16) & 0x001f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}

/// Inverse of [expand_bits].
fn compact_bits(value: u64) -> u64 {
    let mut x = value & 0x1249_2492_4924_9249;
    x = (x ^ (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x ^ (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x ^ (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x ^ (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x ^ (x >> 32)) & 0x1fffff;
    x
}

/// Encode an anchor.
///
/// Returns the interleaved key of the finest cell at the given integer coordinates.
pub fn encode_anchor(anchor: &[u32; 3]) -> u64 {
    (expand_bits(anchor[0] as u64) << 2)
        | (expand_bits(anchor[1] as u64) << 1)
        | expand_bits(anchor[2] as u64)
}

/// Decode a given key.
///
/// Returns the anchor for the given interleaved key.
pub fn decode_key(key: u64) -> [u32; 3] {
    [
        compact_bits(key >> 2) as u32,
        compact_bits(key >> 1) as u32,
        compact_bits(key) as u32,
    ]
}

impl SpaceFillingCurve for Morton {
    fn encode<K: SfcKey>(anchor: [u32; 3]) -> K {
        debug_assert!(anchor.iter().all(|&c| c < (1 << K::MAX_TREE_LEVEL)));
        K::from_u64(encode_anchor(&anchor))
    }

    fn decode<K: SfcKey>(key: K) -> [u32; 3] {
        decode_key(key.as_u64())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bit_positions() {
        // z occupies bit 0, y bit 1 and x bit 2 of every digit
        for shift in 0..21 {
            let coord = 1u32 << shift;
            assert_eq!(encode_anchor(&[0, 0, coord]), 1 << (3 * shift));
            assert_eq!(encode_anchor(&[0, coord, 0]), 1 << (3 * shift + 1));
            assert_eq!(encode_anchor(&[coord, 0, 0]), 1 << (3 * shift + 2));
        }
    }

    #[test]
    fn test_encoding_decoding() {
        let anchor = [(1 << 21) - 1, (1 << 21) - 1, (1 << 21) - 1];
        assert_eq!(encode_anchor(&anchor), (1 << 63) - 1);
        assert_eq!(decode_key(encode_anchor(&anchor)), anchor);

        let anchor = [65535, 1, 1234567];
        assert_eq!(decode_key(encode_anchor(&anchor)), anchor);
    }

    #[test]
    fn test_octants() {
        // The first digit of a 32 bit key is the root octant
        let half = 1 << 9;
        let key: u32 = Morton::encode([half, 0, half]);
        assert_eq!(key >> 27, 0b101);

        let key: u32 = Morton::encode([0, half, 0]);
        assert_eq!(key >> 27, 0b010);
    }
}
