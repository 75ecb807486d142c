//! Space-filling-curve keys with Warren-Salmon placeholder bits.
//!
//! A key of type `K` holds up to `K::MAX_TREE_LEVEL` octal digits, one per subdivision
//! level, with the root digit in the most significant position. Leaf arrays use the
//! plain keys. Tree nodes store a *prefix*: the digits of the node shifted down to the
//! low bits, with a single marker bit placed directly above them, so that the number of
//! digits (and hence the level) can be recovered from the key alone. Sorting prefixes as
//! integers orders nodes by level first, then along the curve.
use std::{fmt::Debug, hash::Hash};

use itertools::izip;
use num::{Float, PrimInt, Unsigned};
use rayon::prelude::*;

use crate::{
    domain::Domain,
    types::{OctreeError, Result},
};

pub mod hilbert;
pub mod morton;

pub use hilbert::Hilbert;
pub use morton::Morton;

/// Unsigned integer usable as an SFC key.
pub trait SfcKey: PrimInt + Unsigned + Hash + Debug + Default + Send + Sync + 'static {
    /// Width of the integer in bits.
    const BITS: u32;

    /// Number of octal digits, i.e. the deepest subdivision level.
    const MAX_TREE_LEVEL: u32;

    /// Leading bits not used by any digit.
    const UNUSED_BITS: u32 = Self::BITS - 3 * Self::MAX_TREE_LEVEL;

    /// Widen to 64 bits.
    fn as_u64(self) -> u64;

    /// Truncate from 64 bits.
    fn from_u64(value: u64) -> Self;
}

macro_rules! impl_sfc_key {
    ($key:ty, $max_level:expr) => {
        impl SfcKey for $key {
            const BITS: u32 = <$key>::BITS;
            const MAX_TREE_LEVEL: u32 = $max_level;

            fn as_u64(self) -> u64 {
                self as u64
            }

            fn from_u64(value: u64) -> Self {
                value as $key
            }
        }
    };
}

impl_sfc_key!(u32, 10);
impl_sfc_key!(u64, 21);

/// Number of keys spanned by a node at `level`.
pub fn node_range<K: SfcKey>(level: u32) -> K {
    debug_assert!(level <= K::MAX_TREE_LEVEL);
    K::one() << (3 * (K::MAX_TREE_LEVEL - level)) as usize
}

/// Exclusive upper bound of the key range, the last entry of every leaf array.
pub fn upper_bound<K: SfcKey>() -> K {
    node_range(0)
}

/// Whether `n` is 8^k for some k >= 0.
pub fn is_power_of_8<K: SfcKey>(n: K) -> bool {
    n.count_ones() == 1 && n.trailing_zeros() % 3 == 0
}

/// Level of a node spanning `range` keys, `range` must be a power of 8.
pub fn tree_level<K: SfcKey>(range: K) -> u32 {
    debug_assert!(is_power_of_8(range));
    ((range - K::one()).leading_zeros() - K::UNUSED_BITS) / 3
}

/// Octal digit of `key` at `position`, where position 1 is the root subdivision.
pub fn octal_digit<K: SfcKey>(key: K, position: u32) -> u32 {
    debug_assert!(position >= 1 && position <= K::MAX_TREE_LEVEL);
    let shifted = key >> (3 * (K::MAX_TREE_LEVEL - position)) as usize;
    (shifted & K::from_u64(7)).as_u64() as u32
}

/// Number of leading digit bits shared by two keys.
///
/// The upper bound key has its only bit above the digit range, pairs involving it
/// report 0.
pub fn common_prefix<K: SfcKey>(a: K, b: K) -> u32 {
    (a ^ b).leading_zeros().saturating_sub(K::UNUSED_BITS)
}

/// Truncate `key` to its first `prefix_length` bits and add the placeholder bit.
pub fn encode_placeholder_bit<K: SfcKey>(key: K, prefix_length: u32) -> K {
    debug_assert!(prefix_length <= 3 * K::MAX_TREE_LEVEL);
    let shifts = 3 * K::MAX_TREE_LEVEL - prefix_length;
    (key >> shifts as usize) | (K::one() << prefix_length as usize)
}

/// Number of digit bits stored below the placeholder bit.
pub fn decode_prefix_length<K: SfcKey>(code: K) -> u32 {
    debug_assert!(code != K::zero());
    K::BITS - 1 - code.leading_zeros()
}

/// Recover the plain key, the first key of the node, from a prefix.
pub fn decode_placeholder_bit<K: SfcKey>(code: K) -> K {
    let prefix_length = decode_prefix_length(code);
    let digits = code ^ (K::one() << prefix_length as usize);
    digits << (3 * K::MAX_TREE_LEVEL - prefix_length) as usize
}

/// A node identity: plain key and level packed into one placeholder-encoded integer.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePrefix<K: SfcKey>(K);

impl<K: SfcKey> NodePrefix<K> {
    /// Encode the node with first key `key` and `prefix_length` significant bits.
    pub fn encode(key: K, prefix_length: u32) -> Self {
        NodePrefix(encode_placeholder_bit(key, prefix_length))
    }

    /// The node covering the whole domain.
    pub fn root() -> Self {
        Self::encode(K::zero(), 0)
    }

    /// The smallest prefix at `level`.
    pub fn level_start(level: u32) -> Self {
        Self::encode(K::zero(), 3 * level)
    }

    /// Wrap an already encoded prefix.
    pub fn from_raw(raw: K) -> Self {
        NodePrefix(raw)
    }

    /// The encoded integer.
    pub fn raw(&self) -> K {
        self.0
    }

    /// First key of the node.
    pub fn key(&self) -> K {
        decode_placeholder_bit(self.0)
    }

    /// Number of significant bits, three per level.
    pub fn prefix_length(&self) -> u32 {
        decode_prefix_length(self.0)
    }

    /// Subdivision level.
    pub fn level(&self) -> u32 {
        self.prefix_length() / 3
    }

    /// First key past the end of the node.
    pub fn end_key(&self) -> K {
        self.key() + node_range(self.level())
    }

    /// The child in octant 0.
    pub fn first_child(&self) -> Self {
        debug_assert!(self.level() < K::MAX_TREE_LEVEL);
        Self::encode(self.key(), self.prefix_length() + 3)
    }
}

/// Integer box on the grid of side `2^MAX_TREE_LEVEL`, upper bounds exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IBox {
    /// Lower corner.
    pub min: [u32; 3],
    /// Upper corner.
    pub max: [u32; 3],
}

impl IBox {
    /// Create a box from its corners.
    pub fn new(min: [u32; 3], max: [u32; 3]) -> Self {
        IBox { min, max }
    }

    /// Edge lengths.
    pub fn extent(&self) -> [u32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Whether `other` lies inside this box, faces included.
    pub fn contains(&self, other: &IBox) -> bool {
        izip!(&self.min, &self.max, &other.min, &other.max)
            .all(|(&lo, &hi, &olo, &ohi)| lo <= olo && ohi <= hi)
    }
}

/// Mapping between keys and integer grid coordinates.
pub trait SpaceFillingCurve: Send + Sync + 'static {
    /// Key of the finest cell with anchor `anchor`.
    fn encode<K: SfcKey>(anchor: [u32; 3]) -> K;

    /// Anchor of the finest cell with key `key`.
    fn decode<K: SfcKey>(key: K) -> [u32; 3];
}

/// Integer box of the node with first key `start_key` at `level`.
pub fn node_ibox<C: SpaceFillingCurve, K: SfcKey>(start_key: K, level: u32) -> IBox {
    let length = 1u32 << (K::MAX_TREE_LEVEL - level);
    let mask = !(length - 1);
    let anchor = C::decode(start_key).map(|c| c & mask);
    IBox::new(anchor, anchor.map(|c| c + length))
}

/// Key of the finest cell enclosing `point`.
///
/// Points on the upper faces of the domain are assigned to the last cell along that axis.
pub fn point_to_key<C: SpaceFillingCurve, K: SfcKey, T: Float>(
    point: &[T; 3],
    domain: &Domain<T>,
) -> Result<K> {
    let contained = izip!(point, &domain.origin, &domain.diameter)
        .all(|(&p, &o, &d)| o <= p && p <= o + d);

    if !contained {
        return Err(OctreeError::PointOutsideDomain(
            point.map(|p| p.to_f64().unwrap_or(f64::NAN)),
        ));
    }

    let max_coord = 1u32 << K::MAX_TREE_LEVEL;
    let scale = T::from(max_coord).unwrap_or_else(T::one);
    let mut anchor = [0u32; 3];
    for (a, &p, &o, &d) in izip!(&mut anchor, point, &domain.origin, &domain.diameter) {
        let c = ((p - o) / d * scale).floor().to_u32().unwrap_or(0);
        *a = c.min(max_coord - 1);
    }

    Ok(C::encode(anchor))
}

/// Keys of the finest cells enclosing each point.
pub fn compute_sfc_keys<C: SpaceFillingCurve, K: SfcKey, T: Float + Send + Sync>(
    points: &[[T; 3]],
    keys: &mut [K],
    domain: &Domain<T>,
) -> Result<()> {
    assert_eq!(points.len(), keys.len());
    points
        .par_iter()
        .zip(keys.par_iter_mut())
        .try_for_each(|(point, key)| {
            *key = point_to_key::<C, K, T>(point, domain)?;
            Ok(())
        })
}
