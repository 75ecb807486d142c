//! Types shared across the crate

/// Index of a node in the octree tables.
pub type TreeNodeIndex = usize;

/// Cartesian triple, used for node centers and half-extents.
pub type Vec3<T> = [T; 3];

/// Error type for the checked octree entry points.
#[derive(thiserror::Error, Debug)]
pub enum OctreeError {
    /// A leaf array needs a lower and an upper bound at least.
    #[error("Leaf array needs at least two keys, found {0}")]
    TooFewKeys(usize),
    /// The first leaf key is not the origin of the curve.
    #[error("First leaf key must be 0, found {0}")]
    InvalidStart(u64),
    /// The last leaf key does not close the domain.
    #[error("Last leaf key must be the domain upper bound {expected}, found {found}")]
    InvalidEnd {
        /// Upper bound of the key range
        expected: u64,
        /// Key found at the end of the leaf array
        found: u64,
    },
    /// Two consecutive keys are equal or descending.
    #[error("Leaf keys not strictly ascending at index {0}")]
    NotAscending(usize),
    /// A leaf cell is not an octree node.
    #[error("Leaf cell {0} does not span a power of 8 keys")]
    NotPowerOfEight(usize),
    /// A leaf cell does not start on a multiple of its own size.
    #[error("Leaf cell {0} is not aligned to its size")]
    Misaligned(usize),
    /// A coordinate could not be encoded.
    #[error("Point {0:?} lies outside the domain")]
    PointOutsideDomain([f64; 3]),
    /// Building a rayon pool failed.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type
pub type Result<T> = std::result::Result<T, OctreeError>;
