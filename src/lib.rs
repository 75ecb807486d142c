//! # Cornerstone octrees in Rust
//!
//! Fully linked octrees derived from a cornerstone leaf array: a sorted array of
//! space-filling-curve keys that partitions a cubic domain into octree leaves. The tree
//! is built in a single parallel pass without recursion: internal nodes are placed by a
//! closed form index map, sorted by level, and linked by binary search within each level.
//!
//! ```
//! use cstone::{helpers::uniform_leaves, octree::OctreeData};
//!
//! let leaves = uniform_leaves::<u64>(1);
//! let mut octree = OctreeData::<u64>::new();
//! octree.update(&leaves).unwrap();
//!
//! let view = octree.data();
//! assert_eq!(view.num_nodes(), 9);
//! assert_eq!(view.children(0), Some(1..9));
//! ```
//!
//! ## References
//! \[1\] Keller, S., et al. "Cornerstone: Octree construction algorithms for scalable particle
//! simulations." Proceedings of the Platform for Advanced Scientific Computing Conference (2023).
//!
//! \[2\] Warren, M. S., and Salmon, J. K. "A parallel hashed oct-tree N-body algorithm."
//! Proceedings of the ACM/IEEE Conference on Supercomputing (1993).
//!
//! \[3\] Karras, T. "Maximizing parallelism in the construction of BVHs, octrees, and k-d trees."
//! Proceedings of High-Performance Graphics (2012).
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod domain;
pub mod geometry;
pub mod helpers;
pub mod octree;
pub mod sfc;
pub mod storage;
pub mod threads;
pub mod types;
