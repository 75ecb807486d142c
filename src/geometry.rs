//! Real valued node geometry.
use std::ops::Range;

use itertools::izip;
use num::Float;
use rayon::prelude::*;

use crate::{
    domain::Domain,
    octree::OctreeView,
    sfc::{node_ibox, IBox, NodePrefix, SfcKey, SpaceFillingCurve},
    types::{TreeNodeIndex, Vec3},
};

/// Center and half-extent of an integer box mapped into `domain`.
pub fn center_and_size<K: SfcKey, T: Float>(ibox: &IBox, domain: &Domain<T>) -> (Vec3<T>, Vec3<T>) {
    let two = T::one() + T::one();
    let max_coord = T::from(1u64 << K::MAX_TREE_LEVEL).unwrap_or_else(T::one);

    let mut center = [T::zero(); 3];
    let mut size = [T::zero(); 3];
    for (c, s, &lo, &hi, &o, &d) in izip!(
        &mut center,
        &mut size,
        &ibox.min,
        &ibox.max,
        &domain.origin,
        &domain.diameter
    ) {
        let half_unit = d / (two * max_coord);
        let lo = T::from(lo).unwrap_or_else(T::zero);
        let hi = T::from(hi).unwrap_or_else(T::zero);
        *c = o + (hi + lo) * half_unit;
        *s = (hi - lo) * half_unit;
    }

    (center, size)
}

/// Compute the center and half-extent of every node.
///
/// # Arguments
/// * `prefixes` - Node prefixes.
/// * `centers` - Output center of each node.
/// * `sizes` - Output half-extent of each node.
/// * `domain` - Bounding box the keys were computed in.
pub fn node_fp_centers<C: SpaceFillingCurve, K: SfcKey, T: Float + Send + Sync>(
    prefixes: &[NodePrefix<K>],
    centers: &mut [Vec3<T>],
    sizes: &mut [Vec3<T>],
    domain: &Domain<T>,
) {
    assert!(centers.len() >= prefixes.len() && sizes.len() >= prefixes.len());

    prefixes
        .par_iter()
        .zip(centers.par_iter_mut())
        .zip(sizes.par_iter_mut())
        .for_each(|((prefix, center), size)| {
            let ibox = node_ibox::<C, K>(prefix.key(), prefix.level());
            (*center, *size) = center_and_size::<K, T>(&ibox, domain);
        });
}

/// Node centers and half-extents of an octree.
#[derive(Clone, Debug, Default)]
pub struct OctreeGeometry<T: Float> {
    /// Center of each node.
    pub centers: Vec<Vec3<T>>,
    /// Half-extent of each node.
    pub sizes: Vec<Vec3<T>>,
}

impl<T: Float + Send + Sync> OctreeGeometry<T> {
    /// Geometry of all nodes of `octree`.
    pub fn new<C: SpaceFillingCurve, K: SfcKey>(octree: &OctreeView<'_, K>, domain: &Domain<T>) -> Self {
        let mut geometry = OctreeGeometry {
            centers: Vec::new(),
            sizes: Vec::new(),
        };
        geometry.update::<C, K>(octree, domain);
        geometry
    }

    /// Recompute after the octree was rebuilt.
    pub fn update<C: SpaceFillingCurve, K: SfcKey>(
        &mut self,
        octree: &OctreeView<'_, K>,
        domain: &Domain<T>,
    ) {
        let num_nodes = octree.num_nodes;
        self.centers.resize(num_nodes, [T::zero(); 3]);
        self.sizes.resize(num_nodes, [T::zero(); 3]);
        node_fp_centers::<C, K, T>(
            &octree.prefixes[..num_nodes],
            &mut self.centers,
            &mut self.sizes,
            domain,
        );
    }
}

/// Octree data needed by a traversal, together with node geometry.
#[derive(Clone, Copy, Debug)]
pub struct OctreeNsView<'a, T: Float> {
    /// Center of each node.
    pub centers: &'a [Vec3<T>],
    /// Half-extent of each node.
    pub sizes: &'a [Vec3<T>],
    /// First child of each node, 0 for leaves.
    pub child_offsets: &'a [TreeNodeIndex],
    /// Leaf index of each node, negative for internal nodes.
    pub internal_to_leaf: &'a [isize],
    /// First particle of each leaf, one more entry than leaves.
    pub layout: &'a [usize],
}

impl<'a, T: Float> OctreeNsView<'a, T> {
    /// Combine an octree, its geometry and a particle layout from
    /// [compute_leaf_layout](crate::octree::compute_leaf_layout).
    pub fn new<K: SfcKey>(
        octree: &OctreeView<'a, K>,
        geometry: &'a OctreeGeometry<T>,
        layout: &'a [usize],
    ) -> Self {
        assert_eq!(layout.len(), octree.num_leaf_nodes + 1);
        OctreeNsView {
            centers: &geometry.centers,
            sizes: &geometry.sizes,
            child_offsets: octree.child_offsets,
            internal_to_leaf: octree.internal_to_leaf,
            layout,
        }
    }

    /// Whether node `i` has no children.
    pub fn is_leaf(&self, i: TreeNodeIndex) -> bool {
        self.child_offsets[i] == 0
    }

    /// Index of node `i` in the leaf array, `None` for internal nodes.
    pub fn leaf_index(&self, i: TreeNodeIndex) -> Option<usize> {
        usize::try_from(self.internal_to_leaf[i]).ok()
    }

    /// Particles in leaf node `i`, `None` for internal nodes.
    pub fn particles(&self, i: TreeNodeIndex) -> Option<Range<usize>> {
        self.leaf_index(i)
            .map(|leaf| self.layout[leaf]..self.layout[leaf + 1])
    }
}
