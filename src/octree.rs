//! Fully linked octree built from a cornerstone leaf array.
//!
//! Nodes are stored level by level, and along the curve within a level, in flat tables:
//! node prefixes, the index of each node's first child (0 for leaves), one parent per
//! sibling group, the first node of every level, and translation tables between leaf
//! order and the level-sorted order. Construction is non-recursive and runs each stage as
//! a parallel map with disjoint writes.
use std::ops::Range;

use log::{debug, trace};
use rayon::{prelude::*, ThreadPool};

use crate::{
    sfc::{is_power_of_8, upper_bound, NodePrefix, SfcKey},
    storage::{Accelerator, Cpu, DeviceVector},
    types::{OctreeError, Result, TreeNodeIndex},
};

pub mod layout;
pub mod link;

pub use layout::{
    binary_key_weight, create_unsorted_layout, digit_weight, internal_node_slot,
    internal_node_trigger, num_internal_nodes, sort_and_remap,
};
pub use link::{get_level_range, link_tree};

/// Check that `leaves` is a cornerstone leaf array.
///
/// Keys must start at 0, end at the upper bound of the key range, and every consecutive
/// pair must span a power of 8 keys starting at a multiple of that span.
pub fn validate_leaves<K: SfcKey>(leaves: &[K]) -> Result<()> {
    if leaves.len() < 2 {
        return Err(OctreeError::TooFewKeys(leaves.len()));
    }

    if leaves[0] != K::zero() {
        return Err(OctreeError::InvalidStart(leaves[0].as_u64()));
    }

    let last = leaves[leaves.len() - 1];
    if last != upper_bound::<K>() {
        return Err(OctreeError::InvalidEnd {
            expected: upper_bound::<K>().as_u64(),
            found: last.as_u64(),
        });
    }

    for (i, pair) in leaves.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(OctreeError::NotAscending(i));
        }
        let range = pair[1] - pair[0];
        if !is_power_of_8(range) {
            return Err(OctreeError::NotPowerOfEight(i));
        }
        if pair[0] % range != K::zero() {
            return Err(OctreeError::Misaligned(i));
        }
    }

    Ok(())
}

/// Index of the first particle of every leaf.
///
/// `layout[i]..layout[i + 1]` are the particles of leaf `i` in `keys`, sorted particle keys.
pub fn compute_leaf_layout<K: SfcKey>(leaves: &[K], keys: &[K], layout: &mut [usize]) {
    assert!(layout.len() >= leaves.len());
    debug_assert!(keys.windows(2).all(|w| w[0] <= w[1]));

    layout
        .par_iter_mut()
        .zip(leaves.par_iter())
        .for_each(|(offset, &leaf)| *offset = keys.partition_point(|&k| k < leaf));
}

/// Read only view of the octree tables.
#[derive(Clone, Copy, Debug)]
pub struct OctreeView<'a, K: SfcKey> {
    /// Number of leaves.
    pub num_leaf_nodes: usize,
    /// Number of internal nodes.
    pub num_internal_nodes: usize,
    /// Leaves plus internal nodes.
    pub num_nodes: usize,
    /// Prefix of each node in level-sorted order.
    pub prefixes: &'a [NodePrefix<K>],
    /// First child of each node, 0 marks a leaf.
    pub child_offsets: &'a [TreeNodeIndex],
    /// Parent of every group of 8 siblings, the parent of `i` is at `(i - 1) / 8`.
    pub parents: &'a [TreeNodeIndex],
    /// First node of each level, `MAX_TREE_LEVEL + 2` entries.
    pub level_range: &'a [TreeNodeIndex],
    /// Leaf index of each node, negative for internal nodes.
    pub internal_to_leaf: &'a [isize],
    /// Level-sorted position of each node in the unsorted layout.
    pub leaf_to_internal: &'a [TreeNodeIndex],
}

/// Mutable view of the octree tables, the target of [build_linked_tree].
#[derive(Debug)]
pub struct OctreeViewMut<'a, K: SfcKey> {
    /// Number of leaves.
    pub num_leaf_nodes: usize,
    /// Number of internal nodes.
    pub num_internal_nodes: usize,
    /// Leaves plus internal nodes.
    pub num_nodes: usize,
    /// Node prefixes.
    pub prefixes: &'a mut [NodePrefix<K>],
    /// First child of each node.
    pub child_offsets: &'a mut [TreeNodeIndex],
    /// Parent of every sibling group.
    pub parents: &'a mut [TreeNodeIndex],
    /// First node of each level.
    pub level_range: &'a mut [TreeNodeIndex],
    /// Leaf index of each node.
    pub internal_to_leaf: &'a mut [isize],
    /// Level-sorted position of each unsorted node.
    pub leaf_to_internal: &'a mut [TreeNodeIndex],
}

impl<'a, K: SfcKey> OctreeView<'a, K> {
    /// Leaves plus internal nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Whether node `i` has no children.
    pub fn is_leaf(&self, i: TreeNodeIndex) -> bool {
        self.child_offsets[i] == 0
    }

    /// Subdivision level of node `i`.
    pub fn level(&self, i: TreeNodeIndex) -> u32 {
        self.prefixes[i].level()
    }

    /// First key of node `i`.
    pub fn node_key(&self, i: TreeNodeIndex) -> K {
        self.prefixes[i].key()
    }

    /// Parent of node `i`, `None` for the root.
    pub fn parent(&self, i: TreeNodeIndex) -> Option<TreeNodeIndex> {
        (i > 0).then(|| self.parents[(i - 1) / 8])
    }

    /// The 8 children of node `i`, `None` for a leaf.
    pub fn children(&self, i: TreeNodeIndex) -> Option<Range<TreeNodeIndex>> {
        let first = self.child_offsets[i];
        (first != 0).then_some(first..first + 8)
    }

    /// Nodes at `level`.
    pub fn level_nodes(&self, level: u32) -> Range<TreeNodeIndex> {
        let level = level as usize;
        self.level_range[level]..self.level_range[level + 1]
    }

    /// Index of node `i` in the leaf array, `None` for internal nodes.
    pub fn leaf_index(&self, i: TreeNodeIndex) -> Option<usize> {
        usize::try_from(self.internal_to_leaf[i]).ok()
    }

    /// Level-sorted node of leaf `leaf`.
    pub fn leaf_node(&self, leaf: usize) -> TreeNodeIndex {
        self.leaf_to_internal[self.num_internal_nodes + leaf]
    }
}

/// Build all tables of a linked octree from a leaf array.
///
/// The view must be sized for `leaves.len() - 1` leaves, see [OctreeData::resize].
/// Stages run in sequence: unsorted layout, sort and remap, clearing the child
/// offsets, level ranges, linking.
pub fn build_linked_tree<K: SfcKey>(leaves: &[K], tree: OctreeViewMut<'_, K>) {
    debug_assert!(validate_leaves(leaves).is_ok());
    assert_eq!(leaves.len(), tree.num_leaf_nodes + 1);

    let num_nodes = tree.num_nodes;
    let num_internal = tree.num_internal_nodes;
    let prefixes = &mut tree.prefixes[..num_nodes];
    let internal_to_leaf = &mut tree.internal_to_leaf[..num_nodes];
    let leaf_to_internal = &mut tree.leaf_to_internal[..num_nodes];
    let child_offsets = &mut tree.child_offsets[..num_nodes];
    let level_range = tree.level_range;

    trace!("Creating unsorted layout of {num_nodes} nodes");
    create_unsorted_layout(leaves, prefixes, internal_to_leaf);

    trace!("Sorting nodes by prefix");
    sort_and_remap(prefixes, internal_to_leaf, leaf_to_internal, num_internal);

    child_offsets.par_iter_mut().for_each(|c| *c = 0);

    trace!("Computing level ranges");
    get_level_range(prefixes, level_range);

    trace!("Linking {num_internal} internal nodes");
    link_tree(
        prefixes,
        num_internal,
        leaf_to_internal,
        level_range,
        child_offsets,
        tree.parents,
    );
}

/// Owner of the octree tables on accelerator `A`.
pub struct OctreeData<K: SfcKey, A: Accelerator = Cpu> {
    num_leaf_nodes: usize,
    num_internal_nodes: usize,
    num_nodes: usize,

    prefixes: A::Vector<NodePrefix<K>>,
    child_offsets: A::Vector<TreeNodeIndex>,
    parents: A::Vector<TreeNodeIndex>,
    level_range: A::Vector<TreeNodeIndex>,
    internal_to_leaf: A::Vector<isize>,
    leaf_to_internal: A::Vector<TreeNodeIndex>,
}

impl<K: SfcKey, A: Accelerator> Default for OctreeData<K, A> {
    fn default() -> Self {
        OctreeData {
            num_leaf_nodes: 0,
            num_internal_nodes: 0,
            num_nodes: 0,
            prefixes: Default::default(),
            child_offsets: Default::default(),
            parents: Default::default(),
            level_range: Default::default(),
            internal_to_leaf: Default::default(),
            leaf_to_internal: Default::default(),
        }
    }
}

impl<K: SfcKey, A: Accelerator> OctreeData<K, A> {
    /// Empty tree, call [OctreeData::update] to build.
    pub fn new() -> Self {
        Self::default()
    }

    /// Size all tables for `num_leaf_nodes` leaves.
    pub fn resize(&mut self, num_leaf_nodes: usize) {
        self.num_leaf_nodes = num_leaf_nodes;
        self.num_internal_nodes = num_internal_nodes(num_leaf_nodes);
        self.num_nodes = num_leaf_nodes + self.num_internal_nodes;

        self.prefixes.resize(self.num_nodes);
        self.child_offsets.resize(self.num_nodes);
        self.internal_to_leaf.resize(self.num_nodes);
        self.leaf_to_internal.resize(self.num_nodes);

        // The root has no siblings
        self.parents
            .resize(std::cmp::max(1, self.num_nodes.saturating_sub(1) / 8));

        // Level 0 plus the upper bound of the last level
        self.level_range.resize(K::MAX_TREE_LEVEL as usize + 2);
    }

    /// Validate `leaves`, size the tables and build the tree.
    pub fn update(&mut self, leaves: &[K]) -> Result<()> {
        validate_leaves(leaves)?;
        self.resize(leaves.len() - 1);
        build_linked_tree(leaves, self.data_mut());

        debug!(
            "Built octree with {} leaves and {} internal nodes",
            self.num_leaf_nodes, self.num_internal_nodes
        );
        Ok(())
    }

    /// As [OctreeData::update], with all parallel work on `thread_pool`.
    pub fn update_in(&mut self, thread_pool: &ThreadPool, leaves: &[K]) -> Result<()> {
        thread_pool.install(|| self.update(leaves))
    }

    /// Number of leaves.
    pub fn num_leaf_nodes(&self) -> usize {
        self.num_leaf_nodes
    }

    /// Number of internal nodes.
    pub fn num_internal_nodes(&self) -> usize {
        self.num_internal_nodes
    }

    /// Leaves plus internal nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Read only view of the tables.
    pub fn data(&self) -> OctreeView<'_, K> {
        OctreeView {
            num_leaf_nodes: self.num_leaf_nodes,
            num_internal_nodes: self.num_internal_nodes,
            num_nodes: self.num_nodes,
            prefixes: self.prefixes.as_slice(),
            child_offsets: self.child_offsets.as_slice(),
            parents: self.parents.as_slice(),
            level_range: self.level_range.as_slice(),
            internal_to_leaf: self.internal_to_leaf.as_slice(),
            leaf_to_internal: self.leaf_to_internal.as_slice(),
        }
    }

    /// Mutable view of the tables.
    pub fn data_mut(&mut self) -> OctreeViewMut<'_, K> {
        OctreeViewMut {
            num_leaf_nodes: self.num_leaf_nodes,
            num_internal_nodes: self.num_internal_nodes,
            num_nodes: self.num_nodes,
            prefixes: self.prefixes.as_mut_slice(),
            child_offsets: self.child_offsets.as_mut_slice(),
            parents: self.parents.as_mut_slice(),
            level_range: self.level_range.as_mut_slice(),
            internal_to_leaf: self.internal_to_leaf.as_mut_slice(),
            leaf_to_internal: self.leaf_to_internal.as_mut_slice(),
        }
    }
}
