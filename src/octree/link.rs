//! Level ranges and parent/child links of the level-sorted tree.
use rayon::prelude::*;

use crate::{
    sfc::{NodePrefix, SfcKey},
    storage::SendPtrMut,
    types::TreeNodeIndex,
};

/// First node index of every level, `level_range[MAX_TREE_LEVEL + 1]` is the node count.
///
/// # Arguments
/// * `prefixes` - Level-sorted node prefixes.
/// * `level_range` - Output, length `MAX_TREE_LEVEL + 2`.
pub fn get_level_range<K: SfcKey>(prefixes: &[NodePrefix<K>], level_range: &mut [TreeNodeIndex]) {
    let max_level = K::MAX_TREE_LEVEL as usize;
    assert!(level_range.len() >= max_level + 2);

    for (level, start) in level_range.iter_mut().take(max_level + 1).enumerate() {
        let first = NodePrefix::level_start(level as u32);
        *start = prefixes.partition_point(|&p| p < first);
    }
    level_range[max_level + 1] = prefixes.len();
}

/// Connect every internal node to its first child and each sibling group to its parent.
///
/// Child offsets of leaves are left untouched and must be zero on entry. The parent of
/// node `i > 0` is written at `parents[(i - 1) / 8]`.
///
/// # Panics
/// If an internal node has no first child one level below, the leaf array the layout
/// was built from is not a cornerstone partition.
pub fn link_tree<K: SfcKey>(
    prefixes: &[NodePrefix<K>],
    num_internal_nodes: usize,
    leaf_to_internal: &[TreeNodeIndex],
    level_range: &[TreeNodeIndex],
    child_offsets: &mut [TreeNodeIndex],
    parents: &mut [TreeNodeIndex],
) {
    let num_nodes = prefixes.len();
    let num_parents = parents.len();
    assert!(child_offsets.len() >= num_nodes);
    assert!(level_range.len() >= K::MAX_TREE_LEVEL as usize + 2);

    let child_offsets = SendPtrMut::new(child_offsets);
    let parents = SendPtrMut::new(parents);

    leaf_to_internal[..num_internal_nodes]
        .par_iter()
        .for_each(|&idx_a| {
            let prefix = prefixes[idx_a];
            let level = prefix.level();
            assert!(level < K::MAX_TREE_LEVEL);

            let child_prefix = prefix.first_child();
            let search_start = level_range[level as usize + 1];
            let search_end = level_range[level as usize + 2];
            let child_idx = search_start
                + prefixes[search_start..search_end].partition_point(|&p| p < child_prefix);

            assert!(
                child_idx != search_end && prefixes[child_idx] == child_prefix,
                "Internal node {idx_a} with prefix {:?} has no children",
                prefix.raw()
            );

            // One parent per group of 8 siblings, the root has none
            let parent_slot = (child_idx - 1) / 8;
            assert!(parent_slot < num_parents);
            // Each internal node owns its offset and its child group
            unsafe {
                child_offsets.write(idx_a, child_idx);
                parents.write(parent_slot, idx_a);
            }
        });
}
