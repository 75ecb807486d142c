//! Unsorted node layout and the level-sorted remap.
//!
//! Every internal octree node corresponds to 7 internal nodes of the binary radix tree
//! over the leaf array. The closed form offset [binary_key_weight] converts the index of
//! the leaf that starts the binary split at an octree level boundary into the index of
//! the enclosing octree node, so each leaf locates its internal node without a search.
use rayon::prelude::*;

use crate::{
    sfc::{common_prefix, octal_digit, tree_level, NodePrefix, SfcKey},
    storage::SendPtrMut,
    types::TreeNodeIndex,
};

/// Number of internal nodes of a tree with `num_leaf_nodes` leaves.
pub fn num_internal_nodes(num_leaf_nodes: usize) -> usize {
    num_leaf_nodes.saturating_sub(1) / 7
}

/// Offset weight of an octal digit for the binary tree to octree index correspondence.
pub fn digit_weight(digit: u32) -> isize {
    debug_assert!(digit < 8);
    if digit >= 4 {
        7 - digit as isize
    } else {
        -(digit as isize)
    }
}

/// Sum of [digit_weight] over the first `level + 1` digits of `key`.
///
/// If `l = common_prefix(leaves[j], leaves[j + 1])` is a multiple of 3, the internal node
/// with key `leaves[j]` at level `l / 3` sits at index `(j + binary_key_weight(leaves[j], l / 3)) / 7`.
pub fn binary_key_weight<K: SfcKey>(key: K, level: u32) -> isize {
    (1..=level + 1)
        .map(|position| digit_weight(octal_digit(key, position)))
        .sum()
}

/// Unsorted slot of the internal node triggered by leaf `leaf_index`.
pub fn internal_node_slot<K: SfcKey>(leaf_index: usize, key: K, level: u32) -> usize {
    let index = (leaf_index as isize + binary_key_weight(key, level)) / 7;
    debug_assert!(index >= 0);
    index as usize
}

/// Internal node prefix and slot triggered by leaf `leaf_index`, if any.
///
/// Exactly one leaf per internal node triggers, the last leaf of the first half of its
/// children.
pub fn internal_node_trigger<K: SfcKey>(
    leaves: &[K],
    leaf_index: usize,
) -> Option<(usize, NodePrefix<K>)> {
    let num_leaf_nodes = leaves.len() - 1;
    if leaf_index + 1 >= num_leaf_nodes {
        return None;
    }

    let key = leaves[leaf_index];
    let prefix_length = common_prefix(key, leaves[leaf_index + 1]);
    if prefix_length % 3 != 0 {
        return None;
    }

    Some((
        internal_node_slot(leaf_index, key, prefix_length / 3),
        NodePrefix::encode(key, prefix_length),
    ))
}

/// Write leaf and internal node prefixes in unsorted order.
///
/// Leaf `i` goes to slot `num_internal_nodes + i`, internal nodes occupy the first
/// `num_internal_nodes` slots. `internal_to_leaf` receives the identity permutation.
///
/// # Arguments
/// * `leaves` - Cornerstone leaf array, `num_leaf_nodes + 1` keys.
/// * `prefixes` - Output node prefixes, one per node.
/// * `internal_to_leaf` - Output unsorted slot of each node, one per node.
pub fn create_unsorted_layout<K: SfcKey>(
    leaves: &[K],
    prefixes: &mut [NodePrefix<K>],
    internal_to_leaf: &mut [isize],
) {
    let num_leaf_nodes = leaves.len() - 1;
    let num_internal = num_internal_nodes(num_leaf_nodes);
    let num_nodes = num_leaf_nodes + num_internal;
    assert!(prefixes.len() >= num_nodes && internal_to_leaf.len() >= num_nodes);

    let (internal_prefixes, leaf_prefixes) = prefixes[..num_nodes].split_at_mut(num_internal);
    let (internal_slots, leaf_slots) = internal_to_leaf[..num_nodes].split_at_mut(num_internal);

    let internal_prefixes = SendPtrMut::new(internal_prefixes);
    let internal_slots = SendPtrMut::new(internal_slots);

    leaf_prefixes
        .par_iter_mut()
        .zip(leaf_slots.par_iter_mut())
        .enumerate()
        .for_each(|(i, (prefix, slot))| {
            let key = leaves[i];
            let level = tree_level(leaves[i + 1] - key);
            *prefix = NodePrefix::encode(key, 3 * level);
            *slot = (num_internal + i) as isize;

            if let Some((index, internal)) = internal_node_trigger(leaves, i) {
                assert!(index < num_internal, "Leaf {i} maps to internal slot {index}");
                // A single leaf triggers each internal node
                unsafe {
                    internal_prefixes.write(index, internal);
                    internal_slots.write(index, index as isize);
                }
            }
        });
}

/// Sort node prefixes and derive both index translation tables.
///
/// On entry `internal_to_leaf` holds the unsorted slot of each node. On exit prefixes
/// are in level-sorted order, `leaf_to_internal` maps unsorted slots to sorted positions
/// and `internal_to_leaf` maps sorted positions to leaf indices, negative for internal
/// nodes.
pub fn sort_and_remap<K: SfcKey>(
    prefixes: &mut [NodePrefix<K>],
    internal_to_leaf: &mut [isize],
    leaf_to_internal: &mut [TreeNodeIndex],
    num_internal_nodes: usize,
) {
    let num_nodes = prefixes.len();
    assert!(internal_to_leaf.len() == num_nodes && leaf_to_internal.len() == num_nodes);

    let mut pairs: Vec<(NodePrefix<K>, isize)> = prefixes
        .par_iter()
        .copied()
        .zip(internal_to_leaf.par_iter().copied())
        .collect();
    pairs.par_sort_unstable_by_key(|&(prefix, _)| prefix);

    let translation = SendPtrMut::new(leaf_to_internal);
    prefixes
        .par_iter_mut()
        .zip(internal_to_leaf.par_iter_mut())
        .zip(pairs.par_iter())
        .enumerate()
        .for_each(|(i, ((prefix, slot), &(sorted_prefix, original)))| {
            let original = original as usize;
            assert!(original < num_nodes);
            // The carried slots are a permutation
            unsafe { translation.write(original, i) };

            *prefix = sorted_prefix;
            *slot = original as isize - num_internal_nodes as isize;
        });
}
