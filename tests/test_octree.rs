use cstone::domain::Domain;
use cstone::geometry::{OctreeGeometry, OctreeNsView};
use cstone::helpers::{random_coordinates, random_leaves, uniform_leaves};
use cstone::octree::{compute_leaf_layout, num_internal_nodes, OctreeData, OctreeView};
use cstone::sfc::{node_range, Hilbert, Morton, NodePrefix, SfcKey, SpaceFillingCurve};
use cstone::threads::create_pool;
use rand::prelude::*;
use rand::SeedableRng;

fn check_topology<K: SfcKey>(leaves: &[K], view: &OctreeView<'_, K>) {
    let num_leaf_nodes = leaves.len() - 1;
    let num_internal = view.num_internal_nodes;
    let num_nodes = view.num_nodes();

    // Count invariant
    assert_eq!(view.num_leaf_nodes, num_leaf_nodes);
    assert_eq!(num_internal, num_internal_nodes(num_leaf_nodes));
    assert_eq!(num_internal * 7 + 1, num_leaf_nodes);
    assert_eq!(num_nodes, num_leaf_nodes + num_internal);
    assert_eq!(view.parents.len(), std::cmp::max(1, (num_nodes - 1) / 8));
    assert_eq!(view.level_range.len(), K::MAX_TREE_LEVEL as usize + 2);

    // Root
    assert_eq!(view.prefixes[0], NodePrefix::root());
    assert_eq!(view.parent(0), None);
    for i in 0..num_nodes {
        if let Some(children) = view.children(i) {
            assert!(children.start > 0);
        }
    }

    // Leaves appear once each, internal nodes have no leaf index
    let mut seen = vec![false; num_leaf_nodes];
    for i in 0..num_nodes {
        match view.leaf_index(i) {
            Some(leaf) => {
                assert!(view.is_leaf(i));
                assert!(!seen[leaf]);
                seen[leaf] = true;
                assert_eq!(view.node_key(i), leaves[leaf]);
                assert_eq!(view.prefixes[i].end_key(), leaves[leaf + 1]);
                assert_eq!(view.leaf_node(leaf), i);
            }
            None => assert!(!view.is_leaf(i)),
        }
    }
    assert!(seen.iter().all(|&s| s));

    // Children and parents
    for p in 0..num_nodes {
        let Some(children) = view.children(p) else {
            continue;
        };
        let level = view.level(p);
        for (digit, c) in children.enumerate() {
            assert_eq!(view.parent(c), Some(p));
            assert_eq!(view.parents[(c - 1) / 8], p);
            assert_eq!(view.level(c), level + 1);
            assert_eq!(
                view.node_key(c),
                view.node_key(p) + K::from_u64(digit as u64) * node_range::<K>(level + 1)
            );
        }
    }

    // Levels
    assert_eq!(view.level_range[K::MAX_TREE_LEVEL as usize + 1], num_nodes);
    for level in 0..=K::MAX_TREE_LEVEL {
        let l = level as usize;
        assert!(view.level_range[l] <= view.level_range[l + 1]);
        for i in view.level_nodes(level) {
            assert_eq!(view.level(i), level);
        }
    }
    assert!(view.prefixes.windows(2).all(|w| w[0] < w[1]));

    // Translation tables
    for i in 0..num_nodes {
        let slot = view.internal_to_leaf[i] + num_internal as isize;
        assert_eq!(view.leaf_to_internal[slot as usize], i);
    }
}

fn check_geometry<C: SpaceFillingCurve, K: SfcKey>(view: &OctreeView<'_, K>, domain: &Domain<f64>) {
    let geometry = OctreeGeometry::new::<C, K>(view, domain);
    assert_eq!(geometry.centers.len(), view.num_nodes());

    let tol = 1e-12 * domain.diameter[0];
    for p in 0..view.num_nodes() {
        let Some(children) = view.children(p) else {
            continue;
        };
        let (pc, ps) = (geometry.centers[p], geometry.sizes[p]);
        for c in children {
            let (cc, cs) = (geometry.centers[c], geometry.sizes[c]);
            for axis in 0..3 {
                assert!(pc[axis] - ps[axis] <= cc[axis] - cs[axis] + tol);
                assert!(cc[axis] + cs[axis] <= pc[axis] + ps[axis] + tol);
                assert!((2.0 * cs[axis] - ps[axis]).abs() <= tol);
            }
        }
    }

    // The root is the whole domain
    let max = domain.max();
    for axis in 0..3 {
        let (c, s) = (geometry.centers[0][axis], geometry.sizes[0][axis]);
        assert!((c - s - domain.origin[axis]).abs() <= tol);
        assert!((c + s - max[axis]).abs() <= tol);
    }
}

fn run_test<C: SpaceFillingCurve, K: SfcKey>(leaves: &[K]) {
    let domain = Domain::new(&[-1.0, 2.0, 0.5], &[3.0, 3.0, 3.0]);

    let mut octree = OctreeData::<K>::new();
    octree.update(leaves).unwrap();

    let view = octree.data();
    check_topology(leaves, &view);
    check_geometry::<C, K>(&view, &domain);
}

fn run_all<C: SpaceFillingCurve>() {
    run_test::<C, u32>(&uniform_leaves(0));
    run_test::<C, u32>(&uniform_leaves(1));
    run_test::<C, u64>(&uniform_leaves(3));

    let mut rng = StdRng::seed_from_u64(0);
    for num_splits in [1, 3, 20, 400] {
        run_test::<C, u32>(&random_leaves(&mut rng, 10, num_splits));
        run_test::<C, u64>(&random_leaves(&mut rng, 21, num_splits));
    }

    // Larger tree
    run_test::<C, u64>(&random_leaves(&mut rng, 21, 2000));
}

#[test]
fn test_octree_morton() {
    run_all::<Morton>();
}

#[test]
fn test_octree_hilbert() {
    run_all::<Hilbert>();
}

#[test]
fn test_level_one_scenario() {
    let leaves = uniform_leaves::<u64>(1);
    let mut octree = OctreeData::<u64>::new();
    octree.update(&leaves).unwrap();

    let view = octree.data();
    assert_eq!(view.num_internal_nodes, 1);
    assert_eq!(view.level_range[..3], [0, 1, 9]);
    assert_eq!(view.children(0), Some(1..9));
    for digit in 0..8u64 {
        let child = 1 + digit as usize;
        assert_eq!(view.node_key(child), digit * node_range::<u64>(1));
        assert!(view.is_leaf(child));
    }
}

#[test]
fn test_single_leaf_scenario() {
    let leaves = uniform_leaves::<u32>(0);
    let mut octree = OctreeData::<u32>::new();
    octree.update(&leaves).unwrap();

    let view = octree.data();
    assert_eq!(view.num_internal_nodes, 0);
    assert_eq!(view.num_nodes(), 1);
    assert!(view.is_leaf(0));
    assert_eq!(view.level(0), 0);
    assert_eq!(view.parents.len(), 1);
}

#[test]
fn test_thread_pools() {
    // Results do not depend on the number of threads
    let mut rng = StdRng::seed_from_u64(3);
    let leaves = random_leaves::<u64, _>(&mut rng, 21, 1000);

    let mut reference = OctreeData::<u64>::new();
    reference.update_in(&create_pool(1).unwrap(), &leaves).unwrap();

    for num_threads in [2, 4] {
        let mut octree = OctreeData::<u64>::new();
        octree
            .update_in(&create_pool(num_threads).unwrap(), &leaves)
            .unwrap();

        let (a, b) = (reference.data(), octree.data());
        assert_eq!(a.prefixes, b.prefixes);
        assert_eq!(a.child_offsets, b.child_offsets);
        assert_eq!(a.parents, b.parents);
        assert_eq!(a.level_range, b.level_range);
        assert_eq!(a.internal_to_leaf, b.internal_to_leaf);
        assert_eq!(a.leaf_to_internal, b.leaf_to_internal);
    }
}

#[test]
fn test_particle_layout() {
    let domain = Domain::new(&[0.0; 3], &[1.0; 3]);
    let (_points, keys) = random_coordinates::<Hilbert, u32>(5000, &domain, 42);

    let mut rng = StdRng::seed_from_u64(7);
    let leaves = random_leaves::<u32, _>(&mut rng, 10, 50);

    let mut octree = OctreeData::<u32>::new();
    octree.update(&leaves).unwrap();
    let view = octree.data();
    let geometry = OctreeGeometry::new::<Hilbert, u32>(&view, &domain);

    let mut layout = vec![0; leaves.len()];
    compute_leaf_layout(&leaves, &keys, &mut layout);
    assert_eq!(layout[0], 0);
    assert_eq!(layout[leaves.len() - 1], keys.len());

    let ns_view = OctreeNsView::new(&view, &geometry, &layout);
    let mut total = 0;
    for i in 0..view.num_nodes() {
        match ns_view.particles(i) {
            Some(particles) => {
                assert!(ns_view.is_leaf(i));
                let prefix = view.prefixes[i];
                total += particles.len();
                for &k in &keys[particles] {
                    assert!(prefix.key() <= k && k < prefix.end_key());
                }
            }
            None => assert!(!ns_view.is_leaf(i)),
        }
    }
    assert_eq!(total, keys.len());
}

#[test]
fn test_invalid_leaves() {
    let mut octree = OctreeData::<u32>::new();
    assert!(octree.update(&[]).is_err());
    assert!(octree.update(&[0, 8, 1 << 30]).is_err());
    assert!(octree.update(&[0, 1 << 27, 1 << 30]).is_err());
}
