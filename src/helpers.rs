//! Fixtures for tests and benchmarks.
use rand::prelude::*;
use rand::SeedableRng;

use crate::{
    domain::Domain,
    sfc::{node_range, point_to_key, tree_level, upper_bound, SfcKey, SpaceFillingCurve},
};

/// Points fixture for testing, uniformly samples in each axis from min to max.
pub fn points_fixture(npoints: usize, min: Option<f64>, max: Option<f64>) -> Vec<[f64; 3]> {
    // Generate a set of randomly distributed points
    let mut range = StdRng::seed_from_u64(0);

    let between = if let (Some(min), Some(max)) = (min, max) {
        rand::distributions::Uniform::from(min..max)
    } else {
        rand::distributions::Uniform::from(0.0_f64..1.0_f64)
    };

    (0..npoints)
        .map(|_| {
            [
                between.sample(&mut range),
                between.sample(&mut range),
                between.sample(&mut range),
            ]
        })
        .collect()
}

/// Points fixture for testing, uniformly samples in the bounds [[0, 0.1), [0, 0.1), [0, 500)]
/// for the x, y, and z axes respectively.
pub fn points_fixture_col(npoints: usize) -> Vec<[f64; 3]> {
    let mut range = StdRng::seed_from_u64(0);

    let between1 = rand::distributions::Uniform::from(0f64..0.1f64);
    let between2 = rand::distributions::Uniform::from(0f64..500f64);

    (0..npoints)
        .map(|_| {
            // One axis has a different sampling
            [
                between1.sample(&mut range),
                between1.sample(&mut range),
                between2.sample(&mut range),
            ]
        })
        .collect()
}

/// Random coordinates in `domain` and their keys, both sorted along the curve.
pub fn random_coordinates<C: SpaceFillingCurve, K: SfcKey>(
    npoints: usize,
    domain: &Domain<f64>,
    seed: u64,
) -> (Vec<[f64; 3]>, Vec<K>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let max = domain.max();

    let mut samples: Vec<(K, [f64; 3])> = (0..npoints)
        .map(|_| {
            let mut point = [0.0; 3];
            for (p, (&lo, &hi)) in point.iter_mut().zip(domain.origin.iter().zip(&max)) {
                *p = rng.gen_range(lo..hi);
            }
            let key = point_to_key::<C, K, f64>(&point, domain)
                .expect("Sampled points lie inside the domain");
            (key, point)
        })
        .collect();
    samples.sort_by_key(|&(key, _)| key);

    samples.into_iter().map(|(key, point)| (point, key)).unzip()
}

/// Leaf array of a complete tree, all `8^level` leaves at `level`.
pub fn uniform_leaves<K: SfcKey>(level: u32) -> Vec<K> {
    assert!(level <= K::MAX_TREE_LEVEL);
    let num_leaves = 1u64 << (3 * level);
    let range = node_range::<K>(level).as_u64();
    (0..=num_leaves).map(|i| K::from_u64(i * range)).collect()
}

/// Leaf array obtained from the root by `num_splits` random subdivisions.
///
/// Each split replaces a leaf above `max_level` by its 8 children, so the result has
/// `1 + 7 * num_splits` leaves unless every leaf reached `max_level` first.
pub fn random_leaves<K: SfcKey, R: Rng>(rng: &mut R, max_level: u32, num_splits: usize) -> Vec<K> {
    let max_level = max_level.min(K::MAX_TREE_LEVEL);
    let mut leaves = vec![K::zero(), upper_bound::<K>()];
    let mut remaining = num_splits;

    while remaining > 0 {
        let num_leaves = leaves.len() - 1;
        let splittable: Vec<usize> = (0..num_leaves)
            .filter(|&i| tree_level(leaves[i + 1] - leaves[i]) < max_level)
            .collect();
        if splittable.is_empty() {
            break;
        }

        // Split in rounds to avoid quadratic insertion
        let batch = remaining.min((splittable.len() / 8).max(1));
        let mut split = vec![false; num_leaves];
        for &i in splittable.choose_multiple(rng, batch) {
            split[i] = true;
        }

        let mut refined = Vec::with_capacity(leaves.len() + 7 * batch);
        for (i, &s) in split.iter().enumerate() {
            let start = leaves[i];
            if s {
                let child_range = node_range::<K>(tree_level(leaves[i + 1] - start) + 1);
                let mut key = start;
                for _ in 0..8 {
                    refined.push(key);
                    key = key + child_range;
                }
            } else {
                refined.push(start);
            }
        }
        refined.push(upper_bound::<K>());

        leaves = refined;
        remaining -= batch;
    }

    leaves
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sfc::{is_power_of_8, Hilbert};

    fn check_leaves<K: SfcKey>(leaves: &[K]) {
        assert_eq!(leaves[0], K::zero());
        assert_eq!(*leaves.last().unwrap(), upper_bound::<K>());
        for pair in leaves.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(is_power_of_8(pair[1] - pair[0]));
            // Leaves start on a multiple of their own size
            assert_eq!(pair[0] % (pair[1] - pair[0]), K::zero());
        }
    }

    #[test]
    fn test_uniform_leaves() {
        let leaves = uniform_leaves::<u32>(0);
        assert_eq!(leaves, vec![0, 1 << 30]);

        let leaves = uniform_leaves::<u64>(2);
        assert_eq!(leaves.len(), 65);
        check_leaves(&leaves);
    }

    #[test]
    fn test_random_leaves() {
        let mut rng = StdRng::seed_from_u64(0);

        let leaves = random_leaves::<u64, _>(&mut rng, 21, 500);
        assert_eq!(leaves.len(), 1 + 1 + 7 * 500);
        check_leaves(&leaves);

        // Only 1 + 8 nodes can be split above level 2
        let leaves = random_leaves::<u32, _>(&mut rng, 2, 100);
        assert_eq!(leaves, uniform_leaves::<u32>(2));
    }

    #[test]
    fn test_random_coordinates() {
        let domain = Domain::new(&[-1.0, 0.0, 0.0], &[2.0, 1.0, 1.0]);
        let (points, keys) = random_coordinates::<Hilbert, u64>(1000, &domain, 42);
        assert_eq!(points.len(), 1000);
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        for (point, &key) in points.iter().zip(&keys) {
            assert_eq!(key, point_to_key::<Hilbert, u64, f64>(point, &domain).unwrap());
        }
    }

    #[test]
    fn test_points_fixture() {
        let points = points_fixture(100, Some(-1.0), Some(1.0));
        assert_eq!(points.len(), 100);
        assert!(points.iter().flatten().all(|&p| (-1.0..1.0).contains(&p)));
    }
}
