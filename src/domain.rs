//! Data structures for defining the computational domain.
use itertools::izip;
use log::warn;
use num::Float;

/// A domain is a box defined by an origin coordinate and its diameter along all three Cartesian axes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Domain<T: Float> {
    /// The lower left corner of the domain.
    pub origin: [T; 3],

    /// The diameter of the domain along the [x, y, z] axes respectively.
    pub diameter: [T; 3],
}

impl<T: Float> Domain<T> {
    /// Construct a domain a user specified origin and diameter.
    ///
    /// # Arguments
    /// * `origin` - The point from which to construct a cuboid domain.
    /// * `diameter` - The diameter along each axis of the domain.
    pub fn new(origin: &[T; 3], diameter: &[T; 3]) -> Self {
        Domain {
            origin: *origin,
            diameter: *diameter,
        }
    }

    /// Construct a domain from its lower and upper corners.
    pub fn from_bounds(min: &[T; 3], max: &[T; 3]) -> Self {
        let mut diameter = [T::zero(); 3];
        for (d, &lo, &hi) in izip!(&mut diameter, min, max) {
            *d = hi - lo;
        }
        Domain {
            origin: *min,
            diameter,
        }
    }

    /// Compute the domain defined by a set of points on a local node. The domain adds a small
    /// threshold such that no points lie on the actual edge of the domain, and is cubic so that
    /// octree nodes are cubes.
    ///
    /// # Arguments
    /// * `points` - A slice of point coordinates.
    pub fn from_local_points(points: &[[T; 3]]) -> Domain<T> {
        // Increase size of bounding box to capture all points
        let err = T::from(1e-5).unwrap_or_else(T::epsilon);

        let mut min = [T::infinity(); 3];
        let mut max = [T::neg_infinity(); 3];
        for point in points {
            for (lo, hi, &p) in izip!(&mut min, &mut max, point) {
                *lo = lo.min(p);
                *hi = hi.max(p);
            }
        }

        if points.is_empty() {
            warn!("Computing a domain from an empty point set, using the unit cube");
            return Domain::new(&[T::zero(); 3], &[T::one(); 3]);
        }

        // Find maximum dimension, this will define the size of the boxes in the domain
        let diameter = izip!(&min, &max).fold(T::zero(), |acc, (&lo, &hi)| acc.max(hi - lo));
        if diameter <= T::zero() {
            warn!("All points coincide, the domain only has the padded extent");
        }

        let two = T::one() + T::one();
        let diameter = diameter + two * err;

        // The origin is defined by the minimum point
        Domain {
            origin: min.map(|m| m - err),
            diameter: [diameter; 3],
        }
    }

    /// Lower corner.
    pub fn min(&self) -> [T; 3] {
        self.origin
    }

    /// Upper corner.
    pub fn max(&self) -> [T; 3] {
        let mut max = self.origin;
        for (m, &d) in max.iter_mut().zip(&self.diameter) {
            *m = *m + d;
        }
        max
    }
}
