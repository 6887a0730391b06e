//! Spatial index for radius queries over a static point set.
//!
//! [`SpatialIndex`] wraps a k-d tree built once over the mesh vertices and
//! answers the two queries the welders need: plain closed-ball radius search,
//! and a radius search split by vertex id into "smaller-or-equal" (returned
//! as a count) and "bigger" (returned as a sorted id list).
//!
//! The index guarantees **closed**-ball semantics: a point at distance
//! exactly `radius` from the query is a neighbor. Results are sorted by id,
//! so they are deterministic per input regardless of tree internals.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use nalgebra::Point3;

/// Bucket capacity for the underlying k-d tree. Must exceed the largest
/// number of points sharing the same coordinate on any single axis, or the
/// tree panics while splitting an overflowing bucket.
const BUCKET_SIZE: usize = 8192;

/// A static radius-search index over 3D points.
///
/// # Example
///
/// ```
/// use smelt::spatial::SpatialIndex;
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(5.0, 0.0, 0.0),
/// ];
/// let index = SpatialIndex::build(&points);
///
/// // Closed ball: the point at distance exactly 1.0 is included.
/// assert_eq!(index.search_radius(&points[0], 1.0), vec![0, 1]);
/// ```
pub struct SpatialIndex {
    tree: KdTree<f64, u64, 3, BUCKET_SIZE, u32>,
    num_points: usize,
}

impl SpatialIndex {
    /// Build an index over `points`; the id of a point is its slice position.
    pub fn build(points: &[Point3<f64>]) -> Self {
        let mut tree: KdTree<f64, u64, 3, BUCKET_SIZE, u32> = KdTree::new();
        for (i, p) in points.iter().enumerate() {
            tree.add(&[p.x, p.y, p.z], i as u64);
        }
        Self {
            tree,
            num_points: points.len(),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.num_points
    }

    /// Check whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Ids of all points within Euclidean distance `radius` of `query`
    /// (closed ball), sorted ascending. A negative radius yields no results.
    pub fn search_radius(&self, query: &Point3<f64>, radius: f64) -> Vec<usize> {
        let mut ids = self.in_range(query, radius);
        ids.sort_unstable();
        ids
    }

    /// Radius search partitioned around the query's own id.
    ///
    /// Returns the count of in-range ids `<= pid` (the query point itself
    /// included) and the sorted list of in-range ids `> pid`.
    pub fn search_radius_split(
        &self,
        query: &Point3<f64>,
        radius: f64,
        pid: usize,
    ) -> (usize, Vec<usize>) {
        let ids = self.in_range(query, radius);
        let num_not_greater = ids.iter().filter(|&&id| id <= pid).count();
        let mut bigger: Vec<usize> = ids.into_iter().filter(|&id| id > pid).collect();
        bigger.sort_unstable();
        (num_not_greater, bigger)
    }

    /// Unordered ids within the closed ball of `radius` around `query`.
    ///
    /// The tree is queried with a padded bound and the exact closed-ball
    /// predicate is applied here, so inclusion of boundary points does not
    /// depend on the tree's internal comparison.
    fn in_range(&self, query: &Point3<f64>, radius: f64) -> Vec<usize> {
        if radius < 0.0 {
            return Vec::new();
        }
        let r2 = radius * radius;
        let bound = r2 + r2 * 1e-12 + f64::MIN_POSITIVE;
        self.tree
            .within_unsorted::<SquaredEuclidean>(&[query.x, query.y, query.z], bound)
            .into_iter()
            .filter(|n| n.distance <= r2)
            .map(|n| n.item as usize)
            .collect()
    }
}
