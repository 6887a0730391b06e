//! Cluster reduction: from parent pointers to a compacted vertex list.

use nalgebra::Point3;

/// Compact the clusters described by `parents` into a new vertex list.
///
/// Walks the ids in ascending order. A centroid (`parents[i] == i`) is
/// assigned the next compacted cluster id and copied out; a follower folds
/// its position into its centroid's running mean. Because parent pointers
/// never exceed their vertex id, a follower's centroid has always been
/// assigned by the time the follower is visited.
///
/// Returns the compacted centroid positions and the map from every original
/// vertex id to its cluster's compacted id.
pub(crate) fn reduce_clusters(
    parents: &[usize],
    vertices: &[Point3<f64>],
) -> (Vec<Point3<f64>>, Vec<usize>) {
    let mut pid2ccid = vec![0usize; parents.len()];
    let mut new_vertices: Vec<Point3<f64>> = Vec::new();
    let mut cluster_sizes: Vec<usize> = Vec::new();

    for (i, &p) in parents.iter().enumerate() {
        if p == i {
            pid2ccid[i] = new_vertices.len();
            new_vertices.push(vertices[i]);
            cluster_sizes.push(1);
        } else {
            debug_assert_eq!(parents[p], p, "follower {i} points at non-centroid {p}");
            let ccid = pid2ccid[p];
            let n = cluster_sizes[ccid] as f64;
            let prev = new_vertices[ccid];
            // Incremental mean; resists cancellation better than
            // (prev * n + v) / (n + 1) on large clusters.
            new_vertices[ccid] = prev + (vertices[i] - prev) / (n + 1.0);
            cluster_sizes[ccid] += 1;
            pid2ccid[i] = ccid;
        }
    }

    (new_vertices, pid2ccid)
}
