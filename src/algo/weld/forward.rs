//! Synchronous parallel welding.

use rayon::prelude::*;

use crate::algo::progress::{ProgressSink, Silent};
use crate::algo::weld::reduce::reduce_clusters;
use crate::algo::weld::Wavefront;
use crate::mesh::TriangleMesh;
use crate::spatial::SpatialIndex;

/// Weld all vertex clusters within `eps` of one another, in parallel.
///
/// Runs the emission-wave algorithm over the mesh vertices, compacts the
/// resulting clusters with a sequential scan, and rewrites every triangle to
/// reference the compacted vertices. Per-vertex normals and colors are
/// discarded: after welding they no longer correspond one-to-one with the
/// surviving vertices.
///
/// `index` must have been built over exactly `mesh.vertices`.
///
/// # Example
///
/// ```
/// use smelt::algo::weld::weld_forward;
/// use smelt::mesh::TriangleMesh;
/// use smelt::spatial::SpatialIndex;
/// use nalgebra::Point3;
///
/// let mut mesh = TriangleMesh::from_vertices_and_triangles(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(0.1, 0.0, 0.0),
///         Point3::new(5.0, 0.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// )
/// .unwrap();
///
/// let index = SpatialIndex::build(&mesh.vertices);
/// weld_forward(&mut mesh, &index, 0.5);
///
/// assert_eq!(mesh.num_vertices(), 2);
/// ```
pub fn weld_forward(mesh: &mut TriangleMesh, index: &SpatialIndex, eps: f64) {
    weld_forward_with_progress(mesh, index, eps, &Silent);
}

/// [`weld_forward`] with progress reporting.
///
/// Reports the number of emitted vertices out of the total after every wave.
pub fn weld_forward_with_progress(
    mesh: &mut TriangleMesh,
    index: &SpatialIndex,
    eps: f64,
    progress: &dyn ProgressSink,
) {
    let wavefront = Wavefront::build(&mesh.vertices, index, eps);
    wavefront.run_waves(progress);
    let parents = wavefront.into_parents();

    let (new_vertices, pid2ccid) = reduce_clusters(&parents, &mesh.vertices);

    mesh.triangles.par_iter_mut().for_each(|triangle| {
        for id in triangle.iter_mut() {
            *id = pid2ccid[*id];
        }
    });

    mesh.vertices = new_vertices;
    mesh.normals = None;
    mesh.colors = None;
}
