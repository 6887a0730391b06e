//! Reference sequential welding.

use std::collections::HashMap;

use nalgebra::Point3;
use rayon::prelude::*;

use crate::mesh::TriangleMesh;
use crate::spatial::SpatialIndex;

/// Weld nearby vertices with the single-threaded greedy baseline.
///
/// Walks vertices in ascending id order; every not-yet-remapped vertex
/// becomes an output vertex and absorbs all of its still-unmapped in-range
/// neighbors, averaging their positions. Neighbor queries are batched in
/// parallel up front; the merge itself is sequential.
///
/// The clusters differ from [`weld_forward`]'s by design: a vertex absorbs
/// neighbors that the wave algorithm would have left to found their own
/// clusters. Use this variant as a baseline, not as an oracle for the
/// parallel ones.
///
/// `index` must have been built over exactly `mesh.vertices`.
///
/// [`weld_forward`]: crate::algo::weld::weld_forward
pub fn weld_sequential(mesh: &mut TriangleMesh, index: &SpatialIndex, eps: f64) {
    let neighbors: Vec<Vec<usize>> = mesh
        .vertices
        .par_iter()
        .map(|v| index.search_radius(v, eps))
        .collect();

    let mut new_vertices: Vec<Point3<f64>> = Vec::new();
    let mut remap: HashMap<usize, usize> = HashMap::with_capacity(mesh.vertices.len());

    for vidx in 0..mesh.vertices.len() {
        if remap.contains_key(&vidx) {
            continue;
        }
        let new_vidx = new_vertices.len();
        remap.insert(vidx, new_vidx);

        let mut mean = mesh.vertices[vidx];
        let mut absorbed = 1usize;
        for &nb in &neighbors[vidx] {
            if nb == vidx || remap.contains_key(&nb) {
                continue;
            }
            let n = absorbed as f64;
            mean += (mesh.vertices[nb] - mean) / (n + 1.0);
            remap.insert(nb, new_vidx);
            absorbed += 1;
        }
        new_vertices.push(mean);
    }

    for triangle in &mut mesh.triangles {
        for id in triangle.iter_mut() {
            *id = remap[id];
        }
    }

    mesh.vertices = new_vertices;
    mesh.normals = None;
    mesh.colors = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weld(vertices: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>, eps: f64) -> TriangleMesh {
        let mut mesh = TriangleMesh::from_vertices_and_triangles(vertices, triangles).unwrap();
        let index = SpatialIndex::build(&mesh.vertices);
        weld_sequential(&mut mesh, &index, eps);
        mesh
    }

    #[test]
    fn test_pair_collapses_to_midpoint() {
        let mesh = weld(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.5, 0.0, 0.0)],
            vec![[0, 0, 1]],
            1.0,
        );
        assert_eq!(mesh.num_vertices(), 1);
        assert!((mesh.vertices[0] - Point3::new(0.25, 0.0, 0.0)).norm() < 1e-12);
        assert_eq!(mesh.triangles, vec![[0, 0, 0]]);
    }

    #[test]
    fn test_collinear_chain() {
        // 0 absorbs 1 (the only neighbor in its own radius); 2 is then the
        // next unmapped vertex and founds the second cluster.
        let mesh = weld(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
            1.0,
        );
        assert_eq!(mesh.num_vertices(), 2);
        assert!((mesh.vertices[0] - Point3::new(0.5, 0.0, 0.0)).norm() < 1e-12);
        assert!((mesh.vertices[1] - Point3::new(2.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_coincident_vertices() {
        let mesh = weld(vec![Point3::new(0.0, 0.0, 0.0); 5], vec![[0, 1, 2]], 0.01);
        assert_eq!(mesh.num_vertices(), 1);
        assert_eq!(mesh.triangles, vec![[0, 0, 0]]);
    }

    #[test]
    fn test_epsilon_zero_identity_on_distinct_vertices() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = weld(vertices.clone(), vec![[0, 1, 2]], 0.0);
        assert_eq!(mesh.vertices, vertices);
    }
}
