//! # Smelt
//!
//! A parallel vertex-welding engine for 3D triangle meshes.
//!
//! Given a mesh and a distance threshold `eps`, smelt collapses every
//! cluster of vertices lying within `eps` of one another into a single
//! representative vertex at the cluster mean, rewrites all triangles to
//! reference the collapsed vertices, and returns the reduced mesh. A
//! companion driver searches for the `eps` that achieves a requested vertex
//! reduction rate.
//!
//! ## Features
//!
//! - **Lock-free parallel welding**: emission waves over the vertex id
//!   order with atomic minimum-writes on parent pointers; cluster
//!   memberships are deterministic regardless of thread interleaving
//! - **Two parallel variants**: a synchronous welder with a sequential
//!   compaction scan, and an asynchronous one that compacts clusters in
//!   parallel per id chunk
//! - **Epsilon search**: linear bracket plus bisection over the reduction
//!   rate, treating the welder as an oracle
//! - **PLY I/O**: ASCII and binary meshes with optional normals and colors
//!
//! ## Quick Start
//!
//! ```
//! use smelt::prelude::*;
//! use nalgebra::Point3;
//!
//! // Two nearly coincident vertices and one far away.
//! let mut mesh = TriangleMesh::from_vertices_and_triangles(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(0.05, 0.0, 0.0),
//!         Point3::new(4.0, 0.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//!
//! let index = SpatialIndex::build(&mesh.vertices);
//! weld_forward(&mut mesh, &index, 0.1);
//!
//! assert_eq!(mesh.num_vertices(), 2);
//! assert_eq!(mesh.triangles, vec![[0, 0, 1]]);
//! ```
//!
//! ## Loading and welding a file
//!
//! ```no_run
//! use smelt::prelude::*;
//!
//! let mut mesh = smelt::io::load("scan.ply").unwrap();
//! let index = SpatialIndex::build(&mesh.vertices);
//! weld_forward(&mut mesh, &index, 0.001);
//! smelt::io::save(&mesh, "scan-welded.ply").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;
pub mod spatial;

/// Prelude module for convenient imports.
///
/// ```
/// use smelt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::find_epsilon::{find_epsilon, EpsilonSearchOptions};
    pub use crate::algo::weld::{
        weld_forward, weld_forward_async, weld_sequential,
    };
    pub use crate::algo::progress::{ProgressSink, Silent};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::TriangleMesh;
    pub use crate::spatial::SpatialIndex;
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_full_pipeline() {
        // A square with every corner duplicated, as a naive exporter would
        // emit it: two triangles, six vertices.
        let mut mesh = TriangleMesh::from_vertices_and_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
        .unwrap();

        let index = SpatialIndex::build(&mesh.vertices);
        weld_forward(&mut mesh, &index, 1e-9);

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_triangles(), 2);

        // The two triangles now share vertices instead of duplicating them.
        let shared: std::collections::HashSet<_> = mesh.triangles[0]
            .iter()
            .filter(|v| mesh.triangles[1].contains(v))
            .collect();
        assert_eq!(shared.len(), 2);
    }
}
