//! Face-vertex triangle mesh container.
//!
//! [`TriangleMesh`] stores vertex positions and triangles as plain indexed
//! arrays. Unlike connectivity-based representations, it happily holds the
//! duplicated and degenerate triangles that vertex welding produces, which is
//! exactly what the welding pipeline needs: triangles are never deduplicated
//! and a collapsed triangle such as `[4, 4, 4]` is legal.
//!
//! # Example
//!
//! ```
//! use smelt::mesh::TriangleMesh;
//! use nalgebra::Point3;
//!
//! let mesh = TriangleMesh::from_vertices_and_triangles(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.5, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//!
//! assert_eq!(mesh.num_vertices(), 3);
//! assert_eq!(mesh.num_triangles(), 1);
//! ```

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};

/// A triangle mesh with vertices and triangles represented by indices into
/// the vertex list.
///
/// Vertex ids are dense: the id of a vertex is its position in `vertices`.
/// Normals and colors are optional per-vertex attributes; when present they
/// have the same length as `vertices`. Colors are RGB with components in
/// `[0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,
    /// Triangles as ordered triples of vertex ids.
    pub triangles: Vec<[usize; 3]>,
    /// Optional per-vertex normals.
    pub normals: Option<Vec<Vector3<f64>>>,
    /// Optional per-vertex RGB colors in `[0, 1]`.
    pub colors: Option<Vec<Vector3<f64>>>,
}

impl TriangleMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and triangles, validating that every
    /// triangle references a valid vertex id.
    pub fn from_vertices_and_triangles(
        vertices: Vec<Point3<f64>>,
        triangles: Vec<[usize; 3]>,
    ) -> Result<Self> {
        for (t, triangle) in triangles.iter().enumerate() {
            for &v in triangle {
                if v >= vertices.len() {
                    return Err(MeshError::InvalidVertexIndex {
                        triangle: t,
                        vertex: v,
                    });
                }
            }
        }
        Ok(Self {
            vertices,
            triangles,
            normals: None,
            colors: None,
        })
    }

    /// Get the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Axis-aligned bounding box as `(min, max)`, or `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices[1..] {
            min = Point3::new(min.x.min(v.x), min.y.min(v.y), min.z.min(v.z));
            max = Point3::new(max.x.max(v.x), max.y.max(v.y), max.z.max(v.z));
        }
        Some((min, max))
    }

    /// Compute area-weighted vertex normals and store them on the mesh.
    ///
    /// Each triangle contributes its (unnormalized) cross-product normal to
    /// its three corners; the per-vertex sums are then normalized. Vertices
    /// not referenced by any non-degenerate triangle get a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let p0 = self.vertices[triangle[0]];
            let p1 = self.vertices[triangle[1]];
            let p2 = self.vertices[triangle[2]];
            let face_normal = (p1 - p0).cross(&(p2 - p0)); // area-weighted

            normals[triangle[0]] += face_normal;
            normals[triangle[1]] += face_normal;
            normals[triangle[2]] += face_normal;
        }

        for n in &mut normals {
            let len = n.norm();
            if len > 1e-10 {
                *n /= len;
            }
        }

        self.normals = Some(normals);
    }

    /// Append a polygonal face, triangulating it by ear clipping.
    ///
    /// Triangles are appended as-is; larger polygons are decomposed into
    /// `polygon.len() - 2` triangles. Polygons with fewer than three vertices
    /// are ignored. All indices must be valid vertex ids.
    pub fn add_polygon(&mut self, polygon: &[usize]) {
        match polygon.len() {
            0..=2 => {}
            3 => self.triangles.push([polygon[0], polygon[1], polygon[2]]),
            _ => self.ear_clip(polygon),
        }
    }

    /// Ear-clipping triangulation of a (possibly non-convex) planar polygon.
    ///
    /// Convexity and containment tests are made against the polygon's Newell
    /// normal. If no ear can be found (collinear or otherwise degenerate
    /// input), the remainder is fan-triangulated so that every input polygon
    /// still contributes `n - 2` triangles.
    fn ear_clip(&mut self, polygon: &[usize]) {
        let normal = newell_normal(&self.vertices, polygon);
        let mut remaining: Vec<usize> = polygon.to_vec();

        while remaining.len() > 3 {
            let n = remaining.len();
            let mut clipped = false;

            for i in 0..n {
                let prev = remaining[(i + n - 1) % n];
                let cur = remaining[i];
                let next = remaining[(i + 1) % n];

                let a = self.vertices[prev];
                let b = self.vertices[cur];
                let c = self.vertices[next];

                // Reflex corners cannot be ears.
                if (b - a).cross(&(c - b)).dot(&normal) <= 0.0 {
                    continue;
                }

                let blocked = remaining
                    .iter()
                    .filter(|&&v| v != prev && v != cur && v != next)
                    .any(|&v| point_in_triangle(self.vertices[v], a, b, c, &normal));
                if blocked {
                    continue;
                }

                self.triangles.push([prev, cur, next]);
                remaining.remove(i);
                clipped = true;
                break;
            }

            if !clipped {
                // Degenerate remainder: fall back to a fan.
                for i in 1..remaining.len() - 1 {
                    self.triangles
                        .push([remaining[0], remaining[i], remaining[i + 1]]);
                }
                return;
            }
        }

        self.triangles
            .push([remaining[0], remaining[1], remaining[2]]);
    }
}

/// Polygon normal by Newell's method (robust for non-planar input).
fn newell_normal(vertices: &[Point3<f64>], polygon: &[usize]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    for i in 0..polygon.len() {
        let p = vertices[polygon[i]];
        let q = vertices[polygon[(i + 1) % polygon.len()]];
        normal.x += (p.y - q.y) * (p.z + q.z);
        normal.y += (p.z - q.z) * (p.x + q.x);
        normal.z += (p.x - q.x) * (p.y + q.y);
    }
    normal
}

/// Test whether `p` lies strictly inside triangle `(a, b, c)` when viewed
/// along `normal`.
fn point_in_triangle(
    p: Point3<f64>,
    a: Point3<f64>,
    b: Point3<f64>,
    c: Point3<f64>,
    normal: &Vector3<f64>,
) -> bool {
    let s0 = (b - a).cross(&(p - a)).dot(normal);
    let s1 = (c - b).cross(&(p - b)).dot(normal);
    let s2 = (a - c).cross(&(p - c)).dot(normal);
    s0 > 0.0 && s1 > 0.0 && s2 > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_construction_validates_indices() {
        let err = TriangleMesh::from_vertices_and_triangles(unit_square(), vec![[0, 1, 7]])
            .unwrap_err();
        match err {
            MeshError::InvalidVertexIndex { triangle, vertex } => {
                assert_eq!(triangle, 0);
                assert_eq!(vertex, 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bounding_box() {
        let mesh =
            TriangleMesh::from_vertices_and_triangles(unit_square(), vec![[0, 1, 2]]).unwrap();
        let (min, max) = mesh.bounding_box().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));

        assert!(TriangleMesh::new().bounding_box().is_none());
    }

    #[test]
    fn test_quad_ear_clips_into_two_triangles() {
        let mut mesh = TriangleMesh {
            vertices: unit_square(),
            ..TriangleMesh::new()
        };
        mesh.add_polygon(&[0, 1, 2, 3]);
        assert_eq!(mesh.num_triangles(), 2);

        // Both diagonals of a square split it into triangles of area 1/2 each.
        let total: f64 = mesh
            .triangles
            .iter()
            .map(|t| {
                let [a, b, c] = [mesh.vertices[t[0]], mesh.vertices[t[1]], mesh.vertices[t[2]]];
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_concave_polygon_ear_clipping() {
        // An arrowhead: vertex 3 is reflex, so the fan from vertex 0 would
        // leave the polygon but ear clipping must not.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(1.0, 0.5, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let mut mesh = TriangleMesh {
            vertices,
            ..TriangleMesh::new()
        };
        mesh.add_polygon(&[0, 1, 2, 3, 4]);
        assert_eq!(mesh.num_triangles(), 3);

        // Total area must match the shoelace area of the polygon.
        let total: f64 = mesh
            .triangles
            .iter()
            .map(|t| {
                let [a, b, c] = [mesh.vertices[t[0]], mesh.vertices[t[1]], mesh.vertices[t[2]]];
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum();
        assert!((total - 2.5).abs() < 1e-12, "area was {total}");
    }

    #[test]
    fn test_short_polygons_ignored() {
        let mut mesh = TriangleMesh {
            vertices: unit_square(),
            ..TriangleMesh::new()
        };
        mesh.add_polygon(&[0, 1]);
        assert_eq!(mesh.num_triangles(), 0);
    }

    #[test]
    fn test_vertex_normals_flat_grid() {
        let mut mesh =
            TriangleMesh::from_vertices_and_triangles(unit_square(), vec![[0, 1, 2], [0, 2, 3]])
                .unwrap();
        mesh.compute_vertex_normals();

        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 4);
        for n in normals {
            assert!((n - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
        }
    }
}
