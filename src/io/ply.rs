//! PLY (Stanford polygon) format support.
//!
//! Reading handles ASCII and binary files through the `ply_rs` parser.
//! Recognized vertex properties are `x`, `y`, `z` (any numeric type, read as
//! `f64`), optional `nx`, `ny`, `nz` normals, and optional `red`, `green`,
//! `blue` colors (uchar, scaled to `[0, 1]`). Faces come from a
//! `vertex_indices` (or `vertex_index`) list; polygons with more than three
//! vertices are triangulated by ear clipping, faces with fewer than three
//! are skipped.
//!
//! Writing emits `x`, `y`, `z` as doubles, normals as doubles and colors as
//! uchars when present, and faces as a `uchar` count followed by `uint`
//! indices, in either ASCII or binary little-endian encoding.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;

/// Load a mesh from a PLY file.
///
/// # Example
///
/// ```no_run
/// use smelt::io::ply;
///
/// let mesh = ply::load("model.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| MeshError::LoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    // Extract vertices and their optional attributes.
    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| MeshError::LoadError {
            path: path.to_path_buf(),
            message: "PLY file has no vertex element".to_string(),
        })?;
    if vertex_element.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "PLY file contains no vertices".to_string(),
        });
    }

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    let mut normals: Vec<Vector3<f64>> = Vec::new();
    let mut colors: Vec<Vector3<f64>> = Vec::new();

    for vertex in vertex_element {
        let coord = |name: &str| {
            get_float_property(vertex, name).ok_or_else(|| MeshError::LoadError {
                path: path.to_path_buf(),
                message: format!("vertex missing {name} coordinate"),
            })
        };
        vertices.push(Point3::new(coord("x")?, coord("y")?, coord("z")?));

        if let (Some(nx), Some(ny), Some(nz)) = (
            get_float_property(vertex, "nx"),
            get_float_property(vertex, "ny"),
            get_float_property(vertex, "nz"),
        ) {
            normals.push(Vector3::new(nx, ny, nz));
        }

        if let (Some(r), Some(g), Some(b)) = (
            get_float_property(vertex, "red"),
            get_float_property(vertex, "green"),
            get_float_property(vertex, "blue"),
        ) {
            colors.push(Vector3::new(r / 255.0, g / 255.0, b / 255.0));
        }
    }

    // Extract faces. A missing face element is a point cloud, which is fine;
    // a face referencing a nonexistent vertex is not.
    let mut mesh = TriangleMesh {
        vertices,
        ..TriangleMesh::new()
    };

    if let Some(face_element) = ply.payload.get("face") {
        for face in face_element {
            let indices = get_list_property(face, "vertex_indices")
                .or_else(|| get_list_property(face, "vertex_index"))
                .ok_or_else(|| MeshError::LoadError {
                    path: path.to_path_buf(),
                    message: "face missing vertex_indices property".to_string(),
                })?;

            for &idx in &indices {
                if idx >= mesh.vertices.len() {
                    return Err(MeshError::LoadError {
                        path: path.to_path_buf(),
                        message: format!(
                            "face references vertex {idx} but there are only {} vertices",
                            mesh.vertices.len()
                        ),
                    });
                }
            }
            mesh.add_polygon(&indices);
        }
    }

    if normals.len() == mesh.vertices.len() {
        mesh.normals = Some(normals);
    }
    if colors.len() == mesh.vertices.len() {
        mesh.colors = Some(colors);
    }

    Ok(mesh)
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

fn write_header<W: Write>(writer: &mut W, mesh: &TriangleMesh, format: &str) -> Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format {format} 1.0")?;
    writeln!(writer, "comment Created by smelt")?;
    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    if mesh.normals.is_some() {
        writeln!(writer, "property double nx")?;
        writeln!(writer, "property double ny")?;
        writeln!(writer, "property double nz")?;
    }
    if mesh.colors.is_some() {
        writeln!(writer, "property uchar red")?;
        writeln!(writer, "property uchar green")?;
        writeln!(writer, "property uchar blue")?;
    }
    writeln!(writer, "element face {}", mesh.triangles.len())?;
    writeln!(writer, "property list uchar uint vertex_indices")?;
    writeln!(writer, "end_header")?;
    Ok(())
}

fn color_byte(c: f64) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Save a mesh to an ASCII PLY file.
///
/// # Example
///
/// ```no_run
/// use smelt::io::ply;
/// use smelt::mesh::TriangleMesh;
///
/// let mesh = TriangleMesh::new();
/// ply::save_ascii(&mesh, "output.ply").unwrap();
/// ```
pub fn save_ascii<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write_header(&mut writer, mesh, "ascii")?;

    for (i, v) in mesh.vertices.iter().enumerate() {
        write!(writer, "{} {} {}", v.x, v.y, v.z)?;
        if let Some(normals) = &mesh.normals {
            let n = normals[i];
            write!(writer, " {} {} {}", n.x, n.y, n.z)?;
        }
        if let Some(colors) = &mesh.colors {
            let c = colors[i];
            write!(
                writer,
                " {} {} {}",
                color_byte(c.x),
                color_byte(c.y),
                color_byte(c.z)
            )?;
        }
        writeln!(writer)?;
    }

    for t in &mesh.triangles {
        writeln!(writer, "3 {} {} {}", t[0], t[1], t[2])?;
    }

    writer.flush()?;
    Ok(())
}

/// Save a mesh to a binary little-endian PLY file.
pub fn save_binary<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write_header(&mut writer, mesh, "binary_little_endian")?;

    for (i, v) in mesh.vertices.iter().enumerate() {
        for coord in [v.x, v.y, v.z] {
            writer.write_all(&coord.to_le_bytes())?;
        }
        if let Some(normals) = &mesh.normals {
            let n = normals[i];
            for coord in [n.x, n.y, n.z] {
                writer.write_all(&coord.to_le_bytes())?;
            }
        }
        if let Some(colors) = &mesh.colors {
            let c = colors[i];
            writer.write_all(&[color_byte(c.x), color_byte(c.y), color_byte(c.z)])?;
        }
    }

    for t in &mesh.triangles {
        writer.write_all(&[3u8])?;
        for &id in t {
            writer.write_all(&(id as u32).to_le_bytes())?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh() -> TriangleMesh {
        let mut mesh = TriangleMesh::from_vertices_and_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.25),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        mesh.normals = Some(vec![Vector3::new(0.0, 0.0, 1.0); 3]);
        mesh.colors = Some(vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]);
        mesh
    }

    fn assert_meshes_match(a: &TriangleMesh, b: &TriangleMesh) {
        assert_eq!(a.num_vertices(), b.num_vertices());
        assert_eq!(a.triangles, b.triangles);
        for (va, vb) in a.vertices.iter().zip(b.vertices.iter()) {
            assert!((va - vb).norm() < 1e-12);
        }
        assert_eq!(a.normals.is_some(), b.normals.is_some());
        assert_eq!(a.colors.is_some(), b.colors.is_some());
    }

    #[test]
    fn test_ascii_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.ply");

        let mesh = sample_mesh();
        save_ascii(&mesh, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_meshes_match(&mesh, &loaded);
        let colors = loaded.colors.unwrap();
        assert!((colors[0] - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.ply");

        let mesh = sample_mesh();
        save_binary(&mesh, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_meshes_match(&mesh, &loaded);
    }

    #[test]
    fn test_round_trip_without_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.ply");

        let mesh = TriangleMesh::from_vertices_and_triangles(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        save_binary(&mesh, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert!(loaded.normals.is_none());
        assert!(loaded.colors.is_none());
        assert_eq!(loaded.triangles, mesh.triangles);
    }

    #[test]
    fn test_quad_faces_are_triangulated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.ply");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "ply").unwrap();
        writeln!(file, "format ascii 1.0").unwrap();
        writeln!(file, "element vertex 4").unwrap();
        writeln!(file, "property float x").unwrap();
        writeln!(file, "property float y").unwrap();
        writeln!(file, "property float z").unwrap();
        writeln!(file, "element face 1").unwrap();
        writeln!(file, "property list uchar uint vertex_indices").unwrap();
        writeln!(file, "end_header").unwrap();
        writeln!(file, "0 0 0").unwrap();
        writeln!(file, "1 0 0").unwrap();
        writeln!(file, "1 1 0").unwrap();
        writeln!(file, "0 1 0").unwrap();
        writeln!(file, "4 0 1 2 3").unwrap();
        drop(file);

        let mesh = load(&path).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_triangles(), 2);
    }

    #[test]
    fn test_out_of_range_face_index_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ply");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "ply").unwrap();
        writeln!(file, "format ascii 1.0").unwrap();
        writeln!(file, "element vertex 2").unwrap();
        writeln!(file, "property float x").unwrap();
        writeln!(file, "property float y").unwrap();
        writeln!(file, "property float z").unwrap();
        writeln!(file, "element face 1").unwrap();
        writeln!(file, "property list uchar uint vertex_indices").unwrap();
        writeln!(file, "end_header").unwrap();
        writeln!(file, "0 0 0").unwrap();
        writeln!(file, "1 0 0").unwrap();
        writeln!(file, "3 0 1 2").unwrap();
        drop(file);

        assert!(matches!(load(&path), Err(MeshError::LoadError { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load("/no/such/file.ply"),
            Err(MeshError::Io(_))
        ));
    }

    #[test]
    fn test_zero_vertices_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ply");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "ply").unwrap();
        writeln!(file, "format ascii 1.0").unwrap();
        writeln!(file, "element vertex 0").unwrap();
        writeln!(file, "property float x").unwrap();
        writeln!(file, "property float y").unwrap();
        writeln!(file, "property float z").unwrap();
        writeln!(file, "end_header").unwrap();
        drop(file);

        assert!(matches!(load(&path), Err(MeshError::LoadError { .. })));
    }
}
