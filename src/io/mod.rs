//! Mesh file I/O.
//!
//! The welding pipeline reads and writes PLY (Stanford polygon format)
//! meshes; see [`ply`] for the property layout. The functions here dispatch
//! on the file extension so callers do not need to name the format:
//!
//! ```no_run
//! use smelt::io::{load, save};
//!
//! let mesh = load("model.ply").unwrap();
//! save(&mesh, "welded.ply").unwrap();
//! ```

pub mod ply;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;

fn require_ply(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("(none)");
    if extension.eq_ignore_ascii_case("ply") {
        Ok(())
    } else {
        Err(MeshError::UnsupportedFormat {
            extension: extension.to_string(),
        })
    }
}

/// Load a mesh from a PLY file (ASCII or binary).
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    require_ply(path)?;
    ply::load(path)
}

/// Save a mesh to a binary little-endian PLY file.
///
/// Use [`ply::save_ascii`] directly for a human-readable file.
pub fn save<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    require_ply(path)?;
    ply::save_binary(mesh, path)
}
