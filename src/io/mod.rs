//! Mesh and attribute file I/O.
//!
//! Thin adapters between files and the core types. The voting passes never
//! touch the file system.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | PLY | `.ply` | ✓ | ✓ | Indexed; saving can attach per-face attributes |
//! | STL | `.stl` | ✓ | ✓ | Binary and ASCII; triangle soup, welded on load |
//!
//! Per-face attributes can also be written as plain text, one value per line
//! (see [`attributes`]).
//!
//! # Usage
//!
//! ```no_run
//! use vvcurv::algo::{estimate_curvature, VotingOptions};
//! use vvcurv::io::{load, save_result};
//!
//! let mesh = load("membrane.ply").unwrap();
//! let result = estimate_curvature(&mesh, &VotingOptions::new(10.0)).unwrap();
//! save_result(&mesh, &result, "membrane.curvature.ply").unwrap();
//! ```

pub mod attributes;
pub mod ply;
pub mod stl;

use std::path::Path;

use crate::algo::CurvatureResult;
use crate::error::{Result, VvError};
use crate::mesh::TriangleMesh;

pub use attributes::{write_attributes, write_values, write_vectors};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// STL (stereolithography) format.
    Stl,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "stl" => Some(Format::Stl),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| VvError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh with automatic format detection.
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Stl => stl::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh with automatic format detection.
pub fn save<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Stl => stl::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }
}

/// Save a mesh together with its curvature attributes.
///
/// Only PLY can carry per-face attributes.
pub fn save_result<P: AsRef<Path>>(
    mesh: &TriangleMesh,
    result: &CurvatureResult,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Ply => ply::save_with_attributes(mesh, result, path),
        Format::Stl => Err(VvError::SaveError {
            path: path.to_path_buf(),
            message: "STL cannot store per-face attributes, use .ply".to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) fn scratch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("vvcurv-{}-{name}", std::process::id()))
}
