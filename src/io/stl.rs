//! STL (stereolithography) format support.
//!
//! STL stores a triangle soup. Loading welds corners with identical
//! coordinates (see [`build_from_soup`]); face `i` of the loaded mesh is
//! facet `i` of the file. A facet that collapses when welded is rejected
//! with [`VvError::RepeatedVertex`]. Saving writes binary STL with `f32`
//! coordinates.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use nalgebra::Point3;
use tracing::debug;

use crate::error::{Result, VvError};
use crate::mesh::{build_from_soup, TriangleMesh};

/// Load a mesh from an STL file (ASCII or binary).
///
/// # Example
///
/// ```no_run
/// use vvcurv::io::stl;
///
/// let mesh = stl::load("membrane.stl").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| VvError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let corner = |i: usize| {
        stl.vertices.get(i).map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
    };

    let mut soup: Vec<[Point3<f64>; 3]> = Vec::with_capacity(stl.faces.len());
    for (fi, tri) in stl.faces.iter().enumerate() {
        let [a, b, c] = tri.vertices;
        let (Some(p0), Some(p1), Some(p2)) = (corner(a), corner(b), corner(c)) else {
            return Err(VvError::LoadError {
                path: path.to_path_buf(),
                message: format!("triangle {fi} references a missing vertex"),
            });
        };
        soup.push([p0, p1, p2]);
    }

    if soup.is_empty() {
        return Err(VvError::LoadError {
            path: path.to_path_buf(),
            message: "STL file contains no triangles".to_string(),
        });
    }
    debug!(facets = soup.len(), path = %path.display(), "read STL facets");

    build_from_soup(&soup)
}

/// Save a mesh to a binary STL file.
pub fn save<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let vertex = |p: &Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
    let triangles: Vec<stl_io::Triangle> = mesh
        .face_ids()
        .map(|f| {
            let [p0, p1, p2] = mesh.face_positions(f);
            let n = mesh.face_normal(f).unwrap_or_else(nalgebra::Vector3::zeros);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(&p0), vertex(&p1), vertex(&p2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| VvError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::scratch_path;
    use crate::synthetic;

    #[test]
    fn test_save_and_load_welds_corners() {
        let mesh = synthetic::icosphere(1.0, 1).unwrap();
        let path = scratch_path("sphere.stl");
        save(&mesh, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.num_faces(), mesh.num_faces());
        assert_eq!(loaded.num_vertices(), mesh.num_vertices());
        assert!(loaded.is_closed());
        assert!((loaded.total_area() - mesh.total_area()).abs() < 1e-4);
        std::fs::remove_file(&path).ok();
    }

    fn facet(p: [[f32; 3]; 3]) -> stl_io::Triangle {
        stl_io::Triangle {
            normal: stl_io::Normal::new([0.0, 0.0, 1.0]),
            vertices: p.map(stl_io::Vertex::new),
        }
    }

    fn write_facets(name: &str, facets: &[stl_io::Triangle]) -> std::path::PathBuf {
        let path = scratch_path(name);
        let mut file = File::create(&path).unwrap();
        stl_io::write_stl(&mut file, facets.iter()).unwrap();
        path
    }

    #[test]
    fn test_faces_follow_facet_order() {
        let facets = [
            facet([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
            facet([[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
            facet([[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 1.0, 0.0]]),
        ];
        let path = write_facets("facet_order.stl", &facets);
        let mesh = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(mesh.num_faces(), facets.len());
        for (fi, f) in facets.iter().enumerate() {
            let positions = mesh.face_positions(crate::mesh::FaceId::new(fi));
            for (p, v) in positions.iter().zip(f.vertices.iter()) {
                assert_eq!([p.x as f32, p.y as f32, p.z as f32], [v[0], v[1], v[2]]);
            }
        }
    }

    #[test]
    fn test_collapsed_facet_is_rejected() {
        let facets = [
            facet([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
            facet([[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
        ];
        let path = write_facets("collapsed.stl", &facets);
        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, VvError::RepeatedVertex { face: 1, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
    }

    #[test]
    fn test_garbage_is_a_load_error() {
        let path = scratch_path("garbage.stl");
        std::fs::write(&path, b"not an stl file").unwrap();
        assert!(load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
