//! Mesh construction utilities.
//!
//! This module builds [`TriangleMesh`]es from face-vertex lists (as found in
//! indexed formats like PLY) and from triangle soups (as found in STL).
//! All input validation happens here, so everything downstream may assume a
//! well-formed mesh.

use std::collections::HashMap;

use nalgebra::Point3;

use super::index::VertexId;
use super::triangle_mesh::{edge_key, TriangleMesh};
use crate::error::{Result, VvError};

/// Build a triangle mesh from vertices and triangle faces.
///
/// Triangle areas are computed from the vertex positions.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// # Errors
/// * [`VvError::EmptyMesh`] if there are no faces
/// * [`VvError::InvalidVertexIndex`] if a face references a missing vertex
/// * [`VvError::RepeatedVertex`] if a face uses a vertex twice
/// * [`VvError::NonManifoldEdge`] if an edge has more than two faces
/// * [`VvError::NonFiniteInput`] if a referenced position is NaN or infinite
pub fn build_from_triangles(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<TriangleMesh> {
    let mut mesh = assemble(vertices, faces)?;
    let areas = mesh.face_ids().map(|f| mesh.geometric_area(f)).collect();
    mesh.areas = areas;
    Ok(mesh)
}

/// Build a triangle mesh with caller-supplied triangle areas.
///
/// Same validation as [`build_from_triangles`]; in addition `areas` must have
/// one finite, non-negative entry per face.
pub fn build_with_areas(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
    areas: &[f64],
) -> Result<TriangleMesh> {
    if areas.len() != faces.len() {
        return Err(VvError::AreaCountMismatch {
            faces: faces.len(),
            areas: areas.len(),
        });
    }
    for (fi, &a) in areas.iter().enumerate() {
        if !a.is_finite() {
            return Err(VvError::NonFiniteInput(format!("area of triangle {fi} is {a}")));
        }
        if a < 0.0 {
            return Err(VvError::NegativeArea { face: fi, area: a });
        }
    }

    let mut mesh = assemble(vertices, faces)?;
    mesh.areas = areas.to_vec();
    Ok(mesh)
}

/// Build a triangle mesh from a triangle soup.
///
/// Each triangle is given by its three corner positions. Corners with
/// bit-identical coordinates are welded into a single vertex (`-0.0` and
/// `0.0` are treated as equal). Face order is preserved, so face `i` of the
/// result is `triangles[i]`.
pub fn build_from_soup(triangles: &[[Point3<f64>; 3]]) -> Result<TriangleMesh> {
    if triangles.is_empty() {
        return Err(VvError::EmptyMesh);
    }

    let mut lookup: HashMap<[u64; 3], usize> = HashMap::with_capacity(triangles.len() * 3);
    let mut vertices = Vec::new();
    let mut faces = Vec::with_capacity(triangles.len());

    for (ti, tri) in triangles.iter().enumerate() {
        let mut face = [0usize; 3];
        for (k, p) in tri.iter().enumerate() {
            if !p.coords.iter().all(|c| c.is_finite()) {
                return Err(VvError::NonFiniteInput(format!(
                    "corner {k} of triangle {ti} is {p}"
                )));
            }
            // Adding 0.0 maps -0.0 to 0.0
            let key = [
                (p.x + 0.0).to_bits(),
                (p.y + 0.0).to_bits(),
                (p.z + 0.0).to_bits(),
            ];
            face[k] = *lookup.entry(key).or_insert_with(|| {
                vertices.push(*p);
                vertices.len() - 1
            });
        }
        faces.push(face);
    }

    build_from_triangles(&vertices, &faces)
}

/// Validate the connectivity and wrap it into a mesh with empty areas.
fn assemble(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<TriangleMesh> {
    if faces.is_empty() {
        return Err(VvError::EmptyMesh);
    }

    let mut referenced = vec![false; vertices.len()];
    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(VvError::InvalidVertexIndex { face: fi, vertex: vi });
            }
            referenced[vi] = true;
        }
        if face[0] == face[1] || face[0] == face[2] {
            return Err(VvError::RepeatedVertex {
                face: fi,
                vertex: face[0],
            });
        }
        if face[1] == face[2] {
            return Err(VvError::RepeatedVertex {
                face: fi,
                vertex: face[1],
            });
        }
    }

    for (vi, p) in vertices.iter().enumerate() {
        if referenced[vi] && !p.coords.iter().all(|c| c.is_finite()) {
            return Err(VvError::NonFiniteInput(format!("vertex {vi} is {p}")));
        }
    }

    let faces: Vec<[VertexId; 3]> = faces
        .iter()
        .map(|&[a, b, c]| [VertexId::new(a), VertexId::new(b), VertexId::new(c)])
        .collect();

    check_manifold_edges(&faces)?;

    Ok(TriangleMesh {
        vertices: vertices.to_vec(),
        faces,
        areas: Vec::new(),
    })
}

/// Reject edges shared by more than two triangles.
///
/// Faces are scanned in order, so the reported edge is the first one to
/// receive its third triangle.
fn check_manifold_edges(faces: &[[VertexId; 3]]) -> Result<()> {
    let mut counts: HashMap<(VertexId, VertexId), usize> = HashMap::with_capacity(faces.len() * 2);
    for face in faces {
        for k in 0..3 {
            let key = edge_key(face[k], face[(k + 1) % 3]);
            let count = counts.entry(key).or_insert(0);
            *count += 1;
            if *count > 2 {
                return Err(VvError::NonManifoldEdge {
                    v0: key.0.index(),
                    v1: key.1.index(),
                    count: *count,
                });
            }
        }
    }
    Ok(())
}

/// Convert a triangle mesh back to a face-vertex representation.
///
/// Returns (vertices, faces) tuple.
pub fn to_face_vertex(mesh: &TriangleMesh) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    (mesh.positions().to_vec(), mesh.raw_faces())
}
