//! Indexed triangle mesh.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use super::index::{FaceId, VertexId};

/// An immutable indexed triangle mesh with one area per triangle.
///
/// Areas are either computed from the geometry or supplied by the caller
/// (for instance when triangle areas were measured in a different unit).
/// Vertices that no triangle references are allowed and simply ignored by
/// everything downstream.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub(crate) vertices: Vec<Point3<f64>>,
    pub(crate) faces: Vec<[VertexId; 3]>,
    pub(crate) areas: Vec<f64>,
}

impl TriangleMesh {
    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertices[v.index()]
    }

    /// All vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Get the three vertices of a triangle.
    #[inline]
    pub fn face_triangle(&self, f: FaceId) -> [VertexId; 3] {
        self.faces[f.index()]
    }

    /// Get the three corner positions of a triangle.
    #[inline]
    pub fn face_positions(&self, f: FaceId) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[f.index()];
        [
            self.vertices[a.index()],
            self.vertices[b.index()],
            self.vertices[c.index()],
        ]
    }

    /// Area of a triangle.
    #[inline]
    pub fn face_area(&self, f: FaceId) -> f64 {
        self.areas[f.index()]
    }

    /// All triangle areas, index-aligned with the faces.
    #[inline]
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    /// Total surface area.
    pub fn total_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// Centroid of a triangle.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Unit normal of a triangle, following the winding order.
    ///
    /// Returns `None` for triangles whose corners are collinear.
    pub fn face_normal(&self, f: FaceId) -> Option<Vector3<f64>> {
        let n = self.face_cross(f);
        let len = n.norm();
        if len > f64::MIN_POSITIVE && len.is_finite() {
            Some(n / len)
        } else {
            None
        }
    }

    /// Area of a triangle computed from its corner positions.
    pub fn geometric_area(&self, f: FaceId) -> f64 {
        0.5 * self.face_cross(f).norm()
    }

    fn face_cross(&self, f: FaceId) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Triangles incident to each vertex, in increasing face order.
    pub fn vertex_faces(&self) -> Vec<Vec<FaceId>> {
        let mut incident = vec![Vec::new(); self.vertices.len()];
        for (fi, face) in self.faces.iter().enumerate() {
            for v in face {
                incident[v.index()].push(FaceId::new(fi));
            }
        }
        incident
    }

    /// Undirected edges with the triangles using them.
    ///
    /// Keys are `(min, max)` vertex pairs.
    pub(crate) fn edge_faces(&self) -> HashMap<(VertexId, VertexId), Vec<FaceId>> {
        let mut edges: HashMap<(VertexId, VertexId), Vec<FaceId>> = HashMap::new();
        for (fi, face) in self.faces.iter().enumerate() {
            for k in 0..3 {
                let key = edge_key(face[k], face[(k + 1) % 3]);
                edges.entry(key).or_default().push(FaceId::new(fi));
            }
        }
        edges
    }

    /// Edges used by exactly one triangle, sorted.
    pub fn boundary_edges(&self) -> Vec<(VertexId, VertexId)> {
        let mut boundary: Vec<_> = self
            .edge_faces()
            .into_iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(key, _)| key)
            .collect();
        boundary.sort_unstable();
        boundary
    }

    /// Check if the mesh has no boundary edges.
    pub fn is_closed(&self) -> bool {
        self.edge_faces().values().all(|faces| faces.len() != 1)
    }

    /// Axis-aligned bounding box of the referenced and unreferenced vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let (min, max) = self
            .vertices
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        Some((min, max))
    }

    /// Copy of this mesh with every position multiplied by `factor`.
    ///
    /// Areas scale by `factor²`.
    pub fn scaled(&self, factor: f64) -> TriangleMesh {
        TriangleMesh {
            vertices: self
                .vertices
                .iter()
                .map(|p| Point3::from(p.coords * factor))
                .collect(),
            faces: self.faces.clone(),
            areas: self.areas.iter().map(|a| a * factor * factor).collect(),
        }
    }

    /// Copy of this mesh with every triangle's winding reversed.
    pub fn flipped(&self) -> TriangleMesh {
        TriangleMesh {
            vertices: self.vertices.clone(),
            faces: self.faces.iter().map(|&[a, b, c]| [a, c, b]).collect(),
            areas: self.areas.clone(),
        }
    }

    /// Faces as raw `[usize; 3]` triples.
    pub fn raw_faces(&self) -> Vec<[usize; 3]> {
        self.faces
            .iter()
            .map(|&[a, b, c]| [a.index(), b.index(), c.index()])
            .collect()
    }
}

#[inline]
pub(crate) fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
