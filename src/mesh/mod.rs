//! Input mesh representation.
//!
//! The curvature engine consumes an indexed triangle mesh: a list of vertex
//! positions plus a list of triangles referencing them, with one area per
//! triangle. [`TriangleMesh`] holds exactly that and nothing more; it is
//! immutable once built.
//!
//! # Construction
//!
//! ```
//! use vvcurv::mesh::{build_from_triangles, TriangleMesh};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: TriangleMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_faces(), 1);
//! assert!((mesh.face_area(0.into()) - 0.5).abs() < 1e-12);
//! ```
//!
//! Meshes that come as a triangle soup (three positions per triangle, as in
//! STL files) are welded on exact position equality by [`build_from_soup`].

mod builder;
mod index;
mod triangle_mesh;

pub use builder::{build_from_soup, build_from_triangles, build_with_areas, to_face_vertex};
pub use index::{FaceId, NodeId, VertexId};
pub use triangle_mesh::TriangleMesh;
