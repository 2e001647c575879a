//! # vvcurv
//!
//! Vector Voting curvature estimation on triangle meshes.
//!
//! vvcurv estimates principal curvatures, principal directions and derived
//! shape descriptors for every triangle of a (possibly large and noisy)
//! surface mesh, such as a membrane segmented from volumetric imaging.
//!
//! ## Pipeline
//!
//! 1. The mesh is turned into a [`TriangleGraph`](graph::TriangleGraph):
//!    one node per triangle at its centroid, edges between adjacent
//!    triangles weighted by centroid distance.
//! 2. For every node, a geodesic neighborhood of radius `π/2 · radius_hit`
//!    is collected and weighted by area and distance.
//! 3. **Pass 1** lets every neighbor vote for the node's normal; the refined
//!    normal is the dominant direction of the accumulated tensor.
//! 4. **Pass 2** estimates the principal curvatures from the refined normals
//!    with one of three [`Variant`](algo::Variant)s: AVV, SSVV or RVV.
//!
//! Both passes run in parallel on a fixed-size worker pool; results do not
//! depend on the number of workers.
//!
//! ## Quick Start
//!
//! ```
//! use vvcurv::prelude::*;
//!
//! let mesh = vvcurv::synthetic::icosphere(10.0, 2).unwrap();
//! let options = VotingOptions::new(8.0).with_variant(Variant::Ssvv);
//! let result = estimate_curvature(&mesh, &options).unwrap();
//!
//! let kappa = result.summary(Attribute::Kappa1);
//! assert!((kappa.mean - 0.1).abs() < 0.02);
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use vvcurv::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1],  // bottom
//!     [0, 1, 3],  // front
//!     [1, 2, 3],  // right
//!     [2, 0, 3],  // left
//! ];
//!
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_faces(), 4);
//! assert!(mesh.is_closed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod graph;
pub mod io;
pub mod mesh;
pub mod synthetic;

/// Prelude module for convenient imports.
///
/// ```
/// use vvcurv::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{
        estimate_curvature, estimate_curvature_with_progress, Attribute, CurvatureResult,
        InvalidReason, Progress, ShapeCategory, ShapeClass, Variant, VotingOptions,
    };
    pub use crate::error::{Result, VvError};
    pub use crate::graph::{build_graph, Adjacency, GraphOptions, TriangleGraph};
    pub use crate::mesh::{
        build_from_soup, build_from_triangles, FaceId, NodeId, TriangleMesh, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

        let mesh = build_from_triangles(&vertices, &faces).unwrap();
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();

        assert_eq!(graph.num_nodes(), 4);
        // Every pair of faces of a tetrahedron shares an edge
        assert_eq!(graph.num_edges(), 6);
        assert!(graph.border_nodes().is_empty());
    }
}
