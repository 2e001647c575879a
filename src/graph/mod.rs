//! Triangle adjacency graph.
//!
//! The voting passes do not work on mesh vertices but on triangles: every
//! triangle becomes one graph node located at its centroid, carrying the
//! triangle's area and normal. Two nodes are joined by an undirected edge when
//! their triangles are adjacent (see [`Adjacency`]), weighted by the distance
//! between the centroids.
//!
//! The graph is immutable. The normal-estimation pass produces a new snapshot
//! with refined normals through [`TriangleGraph::with_normals`]; the
//! adjacency structure is shared between snapshots.
//!
//! # Example
//!
//! ```
//! use vvcurv::graph::{build_graph, GraphOptions};
//! use vvcurv::mesh::{build_from_triangles, NodeId};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//! let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();
//!
//! assert_eq!(graph.num_nodes(), 2);
//! assert_eq!(graph.num_edges(), 1);
//! assert!(graph.node(NodeId::new(0)).on_border);
//! ```

mod builder;
mod geodesic;

use std::sync::Arc;

use nalgebra::{Point3, Vector3};

pub use builder::{build_graph, DEGENERATE_AREA_TOLERANCE};
pub use geodesic::{
    border_distances, connected_components, neighborhood, search_radius, Components, Neighbor,
    Neighborhood, NeighborhoodOptions, NeighborhoodSearch,
};

use crate::error::{Result, VvError};
use crate::mesh::NodeId;

/// Which triangles count as adjacent when building the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Adjacency {
    /// Triangles sharing at least one mesh vertex.
    #[default]
    SharedVertex,
    /// Triangles sharing a full mesh edge.
    SharedEdge,
}

/// Options for building a [`TriangleGraph`].
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Adjacency rule for graph edges.
    pub adjacency: Adjacency,

    /// Flip every initial triangle normal.
    pub reverse_normals: bool,

    /// Factor applied to all positions before building (areas scale by its
    /// square). Must be finite and positive.
    pub scale: f64,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            adjacency: Adjacency::SharedVertex,
            reverse_normals: false,
            scale: 1.0,
        }
    }
}

impl GraphOptions {
    /// Set the adjacency rule.
    pub fn with_adjacency(mut self, adjacency: Adjacency) -> Self {
        self.adjacency = adjacency;
        self
    }

    /// Flip all initial normals.
    pub fn with_reverse_normals(mut self, reverse: bool) -> Self {
        self.reverse_normals = reverse;
        self
    }

    /// Set the position scale factor.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Check the options for invalid values.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(VvError::invalid_param(
                "scale",
                self.scale,
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Per-triangle node attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphNode {
    /// Triangle centroid.
    pub position: Point3<f64>,
    /// Unit normal. All components are NaN for degenerate triangles.
    pub normal: Vector3<f64>,
    /// Triangle area.
    pub area: f64,
    /// The triangle has (numerically) zero area.
    pub degenerate: bool,
    /// The triangle has a mesh edge no other triangle uses.
    pub on_border: bool,
}

impl GraphNode {
    /// Whether this node may contribute votes.
    #[inline]
    pub fn is_usable(&self) -> bool {
        !self.degenerate && self.normal.iter().all(|c| c.is_finite())
    }
}

/// Compressed adjacency lists.
#[derive(Debug)]
struct Csr {
    offsets: Vec<usize>,
    targets: Vec<NodeId>,
    weights: Vec<f64>,
}

/// An immutable weighted graph with one node per mesh triangle.
#[derive(Debug, Clone)]
pub struct TriangleGraph {
    nodes: Vec<GraphNode>,
    adjacency: Arc<Csr>,
    max_area: f64,
}

impl TriangleGraph {
    /// Get the number of nodes (equal to the mesh triangle count).
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.adjacency.targets.len() / 2
    }

    /// Iterate over all node IDs.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Get a node's attributes.
    #[inline]
    pub fn node(&self, n: NodeId) -> &GraphNode {
        &self.nodes[n.index()]
    }

    /// All nodes, index-aligned with the mesh triangles.
    #[inline]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Get a node's position.
    #[inline]
    pub fn position(&self, n: NodeId) -> &Point3<f64> {
        &self.nodes[n.index()].position
    }

    /// Get a node's normal.
    #[inline]
    pub fn normal(&self, n: NodeId) -> &Vector3<f64> {
        &self.nodes[n.index()].normal
    }

    /// Number of neighbors of a node.
    #[inline]
    pub fn degree(&self, n: NodeId) -> usize {
        let i = n.index();
        self.adjacency.offsets[i + 1] - self.adjacency.offsets[i]
    }

    /// Iterate over the neighbors of a node with the edge weights, in
    /// increasing node order.
    pub fn neighbors(&self, n: NodeId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        let i = n.index();
        let range = self.adjacency.offsets[i]..self.adjacency.offsets[i + 1];
        self.adjacency.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.adjacency.weights[range].iter().copied())
    }

    /// Largest triangle area in the graph.
    #[inline]
    pub fn max_area(&self) -> f64 {
        self.max_area
    }

    /// Nodes whose triangle touches the mesh border.
    pub fn border_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&n| self.nodes[n.index()].on_border)
            .collect()
    }

    /// Number of degenerate (zero-area) nodes.
    pub fn num_degenerate(&self) -> usize {
        self.nodes.iter().filter(|n| n.degenerate).count()
    }

    /// New snapshot of this graph with replaced normals.
    ///
    /// The adjacency is shared with `self`. Non-finite entries in `normals`
    /// are kept as they are; callers use NaN to mark nodes without a usable
    /// normal.
    pub fn with_normals(&self, normals: Vec<Vector3<f64>>) -> Result<TriangleGraph> {
        if normals.len() != self.nodes.len() {
            return Err(VvError::LengthMismatch {
                expected: self.nodes.len(),
                got: normals.len(),
            });
        }
        let nodes = self
            .nodes
            .iter()
            .zip(normals)
            .map(|(node, normal)| GraphNode { normal, ..*node })
            .collect();
        Ok(TriangleGraph {
            nodes,
            adjacency: Arc::clone(&self.adjacency),
            max_area: self.max_area,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_meshes::grid;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_graph_counts() {
        let mesh = grid(2);
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();
        assert_eq!(graph.num_nodes(), 8);
        assert!(graph.num_edges() > 0);
        assert_relative_eq!(graph.max_area(), 0.5, epsilon = 1e-12);
        assert_eq!(graph.num_degenerate(), 0);
    }

    #[test]
    fn test_edges_symmetric() {
        let mesh = grid(3);
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();
        for n in graph.node_ids() {
            for (m, w) in graph.neighbors(n) {
                assert!(w >= 0.0);
                let back = graph.neighbors(m).find(|&(k, _)| k == n);
                let (_, w_back) = back.expect("edge must be symmetric");
                assert_eq!(w, w_back);
                let d = (graph.position(n) - graph.position(m)).norm();
                assert_relative_eq!(w, d, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_with_normals_snapshot() {
        let mesh = grid(1);
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();
        let flipped: Vec<_> = graph.nodes().iter().map(|n| -n.normal).collect();
        let snapshot = graph.with_normals(flipped).unwrap();

        assert_relative_eq!(*graph.normal(NodeId::new(0)), Vector3::z());
        assert_relative_eq!(*snapshot.normal(NodeId::new(0)), -Vector3::z());
        assert_eq!(snapshot.num_edges(), graph.num_edges());

        let err = graph.with_normals(vec![Vector3::z()]).unwrap_err();
        assert!(matches!(
            err,
            VvError::LengthMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_invalid_scale() {
        let mesh = grid(1);
        let options = GraphOptions::default().with_scale(0.0);
        assert!(build_graph(&mesh, &options).is_err());
    }
}
