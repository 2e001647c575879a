//! Triangle graph construction.

use std::sync::Arc;

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use super::{Adjacency, Csr, GraphNode, GraphOptions, TriangleGraph};
use crate::error::Result;
use crate::mesh::{FaceId, NodeId, TriangleMesh};

/// Relative area below which a triangle counts as degenerate.
///
/// A triangle is degenerate when its area is at most this fraction of the
/// largest triangle area in the mesh, or when its corners are collinear.
pub const DEGENERATE_AREA_TOLERANCE: f64 = 1e-12;

/// Build the triangle adjacency graph of a mesh.
///
/// Node `i` represents face `i`. Degenerate triangles are kept as nodes
/// (with a NaN normal and the `degenerate` flag) so that every output stays
/// index-aligned with the mesh.
///
/// # Errors
/// Returns a configuration error if `options` is invalid.
pub fn build_graph(mesh: &TriangleMesh, options: &GraphOptions) -> Result<TriangleGraph> {
    options.validate()?;

    let scaled;
    let mesh = if options.scale != 1.0 {
        scaled = mesh.scaled(options.scale);
        &scaled
    } else {
        mesh
    };

    let max_area = mesh.areas().iter().copied().fold(0.0_f64, f64::max);
    let area_floor = max_area * DEGENERATE_AREA_TOLERANCE;
    let sign = if options.reverse_normals { -1.0 } else { 1.0 };

    let mut nodes: Vec<GraphNode> = mesh
        .face_ids()
        .map(|f| {
            let area = mesh.face_area(f);
            let normal = mesh.face_normal(f);
            let degenerate = normal.is_none() || area <= area_floor;
            GraphNode {
                position: mesh.face_centroid(f),
                normal: match normal {
                    Some(n) if !degenerate => n * sign,
                    _ => Vector3::repeat(f64::NAN),
                },
                area,
                degenerate,
                on_border: false,
            }
        })
        .collect();

    let edge_faces = mesh.edge_faces();
    for faces in edge_faces.values() {
        if faces.len() == 1 {
            nodes[faces[0].index()].on_border = true;
        }
    }

    let lists = match options.adjacency {
        Adjacency::SharedVertex => shared_vertex_lists(mesh),
        Adjacency::SharedEdge => {
            let mut lists = vec![Vec::new(); mesh.num_faces()];
            for faces in edge_faces.values() {
                if let [a, b] = faces.as_slice() {
                    lists[a.index()].push(NodeId::from(*b));
                    lists[b.index()].push(NodeId::from(*a));
                }
            }
            for list in &mut lists {
                list.sort_unstable();
            }
            lists
        }
    };

    let adjacency = compress(&nodes, lists);

    let graph = TriangleGraph {
        nodes,
        adjacency: Arc::new(adjacency),
        max_area,
    };

    info!(
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        adjacency = ?options.adjacency,
        "built triangle graph"
    );
    let degenerate = graph.num_degenerate();
    if degenerate > 0 {
        warn!(degenerate, "graph contains zero-area triangles");
    }
    debug!(
        border = graph.border_nodes().len(),
        max_area = graph.max_area(),
        "graph statistics"
    );

    Ok(graph)
}

/// For every face, the sorted set of other faces sharing a vertex with it.
fn shared_vertex_lists(mesh: &TriangleMesh) -> Vec<Vec<NodeId>> {
    let incident = mesh.vertex_faces();
    mesh.face_ids()
        .map(|f| {
            let mut list: Vec<NodeId> = mesh
                .face_triangle(f)
                .iter()
                .flat_map(|v| incident[v.index()].iter().copied())
                .filter(|&g: &FaceId| g != f)
                .map(NodeId::from)
                .collect();
            list.sort_unstable();
            list.dedup();
            list
        })
        .collect()
}

/// Flatten sorted adjacency lists and attach centroid distances.
fn compress(nodes: &[GraphNode], lists: Vec<Vec<NodeId>>) -> Csr {
    let total: usize = lists.iter().map(Vec::len).sum();
    let mut offsets = Vec::with_capacity(lists.len() + 1);
    let mut targets = Vec::with_capacity(total);
    let mut weights = Vec::with_capacity(total);

    offsets.push(0);
    for (i, list) in lists.into_iter().enumerate() {
        let p = nodes[i].position;
        for m in list {
            weights.push((nodes[m.index()].position - p).norm());
            targets.push(m);
        }
        offsets.push(targets.len());
    }

    Csr {
        offsets,
        targets,
        weights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_meshes::grid;
    use crate::mesh::{build_from_triangles, build_with_areas};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_shared_vertex_vs_shared_edge() {
        let mesh = grid(3);
        let by_vertex = build_graph(&mesh, &GraphOptions::default()).unwrap();
        let by_edge = build_graph(
            &mesh,
            &GraphOptions::default().with_adjacency(Adjacency::SharedEdge),
        )
        .unwrap();

        // An interior triangle of a regular grid touches 12 others through its
        // corners but only 3 through its edges
        let interior = NodeId::new(8);
        assert_eq!(by_edge.degree(interior), 3);
        assert!(by_vertex.degree(interior) > by_edge.degree(interior));
        assert!(by_vertex.num_edges() > by_edge.num_edges());
    }

    #[test]
    fn test_border_flags() {
        let mesh = grid(3);
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();
        // Lower-left square: its first triangle lies on the bottom edge
        assert!(graph.node(NodeId::new(0)).on_border);
        // The centre square has no border edge
        assert!(!graph.node(NodeId::new(8)).on_border);
        assert!(!graph.node(NodeId::new(9)).on_border);
    }

    #[test]
    fn test_reverse_normals() {
        let mesh = grid(1);
        let graph = build_graph(
            &mesh,
            &GraphOptions::default().with_reverse_normals(true),
        )
        .unwrap();
        assert_relative_eq!(*graph.normal(NodeId::new(0)), -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_scale() {
        let mesh = grid(1);
        let graph = build_graph(&mesh, &GraphOptions::default().with_scale(2.0)).unwrap();
        assert_relative_eq!(graph.max_area(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            *graph.position(NodeId::new(0)),
            Point3::new(4.0 / 3.0, 2.0 / 3.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_degenerate_triangle_flagged() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        // Second triangle is collinear
        let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 1, 3]]).unwrap();
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();

        let bad = graph.node(NodeId::new(1));
        assert!(bad.degenerate);
        assert!(bad.normal.x.is_nan());
        assert!(!bad.is_usable());
        assert!(graph.node(NodeId::new(0)).is_usable());
    }

    #[test]
    fn test_zero_supplied_area_is_degenerate() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let mesh = build_with_areas(&vertices, &[[0, 1, 2], [1, 3, 2]], &[1.0, 0.0]).unwrap();
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();
        assert!(!graph.node(NodeId::new(0)).degenerate);
        assert!(graph.node(NodeId::new(1)).degenerate);
        assert_eq!(graph.num_degenerate(), 1);
    }
}
