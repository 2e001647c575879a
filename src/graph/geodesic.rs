//! Geodesic neighborhoods on the triangle graph.
//!
//! Geodesic distances are approximated by shortest paths along graph edges
//! (centroid to centroid), computed with Dijkstra's algorithm. A neighborhood
//! search is bounded: it never looks past the requested radius, so its cost
//! depends on the neighborhood size and not on the graph size.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::f64::consts::FRAC_PI_2;

use super::TriangleGraph;
use crate::mesh::NodeId;

/// Geodesic search bound derived from the radius of the feature of interest.
///
/// The bound is a quarter of the circumference of a circle with radius
/// `radius_hit`, so a neighborhood on a sphere of that radius spans a
/// quarter great circle in every direction.
#[inline]
pub fn search_radius(radius_hit: f64) -> f64 {
    FRAC_PI_2 * radius_hit
}

/// Options for a geodesic neighborhood query.
#[derive(Debug, Clone)]
pub struct NeighborhoodOptions {
    /// Maximal geodesic distance of a neighbor.
    pub radius: f64,

    /// Scale each weight by `area / max_area`.
    pub area_weighting: bool,

    /// Scale each weight by `max(0, n_query · n_neighbor)`.
    pub normal_bias: bool,
}

impl Default for NeighborhoodOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            area_weighting: true,
            normal_bias: false,
        }
    }
}

impl NeighborhoodOptions {
    /// Options for the given radius with area weighting and no normal bias.
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }

    /// Set the search radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Enable or disable area weighting.
    pub fn with_area_weighting(mut self, enabled: bool) -> Self {
        self.area_weighting = enabled;
        self
    }

    /// Enable or disable normal-angle bias.
    pub fn with_normal_bias(mut self, enabled: bool) -> Self {
        self.normal_bias = enabled;
        self
    }
}

/// One member of a geodesic neighborhood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// The neighbor node.
    pub node: NodeId,
    /// Geodesic distance from the query node.
    pub distance: f64,
    /// Vote weight, non-negative.
    pub weight: f64,
}

/// Weighted geodesic neighborhood of a node.
///
/// Entries are sorted by increasing distance (ties by node index), so the
/// query node always comes first.
#[derive(Debug, Clone, Default)]
pub struct Neighborhood {
    entries: Vec<Neighbor>,
}

impl Neighborhood {
    /// All entries, query node first.
    #[inline]
    pub fn entries(&self) -> &[Neighbor] {
        &self.entries
    }

    /// Entries other than the query node.
    #[inline]
    pub fn others(&self) -> &[Neighbor] {
        self.entries.get(1..).unwrap_or(&[])
    }

    /// Number of entries including the query node.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the neighborhood is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries other than the query node with positive weight.
    pub fn num_voters(&self) -> usize {
        self.others().iter().filter(|n| n.weight > 0.0).count()
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|n| n.weight).sum()
    }

    /// Check if a node is part of the neighborhood.
    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|n| n.node == node)
    }
}

/// Entry in the Dijkstra priority queue.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    node: usize,
    distance: f64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior; equal distances pop the lower index first
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Reusable scratch space for neighborhood queries.
///
/// Each worker owns one search object; its buffers are sized to the graph
/// once and reset incrementally after every query.
#[derive(Debug)]
pub struct NeighborhoodSearch<'g> {
    graph: &'g TriangleGraph,
    distances: Vec<f64>,
    settled: Vec<bool>,
    touched: Vec<usize>,
    heap: BinaryHeap<QueueEntry>,
}

impl<'g> NeighborhoodSearch<'g> {
    /// Create a search over `graph`.
    pub fn new(graph: &'g TriangleGraph) -> Self {
        let n = graph.num_nodes();
        Self {
            graph,
            distances: vec![f64::INFINITY; n],
            settled: vec![false; n],
            touched: Vec::new(),
            heap: BinaryHeap::new(),
        }
    }

    /// The graph this search runs on.
    #[inline]
    pub fn graph(&self) -> &'g TriangleGraph {
        self.graph
    }

    /// Collect the weighted geodesic neighborhood of `source`.
    ///
    /// Nodes are visited in increasing distance order and included while
    /// their distance does not exceed `options.radius`. With `σ = radius / 3`
    /// each entry gets the weight
    ///
    /// `w = (area / max_area) · exp(−g / σ)`
    ///
    /// (the area factor only with `area_weighting`), further multiplied by
    /// `max(0, n_source · n)` with `normal_bias`. Degenerate nodes and nodes
    /// with a non-finite normal get weight 0 but stay in the list.
    pub fn query(&mut self, source: NodeId, options: &NeighborhoodOptions) -> Neighborhood {
        let mut entries = Vec::new();
        let src = source.index();
        if src >= self.graph.num_nodes() {
            return Neighborhood { entries };
        }

        let radius = options.radius;
        self.relax(src, 0.0);

        while let Some(QueueEntry { node: u, distance }) = self.heap.pop() {
            if self.settled[u] || distance > self.distances[u] {
                continue;
            }
            self.settled[u] = true;
            entries.push(Neighbor {
                node: NodeId::new(u),
                distance,
                weight: 0.0,
            });

            for (v, w) in self.graph.neighbors(NodeId::new(u)) {
                let v = v.index();
                let candidate = distance + w;
                if !self.settled[v] && candidate <= radius && candidate < self.distances[v] {
                    self.relax(v, candidate);
                }
            }
        }

        self.reset();

        for entry in &mut entries {
            entry.weight = self.weight(source, entry, options);
        }
        Neighborhood { entries }
    }

    fn relax(&mut self, node: usize, distance: f64) {
        if self.distances[node].is_infinite() {
            self.touched.push(node);
        }
        self.distances[node] = distance;
        self.heap.push(QueueEntry { node, distance });
    }

    fn reset(&mut self) {
        for &i in &self.touched {
            self.distances[i] = f64::INFINITY;
            self.settled[i] = false;
        }
        self.touched.clear();
        self.heap.clear();
    }

    fn weight(&self, source: NodeId, entry: &Neighbor, options: &NeighborhoodOptions) -> f64 {
        let node = self.graph.node(entry.node);
        if !node.is_usable() {
            return 0.0;
        }

        let sigma = options.radius / 3.0;
        let mut w = if sigma > 0.0 {
            (-entry.distance / sigma).exp()
        } else {
            1.0
        };

        if options.area_weighting {
            let max_area = self.graph.max_area();
            if max_area > 0.0 {
                w *= node.area / max_area;
            }
        }

        if options.normal_bias {
            let dot = self.graph.normal(source).dot(&node.normal);
            w *= if dot.is_finite() { dot.max(0.0) } else { 0.0 };
        }

        w
    }
}

/// Weighted geodesic neighborhood of a single node.
///
/// Convenience wrapper that allocates a fresh [`NeighborhoodSearch`]; use the
/// search object directly when querying many nodes.
pub fn neighborhood(
    graph: &TriangleGraph,
    source: NodeId,
    options: &NeighborhoodOptions,
) -> Neighborhood {
    NeighborhoodSearch::new(graph).query(source, options)
}

/// Geodesic distance of every node to the nearest border node.
///
/// Border nodes have distance 0. On a closed mesh, or for nodes in a
/// component without border, the distance is `f64::INFINITY`.
pub fn border_distances(graph: &TriangleGraph) -> Vec<f64> {
    let n = graph.num_nodes();
    let mut distances = vec![f64::INFINITY; n];
    let mut heap = BinaryHeap::new();

    for source in graph.border_nodes() {
        distances[source.index()] = 0.0;
        heap.push(QueueEntry {
            node: source.index(),
            distance: 0.0,
        });
    }

    while let Some(QueueEntry { node: u, distance }) = heap.pop() {
        if distance > distances[u] {
            continue;
        }
        for (v, w) in graph.neighbors(NodeId::new(u)) {
            let candidate = distance + w;
            if candidate < distances[v.index()] {
                distances[v.index()] = candidate;
                heap.push(QueueEntry {
                    node: v.index(),
                    distance: candidate,
                });
            }
        }
    }

    distances
}

/// Connected components of a triangle graph.
#[derive(Debug, Clone)]
pub struct Components {
    /// Component label of each node. Labels are assigned in order of the
    /// lowest node index in each component.
    pub labels: Vec<usize>,
    /// Number of nodes in each component.
    pub sizes: Vec<usize>,
}

impl Components {
    /// Number of components.
    #[inline]
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Size of the largest component.
    pub fn largest(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }
}

/// Label the connected components of the graph.
pub fn connected_components(graph: &TriangleGraph) -> Components {
    let n = graph.num_nodes();
    let mut labels = vec![usize::MAX; n];
    let mut sizes = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..n {
        if labels[start] != usize::MAX {
            continue;
        }
        let label = sizes.len();
        let mut size = 0;
        labels[start] = label;
        queue.push_back(start);

        while let Some(u) = queue.pop_front() {
            size += 1;
            for (v, _) in graph.neighbors(NodeId::new(u)) {
                if labels[v.index()] == usize::MAX {
                    labels[v.index()] = label;
                    queue.push_back(v.index());
                }
            }
        }
        sizes.push(size);
    }

    Components { labels, sizes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_meshes::grid;
    use crate::graph::{build_graph, GraphOptions};
    use crate::mesh::build_from_triangles;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn grid_graph(n: usize) -> TriangleGraph {
        build_graph(&grid(n), &GraphOptions::default()).unwrap()
    }

    #[test]
    fn test_search_radius() {
        assert_relative_eq!(search_radius(10.0), 5.0 * std::f64::consts::PI);
    }

    #[test]
    fn test_query_node_first() {
        let graph = grid_graph(4);
        let source = NodeId::new(12);
        let hood = neighborhood(&graph, source, &NeighborhoodOptions::new(2.0));

        assert_eq!(hood.entries()[0].node, source);
        assert_eq!(hood.entries()[0].distance, 0.0);
        assert!(hood.len() > 1);
        for pair in hood.entries().windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert!(hood.entries().iter().all(|n| n.distance <= 2.0));
    }

    #[test]
    fn test_weights_decay_with_distance() {
        let graph = grid_graph(4);
        let options = NeighborhoodOptions::new(3.0);
        let hood = neighborhood(&graph, NodeId::new(12), &options);

        // All grid triangles have the same area, so weights only depend on distance
        for n in hood.entries() {
            assert_relative_eq!(n.weight, (-n.distance / 1.0).exp(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_normal_bias_removes_back_facing() {
        // Two triangles folded onto each other with opposite normals
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.1),
        ];
        let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 3, 1]]).unwrap();
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();

        let plain = neighborhood(&graph, NodeId::new(0), &NeighborhoodOptions::new(5.0));
        let biased = neighborhood(
            &graph,
            NodeId::new(0),
            &NeighborhoodOptions::new(5.0).with_normal_bias(true),
        );
        assert_eq!(plain.len(), 2);
        assert!(plain.entries()[1].weight > 0.0);
        assert_eq!(biased.entries()[1].weight, 0.0);
        assert_eq!(biased.num_voters(), 0);
    }

    #[test]
    fn test_isolated_node_singleton() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();

        let hood = neighborhood(&graph, NodeId::new(1), &NeighborhoodOptions::new(100.0));
        assert_eq!(hood.len(), 1);
        assert!(hood.others().is_empty());
    }

    #[test]
    fn test_search_reuse_matches_fresh() {
        let graph = grid_graph(5);
        let options = NeighborhoodOptions::new(2.5);
        let mut search = NeighborhoodSearch::new(&graph);
        for n in graph.node_ids() {
            let reused = search.query(n, &options);
            let fresh = neighborhood(&graph, n, &options);
            assert_eq!(reused.entries(), fresh.entries());
        }
    }

    #[test]
    fn test_radius_monotonic() {
        let graph = grid_graph(5);
        let source = NodeId::new(20);
        let mut previous = 0;
        for r in [0.5, 1.0, 1.5, 2.0, 3.0, 5.0] {
            let hood = neighborhood(&graph, source, &NeighborhoodOptions::new(r));
            assert!(hood.len() >= previous);
            previous = hood.len();
        }
    }

    #[test]
    fn test_border_distances() {
        let graph = grid_graph(4);
        let distances = border_distances(&graph);
        for n in graph.node_ids() {
            if graph.node(n).on_border {
                assert_eq!(distances[n.index()], 0.0);
            } else {
                assert!(distances[n.index()] > 0.0);
                assert!(distances[n.index()].is_finite());
            }
        }
    }

    #[test]
    fn test_closed_mesh_has_no_border() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        let mesh = build_from_triangles(&vertices, &faces).unwrap();
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();

        assert!(graph.border_nodes().is_empty());
        assert!(border_distances(&graph).iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_connected_components() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [4, 5, 6], [1, 3, 2]];
        let mesh = build_from_triangles(&vertices, &faces).unwrap();
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();

        let components = connected_components(&graph);
        assert_eq!(components.count(), 2);
        assert_eq!(components.labels, vec![0, 1, 0]);
        assert_eq!(components.sizes, vec![2, 1]);
        assert_eq!(components.largest(), 2);
    }
}
