//! Refined Vector Voting.

use super::{
    averaged_tensor_curvatures, tangent_samples, usable_normal, CurvatureEstimator, NodeCurvature,
    Variant, MIN_VOTERS,
};
use crate::algo::validity::InvalidReason;
use crate::graph::{Neighborhood, TriangleGraph};
use crate::mesh::NodeId;

/// One refinement round on top of a previous curvature estimate.
///
/// Instead of the chord-based sample, every neighbor votes with the normal
/// curvature its own current estimate predicts in the direction towards the
/// node, `κ1 cos²φ + κ2 sin²φ` with `φ` the angle between that direction and
/// the neighbor's first principal direction. The votes are averaged and
/// rescaled like [`AvvEstimator`](super::AvvEstimator). Neighborhood weights
/// are biased by the angle between the normals, and neighbors without a
/// valid current estimate do not vote.
///
/// When too few neighbors have a valid estimate, the node keeps its current
/// one.
#[derive(Debug, Clone, Copy)]
pub struct RvvEstimator<'a> {
    current: &'a [NodeCurvature],
}

impl<'a> RvvEstimator<'a> {
    /// Refine on top of `current`, one entry per graph node.
    pub fn new(current: &'a [NodeCurvature]) -> Self {
        Self { current }
    }
}

impl CurvatureEstimator for RvvEstimator<'_> {
    fn variant(&self) -> Variant {
        Variant::Rvv
    }

    fn normal_bias(&self) -> bool {
        true
    }

    fn estimate(&self, graph: &TriangleGraph, node: NodeId, hood: &Neighborhood) -> NodeCurvature {
        let normal = usable_normal(graph, node, hood)?;
        let previous = self
            .current
            .get(node.index())
            .copied()
            .unwrap_or(Err(InvalidReason::TooFewNeighbors));

        let votes: Vec<_> = tangent_samples(graph, node, &normal, hood)
            .into_iter()
            .filter_map(|sample| {
                let estimate = self.current.get(sample.node.index())?.as_ref().ok()?;
                let kappa = estimate.normal_curvature(&sample.t)?;
                Some((sample.t, kappa, sample.weight))
            })
            .collect();

        if votes.len() < MIN_VOTERS {
            return previous;
        }
        averaged_tensor_curvatures(&normal, votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::curvature::test_surfaces::{cylinder_graph, sphere_graph};
    use crate::algo::curvature::{PrincipalCurvatures, SsvvEstimator};
    use crate::graph::{neighborhood, search_radius, NeighborhoodOptions};
    use nalgebra::Vector3;

    #[test]
    fn test_sphere_stays_umbilic() {
        let graph = sphere_graph(10.0, 3);
        let options = NeighborhoodOptions::new(search_radius(5.0)).with_normal_bias(true);

        let seed: Vec<NodeCurvature> = graph
            .node_ids()
            .map(|n| SsvvEstimator.estimate(&graph, n, &neighborhood(&graph, n, &options)))
            .collect();
        let rvv = RvvEstimator::new(&seed);

        for node in graph.node_ids().step_by(5) {
            let hood = neighborhood(&graph, node, &options);
            let pc = rvv.estimate(&graph, node, &hood).unwrap();
            assert!((pc.kappa_1 - 0.1).abs() < 0.01, "kappa_1 = {}", pc.kappa_1);
            assert!((pc.kappa_2 - 0.1).abs() < 0.01, "kappa_2 = {}", pc.kappa_2);
        }
    }

    #[test]
    fn test_invalid_neighbors_do_not_vote() {
        let graph = cylinder_graph(10.0, 60.0);
        let options = NeighborhoodOptions::new(search_radius(5.0)).with_normal_bias(true);
        let node = graph
            .node_ids()
            .find(|&n| (graph.position(n).z - 30.0).abs() < 1.0)
            .unwrap();

        // Only the node itself has an estimate: nobody can vote, so the
        // previous estimate is kept
        let marker = PrincipalCurvatures {
            kappa_1: 7.0,
            kappa_2: 7.0,
            dir_1: Vector3::x(),
            dir_2: Vector3::y(),
        };
        let mut current = vec![Err(InvalidReason::Isolated); graph.num_nodes()];
        current[node.index()] = Ok(marker);

        let hood = neighborhood(&graph, node, &options);
        let pc = RvvEstimator::new(&current)
            .estimate(&graph, node, &hood)
            .unwrap();
        assert_eq!(pc, marker);
    }

    #[test]
    fn test_cylinder_refinement() {
        let graph = cylinder_graph(10.0, 60.0);
        let options = NeighborhoodOptions::new(search_radius(5.0)).with_normal_bias(true);
        let seed: Vec<NodeCurvature> = graph
            .node_ids()
            .map(|n| SsvvEstimator.estimate(&graph, n, &neighborhood(&graph, n, &options)))
            .collect();

        let node = graph
            .node_ids()
            .find(|&n| (graph.position(n).z - 30.0).abs() < 1.0)
            .unwrap();
        let hood = neighborhood(&graph, node, &options);
        let pc = RvvEstimator::new(&seed)
            .estimate(&graph, node, &hood)
            .unwrap();

        assert!((pc.kappa_1 - 0.1).abs() < 0.015, "kappa_1 = {}", pc.kappa_1);
        assert!(pc.kappa_2.abs() < 0.015, "kappa_2 = {}", pc.kappa_2);
        assert!(pc.dir_2.z.abs() > 0.95);
    }
}
