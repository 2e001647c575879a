//! Averaged Vector Voting.

use super::{
    averaged_tensor_curvatures, tangent_samples, usable_normal, CurvatureEstimator, NodeCurvature,
    Variant,
};
use crate::graph::{Neighborhood, TriangleGraph};
use crate::mesh::NodeId;

/// Averages the neighbors' normal-curvature samples into a tangent tensor.
///
/// With samples `κ_i` in unit tangent directions `t_i`, the tensor is
/// `B = Σ w_i κ_i t_i t_iᵀ / Σ w_i`. For a sampling that covers all
/// directions evenly, the eigenvalues of `B` relate to the principal
/// curvatures by `b1 = (3κ1 + κ2) / 8`, `b2 = (κ1 + 3κ2) / 8` up to the
/// common normalization, which the rescaling `κ1 = 3b1 − b2`,
/// `κ2 = 3b2 − b1` inverts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvvEstimator;

impl CurvatureEstimator for AvvEstimator {
    fn variant(&self) -> Variant {
        Variant::Avv
    }

    fn estimate(&self, graph: &TriangleGraph, node: NodeId, hood: &Neighborhood) -> NodeCurvature {
        let normal = usable_normal(graph, node, hood)?;
        let samples = tangent_samples(graph, node, &normal, hood);
        averaged_tensor_curvatures(
            &normal,
            samples.iter().map(|s| (s.t, s.kappa, s.weight)),
        )
    }
}
