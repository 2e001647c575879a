//! Surface-patch Sample Vector Voting.

use nalgebra::{Matrix3, Vector3};

use super::{
    principal_from_tangent, tangent_samples, usable_normal, CurvatureEstimator, NodeCurvature,
    Variant, MIN_VOTERS,
};
use crate::algo::eigen::{symmetric_eigen2, tangent_basis};
use crate::algo::validity::InvalidReason;
use crate::graph::{Neighborhood, TriangleGraph};
use crate::mesh::NodeId;

/// Relative determinant below which the normal equations count as singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Fits the second fundamental form of the osculating patch.
///
/// In the tangent frame `(e1, e2, N)`, a neighbor in unit tangent direction
/// `(u1, u2)` samples the normal curvature
/// `II(u) = A u1² + 2B u1u2 + C u2²`. The coefficients are found by weighted
/// least squares over all samples; the eigen-pairs of `[[A, B], [B, C]]` are
/// the principal curvatures and directions. No rescaling is needed, so the
/// estimate is insensitive to uneven angular sampling, but the samples must
/// span at least two tangent directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsvvEstimator;

impl CurvatureEstimator for SsvvEstimator {
    fn variant(&self) -> Variant {
        Variant::Ssvv
    }

    fn estimate(&self, graph: &TriangleGraph, node: NodeId, hood: &Neighborhood) -> NodeCurvature {
        let normal = usable_normal(graph, node, hood)?;
        let samples = tangent_samples(graph, node, &normal, hood);
        fit_second_fundamental_form(
            &normal,
            samples.iter().map(|s| (s.t, s.kappa, s.weight)),
        )
    }
}

/// Weighted least-squares fit of `II` to `(t, κ, w)` samples.
pub(crate) fn fit_second_fundamental_form<I>(normal: &Vector3<f64>, samples: I) -> NodeCurvature
where
    I: IntoIterator<Item = (Vector3<f64>, f64, f64)>,
{
    let (e1, e2) = tangent_basis(normal);

    let mut lhs = Matrix3::zeros();
    let mut rhs = Vector3::zeros();
    let mut count = 0;
    for (t, kappa, w) in samples {
        let u1 = t.dot(&e1);
        let u2 = t.dot(&e2);
        let row = Vector3::new(u1 * u1, 2.0 * u1 * u2, u2 * u2);
        lhs += row * row.transpose() * w;
        rhs += row * (w * kappa);
        count += 1;
    }
    if count < MIN_VOTERS {
        return Err(InvalidReason::TooFewNeighbors);
    }
    if !(lhs.iter().all(|v| v.is_finite()) && rhs.iter().all(|v| v.is_finite())) {
        return Err(InvalidReason::NonFiniteTensor);
    }

    let scale = lhs.trace();
    if scale <= 0.0 || lhs.determinant().abs() <= SINGULAR_TOLERANCE * scale.powi(3) {
        return Err(InvalidReason::SingularSystem);
    }

    let coefficients = match lhs.cholesky() {
        Some(chol) => chol.solve(&rhs),
        None => lhs.try_inverse().ok_or(InvalidReason::SingularSystem)? * rhs,
    };
    let (a, b, c) = (coefficients[0], coefficients[1], coefficients[2]);

    let eigen = symmetric_eigen2(a, b, c)?;
    let [k1, k2] = eigen.values;
    Ok(principal_from_tangent(
        normal,
        &e1,
        &e2,
        k1,
        k2,
        eigen.vectors[0].x,
        eigen.vectors[0].y,
    ))
}
