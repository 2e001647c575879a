//! First voting pass: normal estimation.
//!
//! Every neighbor `c` of a node `v` predicts the normal at `v` by assuming
//! that both lie on a circular arc: it reflects its own normal `N_c` across
//! the bisector plane of the chord `d = c − v`,
//!
//! `n = N_c − 2 (N_c · d̂) d̂`.
//!
//! Each prediction is cast as the plate tensor `w (I − n nᵀ)`. The summed
//! tensor's eigenvector of the smallest eigenvalue is the refined normal.

use nalgebra::{Matrix3, Vector3};
use tracing::{debug, warn};

use super::dispatch::Dispatcher;
use super::eigen::symmetric_eigen3;
use super::progress::{Progress, Stage};
use super::validity::InvalidReason;
use crate::error::Result;
use crate::graph::{Neighborhood, NeighborhoodOptions, NeighborhoodSearch, TriangleGraph};
use crate::mesh::NodeId;

/// Result of normal voting at one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalEstimate {
    /// Refined unit normal. NaN when no normal could be estimated; the
    /// initial normal for isolated nodes.
    pub normal: Vector3<f64>,
    /// Saliencies `[λ1 − λ2, λ2 − λ3, λ3]` of the equivalent stick tensor,
    /// in decreasing order of surface likeness. NaN when invalid.
    pub saliencies: [f64; 3],
    /// Why the estimate is invalid, if it is.
    pub invalid: Option<InvalidReason>,
}

impl NormalEstimate {
    fn invalid(normal: Vector3<f64>, reason: InvalidReason) -> Self {
        Self {
            normal,
            saliencies: [f64::NAN; 3],
            invalid: Some(reason),
        }
    }

    /// Whether the estimate is valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.invalid.is_none()
    }
}

/// Normal vote of `neighbor` at `node`.
///
/// Coincident centroids vote with the neighbor's normal unchanged.
#[inline]
pub fn normal_vote(graph: &TriangleGraph, node: NodeId, neighbor: NodeId) -> Vector3<f64> {
    let n_c = *graph.normal(neighbor);
    let d = graph.position(neighbor) - graph.position(node);
    let len = d.norm();
    if len <= f64::EPSILON * graph.position(node).coords.norm().max(1.0) {
        return n_c;
    }
    let d_hat = d / len;
    n_c - d_hat * (2.0 * n_c.dot(&d_hat))
}

/// Estimate the refined normal of one node from its neighborhood.
pub fn estimate_normal(graph: &TriangleGraph, node: NodeId, hood: &Neighborhood) -> NormalEstimate {
    let own = graph.node(node);
    let nan = Vector3::repeat(f64::NAN);
    if own.degenerate {
        return NormalEstimate::invalid(nan, InvalidReason::DegenerateTriangle);
    }
    if !own.is_usable() {
        return NormalEstimate::invalid(nan, InvalidReason::InvalidNormal);
    }
    if hood.num_voters() == 0 {
        return NormalEstimate::invalid(own.normal, InvalidReason::Isolated);
    }

    let mut tensor = Matrix3::zeros();
    let mut total_weight = 0.0;
    for entry in hood.entries() {
        if entry.weight <= 0.0 {
            continue;
        }
        let n = if entry.node == node {
            own.normal
        } else {
            normal_vote(graph, node, entry.node)
        };
        tensor += (Matrix3::identity() - n * n.transpose()) * entry.weight;
        total_weight += entry.weight;
    }

    let eigen = match symmetric_eigen3(&tensor) {
        Ok(eigen) => eigen,
        Err(failure) => return NormalEstimate::invalid(nan, failure.into()),
    };

    let mut normal = eigen.minor();
    if normal.dot(&own.normal) < 0.0 {
        normal = -normal;
    }

    // Stick eigenvalues are W − μ for plate eigenvalues μ, in reverse order
    let [mu1, mu2, mu3] = eigen.values;
    let saliencies = [mu2 - mu3, mu1 - mu2, (total_weight - mu1).max(0.0)];

    NormalEstimate {
        normal,
        saliencies,
        invalid: None,
    }
}

/// Run normal voting on every node of the graph.
pub fn vote_normals(
    graph: &TriangleGraph,
    options: &NeighborhoodOptions,
    dispatcher: &Dispatcher,
    progress: &Progress,
    stage: Stage<'_>,
) -> Result<Vec<NormalEstimate>> {
    let estimates = dispatcher.run(
        graph.num_nodes(),
        progress,
        stage,
        || NeighborhoodSearch::new(graph),
        |search, node| {
            let hood = search.query(node, options);
            Ok(estimate_normal(graph, node, &hood))
        },
    )?;

    let invalid = estimates.iter().filter(|e| !e.is_valid()).count();
    let isolated = estimates
        .iter()
        .filter(|e| e.invalid == Some(InvalidReason::Isolated))
        .count();
    if isolated > 0 {
        warn!(isolated, "nodes without voting neighbors");
    }
    debug!(nodes = estimates.len(), invalid, "normal voting finished");

    Ok(estimates)
}
