//! Second voting pass: principal curvature estimation.
//!
//! All variants share the same raw material. For a node `v` with refined
//! normal `N` and a neighbor `c` with chord `d = c − v`, the neighbor
//! contributes
//!
//! - the unit tangent direction `t`, the projection of `d` onto the tangent
//!   plane of `N`;
//! - the normal curvature sample `κ_i = −2 (N · d) / |d|²` of the circle
//!   through `v` and `c` that is tangent to the plane at `v`.
//!
//! The sign makes `κ_i` positive when the surface bends away from the side the
//! normal points to, so a sphere with outward normals has curvature `+1/R`.
//!
//! The variants differ in how the samples are turned into principal values:
//!
//! - [`Variant::Avv`] averages the samples into a tangent tensor and
//!   rescales its eigenvalues ([`AvvEstimator`]).
//! - [`Variant::Ssvv`] fits the second fundamental form by weighted least
//!   squares ([`SsvvEstimator`]).
//! - [`Variant::Rvv`] starts from SSVV and repeatedly re-averages the
//!   curvatures that the neighbors' own estimates predict ([`RvvEstimator`]).

mod avv;
mod rvv;
mod ssvv;

use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};
use tracing::{debug, warn};

pub use avv::AvvEstimator;
pub use rvv::RvvEstimator;
pub use ssvv::SsvvEstimator;

use super::dispatch::Dispatcher;
use super::eigen::{symmetric_eigen2, tangent_basis};
use super::progress::{Progress, Stage};
use super::validity::InvalidReason;
use crate::error::{Result, VvError};
use crate::graph::{Neighborhood, NeighborhoodOptions, NeighborhoodSearch, TriangleGraph};
use crate::mesh::NodeId;

/// Minimal number of voting neighbors for a curvature estimate.
pub const MIN_VOTERS: usize = 3;

/// Curvature estimation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// Averaged Vector Voting.
    Avv,
    /// Surface-patch Sample Vector Voting.
    Ssvv,
    /// Refined Vector Voting.
    #[default]
    Rvv,
}

impl Variant {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Avv => "avv",
            Variant::Ssvv => "ssvv",
            Variant::Rvv => "rvv",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = VvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avv" => Ok(Variant::Avv),
            "ssvv" => Ok(Variant::Ssvv),
            "rvv" => Ok(Variant::Rvv),
            _ => Err(VvError::UnsupportedVariant(s.to_string())),
        }
    }
}

/// Principal curvatures and directions at one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalCurvatures {
    /// Maximal principal curvature.
    pub kappa_1: f64,
    /// Minimal principal curvature, `kappa_2 <= kappa_1`.
    pub kappa_2: f64,
    /// Unit direction of `kappa_1`, tangent to the surface.
    pub dir_1: Vector3<f64>,
    /// Unit direction of `kappa_2`, `normal × dir_1`.
    pub dir_2: Vector3<f64>,
}

impl PrincipalCurvatures {
    /// Normal curvature in tangent direction `t`, by Euler's formula.
    ///
    /// `t` need not be unit length or exactly tangent; it is projected onto
    /// the principal directions first. Returns `None` if `t` is orthogonal to
    /// both.
    pub fn normal_curvature(&self, t: &Vector3<f64>) -> Option<f64> {
        let a = t.dot(&self.dir_1);
        let b = t.dot(&self.dir_2);
        let s = a * a + b * b;
        if s <= f64::MIN_POSITIVE {
            return None;
        }
        Some((self.kappa_1 * a * a + self.kappa_2 * b * b) / s)
    }
}

/// Outcome of curvature estimation at one node.
pub type NodeCurvature = std::result::Result<PrincipalCurvatures, InvalidReason>;

/// A per-node curvature estimator.
///
/// Implementations must be pure functions of their inputs so that the pass
/// gives identical results for any number of workers.
pub trait CurvatureEstimator: Sync {
    /// Which variant this estimator implements.
    fn variant(&self) -> Variant;

    /// Whether neighborhood weights should be biased by the normal angle.
    fn normal_bias(&self) -> bool {
        false
    }

    /// Estimate the principal curvatures at `node`.
    fn estimate(&self, graph: &TriangleGraph, node: NodeId, hood: &Neighborhood) -> NodeCurvature;
}

/// One neighbor's contribution in the tangent plane of a node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TangentSample {
    pub node: NodeId,
    /// Unit tangent direction towards the neighbor.
    pub t: Vector3<f64>,
    /// Normal curvature of the osculating circle through the neighbor.
    pub kappa: f64,
    pub weight: f64,
}

/// Tangent samples of all weighted neighbors of `node` (excluding itself).
///
/// Neighbors lying exactly on the normal line, or coinciding with the node,
/// carry no direction and are skipped.
pub(crate) fn tangent_samples(
    graph: &TriangleGraph,
    node: NodeId,
    normal: &Vector3<f64>,
    hood: &Neighborhood,
) -> Vec<TangentSample> {
    let p = graph.position(node);
    hood.others()
        .iter()
        .filter(|entry| entry.weight > 0.0)
        .filter_map(|entry| {
            let d = graph.position(entry.node) - p;
            let d2 = d.norm_squared();
            let dn = normal.dot(&d);
            let t = d - normal * dn;
            let t_len = t.norm();
            if d2 <= f64::MIN_POSITIVE || t_len <= 1e-12 * d2.sqrt() {
                return None;
            }
            Some(TangentSample {
                node: entry.node,
                t: t / t_len,
                kappa: -2.0 * dn / d2,
                weight: entry.weight,
            })
        })
        .collect()
}

/// Common precondition checks; returns the node's normal when it can vote.
pub(crate) fn usable_normal(
    graph: &TriangleGraph,
    node: NodeId,
    hood: &Neighborhood,
) -> std::result::Result<Vector3<f64>, InvalidReason> {
    let own = graph.node(node);
    if own.degenerate {
        return Err(InvalidReason::DegenerateTriangle);
    }
    if !own.is_usable() {
        return Err(InvalidReason::InvalidNormal);
    }
    if hood.num_voters() == 0 {
        return Err(InvalidReason::Isolated);
    }
    Ok(own.normal)
}

/// Averaged vote tensor with Taubin rescaling.
///
/// Accumulates `B = Σ w κ t tᵀ / Σ w` from `(t, κ, w)` triples, restricts it
/// to the tangent plane of `normal` (which contains its whole range) and
/// maps the tangent eigenvalues `b1 >= b2` to `κ1 = 3 b1 − b2`,
/// `κ2 = 3 b2 − b1`.
pub(crate) fn averaged_tensor_curvatures<I>(normal: &Vector3<f64>, votes: I) -> NodeCurvature
where
    I: IntoIterator<Item = (Vector3<f64>, f64, f64)>,
{
    let mut tensor = Matrix3::zeros();
    let mut total_weight = 0.0;
    let mut count = 0;
    for (t, kappa, w) in votes {
        tensor += t * t.transpose() * (w * kappa);
        total_weight += w;
        count += 1;
    }
    if count < MIN_VOTERS || total_weight <= 0.0 {
        return Err(InvalidReason::TooFewNeighbors);
    }
    tensor /= total_weight;
    if !tensor.iter().all(|v| v.is_finite()) {
        return Err(InvalidReason::NonFiniteTensor);
    }

    let (e1, e2) = tangent_basis(normal);
    let b11 = e1.dot(&(tensor * e1));
    let b12 = e1.dot(&(tensor * e2));
    let b22 = e2.dot(&(tensor * e2));
    let eigen = symmetric_eigen2(b11, b12, b22)?;

    let [b1, b2] = eigen.values;
    Ok(principal_from_tangent(
        normal,
        &e1,
        &e2,
        3.0 * b1 - b2,
        3.0 * b2 - b1,
        eigen.vectors[0].x,
        eigen.vectors[0].y,
    ))
}

/// Assemble principal curvatures from a direction given in the tangent frame
/// `(e1, e2)`; `dir_2` is completed as `normal × dir_1`.
pub(crate) fn principal_from_tangent(
    normal: &Vector3<f64>,
    e1: &Vector3<f64>,
    e2: &Vector3<f64>,
    kappa_1: f64,
    kappa_2: f64,
    u1: f64,
    u2: f64,
) -> PrincipalCurvatures {
    let dir_1 = (e1 * u1 + e2 * u2).normalize();
    let dir_2 = normal.cross(&dir_1);
    PrincipalCurvatures {
        kappa_1,
        kappa_2,
        dir_1,
        dir_2,
    }
}

/// Run one estimator over every node.
///
/// Nodes with an entry in `skip` are not estimated and keep that reason.
pub fn run_estimator<E: CurvatureEstimator>(
    estimator: &E,
    graph: &TriangleGraph,
    options: &NeighborhoodOptions,
    skip: &[Option<InvalidReason>],
    dispatcher: &Dispatcher,
    progress: &Progress,
    stage: Stage<'_>,
) -> Result<Vec<NodeCurvature>> {
    if skip.len() != graph.num_nodes() {
        return Err(VvError::LengthMismatch {
            expected: graph.num_nodes(),
            got: skip.len(),
        });
    }
    let options = options.clone().with_normal_bias(estimator.normal_bias());

    let estimates = dispatcher.run(
        graph.num_nodes(),
        progress,
        stage,
        || NeighborhoodSearch::new(graph),
        |search, node| {
            if let Some(reason) = skip[node.index()] {
                return Ok(Err(reason));
            }
            let hood = search.query(node, &options);
            Ok(estimator.estimate(graph, node, &hood))
        },
    )?;

    let low = estimates
        .iter()
        .filter(|e| matches!(e, Err(r) if r.is_low_neighbor_count()))
        .count();
    if low > 0 {
        warn!(nodes = low, variant = %estimator.variant(), "nodes with too few voting neighbors");
    }
    debug!(
        variant = %estimator.variant(),
        stage = stage.label,
        valid = estimates.iter().filter(|e| e.is_ok()).count(),
        "curvature stage finished"
    );

    Ok(estimates)
}

/// Run curvature voting with the chosen variant.
///
/// `first_stage` and `stages` place the pass within the run for progress
/// reporting; RVV uses one stage for its SSVV seed plus one per refinement
/// round.
#[allow(clippy::too_many_arguments)]
pub fn vote_curvatures(
    graph: &TriangleGraph,
    variant: Variant,
    options: &NeighborhoodOptions,
    rvv_iterations: usize,
    skip: &[Option<InvalidReason>],
    dispatcher: &Dispatcher,
    progress: &Progress,
    first_stage: usize,
    stages: usize,
) -> Result<Vec<NodeCurvature>> {
    let stage = |offset: usize, label| Stage {
        index: first_stage + offset,
        count: stages,
        label,
    };

    match variant {
        Variant::Avv => run_estimator(
            &AvvEstimator,
            graph,
            options,
            skip,
            dispatcher,
            progress,
            stage(0, "curvature voting (avv)"),
        ),
        Variant::Ssvv => run_estimator(
            &SsvvEstimator,
            graph,
            options,
            skip,
            dispatcher,
            progress,
            stage(0, "curvature voting (ssvv)"),
        ),
        Variant::Rvv => {
            let mut current = run_estimator(
                &SsvvEstimator,
                graph,
                options,
                skip,
                dispatcher,
                progress,
                stage(0, "curvature voting (rvv seed)"),
            )?;
            for round in 0..rvv_iterations {
                let estimator = RvvEstimator::new(&current);
                let next = run_estimator(
                    &estimator,
                    graph,
                    options,
                    skip,
                    dispatcher,
                    progress,
                    stage(1 + round, "curvature voting (rvv refinement)"),
                )?;
                current = next;
            }
            Ok(current)
        }
    }
}

/// Number of progress stages the curvature pass of `variant` takes.
pub fn curvature_stages(variant: Variant, rvv_iterations: usize) -> usize {
    match variant {
        Variant::Avv | Variant::Ssvv => 1,
        Variant::Rvv => 1 + rvv_iterations,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_variant_parse() {
        assert_eq!("avv".parse::<Variant>().unwrap(), Variant::Avv);
        assert_eq!("SSVV".parse::<Variant>().unwrap(), Variant::Ssvv);
        assert_eq!(" Rvv ".parse::<Variant>().unwrap(), Variant::Rvv);
        assert!(matches!(
            "tv".parse::<Variant>(),
            Err(VvError::UnsupportedVariant(_))
        ));
        assert_eq!(Variant::Ssvv.to_string(), "ssvv");
    }

    #[test]
    fn test_euler_normal_curvature() {
        let pc = PrincipalCurvatures {
            kappa_1: 2.0,
            kappa_2: -1.0,
            dir_1: Vector3::x(),
            dir_2: Vector3::y(),
        };
        assert_relative_eq!(pc.normal_curvature(&Vector3::x()).unwrap(), 2.0);
        assert_relative_eq!(pc.normal_curvature(&Vector3::y()).unwrap(), -1.0);
        let diagonal = Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(pc.normal_curvature(&diagonal).unwrap(), 0.5);
        assert!(pc.normal_curvature(&Vector3::z()).is_none());
    }

    #[test]
    fn test_taubin_rescaling_recovers_principal_values() {
        // Samples of κ(φ) = κ1 cos²φ + κ2 sin²φ on evenly spaced directions
        let (k1, k2) = (0.3, -0.1);
        let normal = Vector3::z();
        let votes = (0..36).map(|i| {
            let phi = i as f64 * std::f64::consts::PI / 18.0;
            let t = Vector3::new(phi.cos(), phi.sin(), 0.0);
            let kappa = k1 * phi.cos().powi(2) + k2 * phi.sin().powi(2);
            (t, kappa, 1.0)
        });

        let pc = averaged_tensor_curvatures(&normal, votes).unwrap();
        assert_relative_eq!(pc.kappa_1, k1, epsilon = 1e-12);
        assert_relative_eq!(pc.kappa_2, k2, epsilon = 1e-12);
        assert_relative_eq!(pc.dir_1.x.abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(pc.dir_2.y.abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(pc.dir_1.cross(&pc.dir_2), normal, epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_votes() {
        let votes = vec![(Vector3::x(), 1.0, 1.0), (Vector3::y(), 1.0, 1.0)];
        assert_eq!(
            averaged_tensor_curvatures(&Vector3::z(), votes),
            Err(InvalidReason::TooFewNeighbors)
        );
    }

    #[test]
    fn test_curvature_stages() {
        assert_eq!(curvature_stages(Variant::Avv, 5), 1);
        assert_eq!(curvature_stages(Variant::Rvv, 2), 3);
    }
}
