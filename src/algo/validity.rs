//! Per-node validity.
//!
//! Numeric degeneracies never fail a run. A node that cannot be estimated is
//! marked invalid with one of these reasons and its curvature outputs are set
//! to NaN; its neighbors are unaffected.

use std::fmt;

use super::eigen::EigenFailure;

/// Why a node has no valid estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// The triangle has zero area.
    DegenerateTriangle,
    /// The node's normal is not finite.
    InvalidNormal,
    /// No other node in the neighborhood carries a vote.
    Isolated,
    /// Fewer voting neighbors than the estimator needs.
    TooFewNeighbors,
    /// A voting tensor contains NaN or infinite entries.
    NonFiniteTensor,
    /// The eigen-decomposition did not converge.
    NoConvergence,
    /// The least-squares system of the patch fit is singular.
    SingularSystem,
    /// The node is closer to the mesh border than the exclusion distance.
    NearBorder,
}

impl InvalidReason {
    /// Short lowercase label, used in logs and attribute files.
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidReason::DegenerateTriangle => "degenerate triangle",
            InvalidReason::InvalidNormal => "invalid normal",
            InvalidReason::Isolated => "isolated",
            InvalidReason::TooFewNeighbors => "too few neighbors",
            InvalidReason::NonFiniteTensor => "non-finite tensor",
            InvalidReason::NoConvergence => "no convergence",
            InvalidReason::SingularSystem => "singular system",
            InvalidReason::NearBorder => "near border",
        }
    }

    /// Whether the reason is a shortage of neighbors.
    pub fn is_low_neighbor_count(self) -> bool {
        matches!(self, InvalidReason::Isolated | InvalidReason::TooFewNeighbors)
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EigenFailure> for InvalidReason {
    fn from(failure: EigenFailure) -> Self {
        match failure {
            EigenFailure::NonFinite => InvalidReason::NonFiniteTensor,
            EigenFailure::NoConvergence => InvalidReason::NoConvergence,
        }
    }
}
