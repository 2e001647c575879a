//! Vector Voting algorithms.
//!
//! Both voting passes run per node over a shared, immutable
//! [`TriangleGraph`](crate::graph::TriangleGraph):
//!
//! - [`normals`]: Pass 1, refined normals and saliencies
//! - [`curvature`]: Pass 2, principal curvatures (AVV, SSVV, RVV)
//! - [`voting`]: the full pipeline from mesh to [`CurvatureResult`]
//! - [`aggregate`]: derived descriptors, classification and statistics
//!
//! Support modules:
//!
//! - [`dispatch`]: fixed-size worker pool with by-index result collection
//! - [`eigen`]: small symmetric eigen-decompositions
//! - [`progress`]: progress callbacks
//! - [`validity`]: reasons a node has no estimate

pub mod aggregate;
pub mod curvature;
pub mod dispatch;
pub mod eigen;
pub mod normals;
pub mod progress;
pub mod validity;
pub mod voting;

pub use aggregate::{
    curvedness, shape_index, Attribute, CurvatureResult, ShapeCategory, ShapeClass, Summary,
};
pub use curvature::{
    AvvEstimator, CurvatureEstimator, NodeCurvature, PrincipalCurvatures, RvvEstimator,
    SsvvEstimator, Variant,
};
pub use dispatch::Dispatcher;
pub use normals::{vote_normals, NormalEstimate};
pub use progress::{Progress, Stage};
pub use validity::InvalidReason;
pub use voting::{
    estimate_curvature, estimate_curvature_with_progress, estimate_graph_curvature, VotingOptions,
};
