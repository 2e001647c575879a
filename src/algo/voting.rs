//! The full Vector Voting pipeline.
//!
//! [`estimate_curvature`] takes a mesh through every step:
//!
//! 1. build the triangle graph;
//! 2. Pass 1, normal voting, on every node;
//! 3. a new graph snapshot carrying the refined normals;
//! 4. optional border exclusion;
//! 5. Pass 2, curvature voting with the chosen [`Variant`];
//! 6. aggregation into a [`CurvatureResult`].
//!
//! # Example
//!
//! ```
//! use vvcurv::algo::{estimate_curvature, Variant, VotingOptions};
//! use vvcurv::synthetic;
//!
//! let mesh = synthetic::icosphere(10.0, 2).unwrap();
//! let options = VotingOptions::new(8.0)
//!     .with_variant(Variant::Ssvv)
//!     .with_num_workers(2);
//! let result = estimate_curvature(&mesh, &options).unwrap();
//!
//! assert_eq!(result.len(), mesh.num_faces());
//! ```

use std::time::Instant;

use tracing::{debug, info, warn};

use super::aggregate::{AggregateOptions, CurvatureResult};
use super::curvature::{curvature_stages, vote_curvatures, Variant};
use super::dispatch::Dispatcher;
use super::normals::vote_normals;
use super::progress::{Progress, Stage};
use super::validity::InvalidReason;
use crate::error::{Result, VvError};
use crate::graph::{
    border_distances, build_graph, search_radius, GraphOptions, NeighborhoodOptions, TriangleGraph,
};
use crate::mesh::TriangleMesh;

/// Default number of RVV refinement rounds.
pub const DEFAULT_RVV_ITERATIONS: usize = 2;

/// Default curvedness below which a node counts as planar.
pub const DEFAULT_FLAT_CURVEDNESS: f64 = 1e-6;

/// Options for a curvature run.
#[derive(Debug, Clone)]
pub struct VotingOptions {
    /// Expected radius of the smallest feature of interest, in mesh units
    /// (after [`GraphOptions::scale`]). Neighborhoods reach a geodesic
    /// distance of `π/2 · radius_hit`.
    pub radius_hit: f64,
    /// Classification weight of the crease saliency.
    pub epsilon: f64,
    /// Classification weight of the ball saliency relative to `epsilon`.
    pub eta: f64,
    /// Curvature estimation variant.
    pub variant: Variant,
    /// Number of worker threads.
    pub num_workers: usize,
    /// Nodes closer than this geodesic distance to the mesh border are
    /// excluded from curvature estimation. 0 disables the exclusion.
    pub exclude_borders: f64,
    /// Refinement rounds for [`Variant::Rvv`].
    pub rvv_iterations: usize,
    /// Weight neighbors by their relative triangle area.
    pub area_weighting: bool,
    /// Curvedness below which a node is categorized as plane.
    pub flat_curvedness: f64,
    /// Graph construction options.
    pub graph: GraphOptions,
}

impl VotingOptions {
    /// Options for the given feature radius; everything else at defaults.
    pub fn new(radius_hit: f64) -> Self {
        Self {
            radius_hit,
            epsilon: 0.0,
            eta: 0.0,
            variant: Variant::default(),
            num_workers: default_num_workers(),
            exclude_borders: 0.0,
            rvv_iterations: DEFAULT_RVV_ITERATIONS,
            area_weighting: true,
            flat_curvedness: DEFAULT_FLAT_CURVEDNESS,
            graph: GraphOptions::default(),
        }
    }

    /// Set the curvature variant.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the number of worker threads.
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set the classification weights.
    pub fn with_classification(mut self, epsilon: f64, eta: f64) -> Self {
        self.epsilon = epsilon;
        self.eta = eta;
        self
    }

    /// Set the border exclusion distance.
    pub fn with_exclude_borders(mut self, distance: f64) -> Self {
        self.exclude_borders = distance;
        self
    }

    /// Set the number of RVV refinement rounds.
    pub fn with_rvv_iterations(mut self, iterations: usize) -> Self {
        self.rvv_iterations = iterations;
        self
    }

    /// Enable or disable area weighting.
    pub fn with_area_weighting(mut self, enabled: bool) -> Self {
        self.area_weighting = enabled;
        self
    }

    /// Set the planar curvedness threshold.
    pub fn with_flat_curvedness(mut self, threshold: f64) -> Self {
        self.flat_curvedness = threshold;
        self
    }

    /// Set graph construction options.
    pub fn with_graph(mut self, graph: GraphOptions) -> Self {
        self.graph = graph;
        self
    }

    /// Check all parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.radius_hit.is_finite() || self.radius_hit <= 0.0 {
            return Err(VvError::invalid_param(
                "radius_hit",
                self.radius_hit,
                "must be positive and finite",
            ));
        }
        if self.num_workers == 0 {
            return Err(VvError::invalid_param(
                "num_workers",
                self.num_workers,
                "must be at least 1",
            ));
        }
        for (name, value) in [
            ("epsilon", self.epsilon),
            ("eta", self.eta),
            ("exclude_borders", self.exclude_borders),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(VvError::invalid_param(name, value, "must not be negative"));
            }
        }
        if self.flat_curvedness.is_nan() || self.flat_curvedness < 0.0 {
            return Err(VvError::invalid_param(
                "flat_curvedness",
                self.flat_curvedness,
                "must not be negative",
            ));
        }
        if self.variant == Variant::Rvv && self.rvv_iterations == 0 {
            return Err(VvError::invalid_param(
                "rvv_iterations",
                self.rvv_iterations,
                "must be at least 1 for rvv",
            ));
        }
        self.graph.validate()
    }

    /// Neighborhood options for both passes.
    pub fn neighborhood(&self) -> NeighborhoodOptions {
        NeighborhoodOptions::new(search_radius(self.radius_hit))
            .with_area_weighting(self.area_weighting)
    }

    fn aggregate(&self) -> AggregateOptions {
        AggregateOptions {
            epsilon: self.epsilon,
            eta: self.eta,
            flat_curvedness: self.flat_curvedness,
        }
    }
}

impl Default for VotingOptions {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Estimate curvature on every triangle of `mesh`.
pub fn estimate_curvature(mesh: &TriangleMesh, options: &VotingOptions) -> Result<CurvatureResult> {
    estimate_curvature_with_progress(mesh, options, &Progress::none())
}

/// [`estimate_curvature`] with progress reporting.
pub fn estimate_curvature_with_progress(
    mesh: &TriangleMesh,
    options: &VotingOptions,
    progress: &Progress,
) -> Result<CurvatureResult> {
    options.validate()?;
    let graph = build_graph(mesh, &options.graph)?;
    estimate_graph_curvature(&graph, options, progress)
}

/// Run both voting passes on an already built graph.
///
/// The input graph is not modified; the result carries a new snapshot with
/// the refined normals.
pub fn estimate_graph_curvature(
    graph: &TriangleGraph,
    options: &VotingOptions,
    progress: &Progress,
) -> Result<CurvatureResult> {
    options.validate()?;
    let dispatcher = Dispatcher::new(options.num_workers)?;
    let hood = options.neighborhood();
    let stages = 1 + curvature_stages(options.variant, options.rvv_iterations);

    info!(
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        variant = %options.variant,
        workers = options.num_workers,
        radius = hood.radius,
        "starting vector voting"
    );

    let start = Instant::now();
    let normals = vote_normals(
        graph,
        &hood,
        &dispatcher,
        progress,
        Stage {
            index: 0,
            count: stages,
            label: "normal voting",
        },
    )?;
    debug!(elapsed = ?start.elapsed(), "pass 1 finished");

    let refined = graph.with_normals(normals.iter().map(|e| e.normal).collect())?;
    let skip = border_exclusion(&refined, options.exclude_borders);

    let start = Instant::now();
    let curvatures = vote_curvatures(
        &refined,
        options.variant,
        &hood,
        options.rvv_iterations,
        &skip,
        &dispatcher,
        progress,
        1,
        stages,
    )?;
    debug!(elapsed = ?start.elapsed(), "pass 2 finished");

    let result = CurvatureResult::assemble(refined, &normals, &curvatures, &options.aggregate())?;

    let invalid = result.len() - result.num_valid();
    if invalid > 0 {
        let reasons: Vec<String> = result
            .invalid_counts()
            .iter()
            .map(|(reason, count)| format!("{reason}: {count}"))
            .collect();
        warn!(invalid, reasons = %reasons.join(", "), "nodes without a curvature estimate");
    }
    info!(valid = result.num_valid(), nodes = result.len(), "vector voting finished");

    Ok(result)
}

/// Per-node skip reasons for nodes within `distance` of the border.
fn border_exclusion(graph: &TriangleGraph, distance: f64) -> Vec<Option<InvalidReason>> {
    if distance <= 0.0 {
        return vec![None; graph.num_nodes()];
    }
    let skip: Vec<_> = border_distances(graph)
        .into_iter()
        .map(|d| (d < distance).then_some(InvalidReason::NearBorder))
        .collect();
    debug!(
        excluded = skip.iter().filter(|s| s.is_some()).count(),
        distance, "border exclusion"
    );
    skip
}
