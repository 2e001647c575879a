//! Error types for vvcurv.
//!
//! A single error enum covers every failure the library can report. Errors are
//! grouped into broad classes (see [`ErrorKind`]) that decide how a caller
//! should react: input and configuration problems are detected before any
//! parallel work starts, worker failures abort a run as a whole.
//!
//! Per-vertex numeric degeneracies (zero-area triangles, isolated vertices,
//! non-finite tensors) are *not* errors; they are recorded in the validity
//! flags of the result.

use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`VvError`].
pub type Result<T> = std::result::Result<T, VvError>;

/// Broad classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input mesh.
    Input,
    /// Invalid parameters, detected before dispatch.
    Configuration,
    /// A worker failed while processing its chunk.
    Worker,
    /// An unrecoverable numeric failure.
    Numeric,
    /// File I/O or file format problem in one of the adapters.
    Io,
}

/// Errors that can occur during curvature estimation.
#[derive(Error, Debug)]
pub enum VvError {
    /// The mesh has no triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// A triangle references an invalid vertex index.
    #[error("triangle {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The triangle index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A triangle repeats one of its vertex indices.
    #[error("triangle {face} references vertex {vertex} more than once")]
    RepeatedVertex {
        /// The triangle index.
        face: usize,
        /// The repeated vertex index.
        vertex: usize,
    },

    /// An edge has more than two incident triangles.
    #[error("edge ({v0}, {v1}) has {count} incident triangles")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
        /// Number of incident triangles.
        count: usize,
    },

    /// The number of supplied triangle areas does not match the triangle count.
    #[error("got {areas} triangle areas for {faces} triangles")]
    AreaCountMismatch {
        /// Number of triangles.
        faces: usize,
        /// Number of supplied areas.
        areas: usize,
    },

    /// A supplied triangle area is negative.
    #[error("triangle {face} has negative area {area}")]
    NegativeArea {
        /// The triangle index.
        face: usize,
        /// The supplied area.
        area: f64,
    },

    /// A vertex position or supplied area is NaN or infinite.
    #[error("non-finite value in input: {0}")]
    NonFiniteInput(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// Unknown curvature variant name.
    #[error("unsupported curvature variant: {0} (expected avv, ssvv or rvv)")]
    UnsupportedVariant(String),

    /// A worker failed; the whole run is aborted.
    #[error("worker {worker} failed on vertices {}..{}: {source}", .range.start, .range.end)]
    WorkerFailure {
        /// Index of the failing worker.
        worker: usize,
        /// The vertex range the worker was assigned.
        range: Range<usize>,
        /// The underlying failure.
        #[source]
        source: Box<VvError>,
    },

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    PoolCreation(String),

    /// A panic was caught inside a worker.
    #[error("panic: {0}")]
    Panicked(String),

    /// Eigen-decomposition or a linear solve failed in a way that cannot be
    /// absorbed into a per-vertex validity flag.
    #[error("numeric failure at vertex {vertex}: {reason}")]
    NumericFailure {
        /// The vertex being processed.
        vertex: usize,
        /// Description of the failure.
        reason: String,
    },

    /// Result arrays do not have the expected length.
    #[error("result has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Expected number of entries.
        expected: usize,
        /// Actual number of entries.
        got: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading a mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving a mesh or attribute file.
    #[error("failed to save {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },
}

impl VvError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        VvError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VvError::EmptyMesh
            | VvError::InvalidVertexIndex { .. }
            | VvError::RepeatedVertex { .. }
            | VvError::NonManifoldEdge { .. }
            | VvError::AreaCountMismatch { .. }
            | VvError::NegativeArea { .. }
            | VvError::NonFiniteInput(_) => ErrorKind::Input,
            VvError::InvalidParameter { .. } | VvError::UnsupportedVariant(_) => {
                ErrorKind::Configuration
            }
            VvError::WorkerFailure { .. } | VvError::PoolCreation(_) | VvError::Panicked(_) => {
                ErrorKind::Worker
            }
            VvError::NumericFailure { .. } | VvError::LengthMismatch { .. } => ErrorKind::Numeric,
            VvError::Io(_)
            | VvError::LoadError { .. }
            | VvError::SaveError { .. }
            | VvError::UnsupportedFormat { .. } => ErrorKind::Io,
        }
    }

    /// Whether this error aborts a run as opposed to being reportable per input.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(VvError::EmptyMesh.kind(), ErrorKind::Input);
        assert_eq!(
            VvError::invalid_param("radius_hit", -1.0, "must be positive").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            VvError::UnsupportedVariant("foo".into()).kind(),
            ErrorKind::Configuration
        );

        let failure = VvError::WorkerFailure {
            worker: 2,
            range: 10..20,
            source: Box::new(VvError::Panicked("boom".into())),
        };
        assert_eq!(failure.kind(), ErrorKind::Worker);
        assert!(failure.is_fatal());
    }

    #[test]
    fn test_worker_failure_message() {
        let failure = VvError::WorkerFailure {
            worker: 1,
            range: 5..9,
            source: Box::new(VvError::NumericFailure {
                vertex: 7,
                reason: "eigen-decomposition did not converge".into(),
            }),
        };
        let msg = failure.to_string();
        assert!(msg.contains("worker 1"));
        assert!(msg.contains("5..9"));
        assert!(msg.contains("vertex 7"));
    }

    #[test]
    fn test_invalid_param_message() {
        let err = VvError::invalid_param("num_workers", 0, "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter: num_workers = 0 (must be at least 1)"
        );
    }
}
