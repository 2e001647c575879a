//! Small symmetric eigen-decompositions.
//!
//! Every eigen-decomposition in the voting passes goes through this module,
//! which sorts the eigen-pairs, rejects non-finite input and resolves
//! degenerate (repeated) eigenvalues to a deterministic basis.

use nalgebra::{Matrix3, SymmetricEigen, Vector2, Vector3};

/// Relative tolerance under which two eigenvalues count as equal.
pub const DEGENERACY_TOLERANCE: f64 = 1e-9;

/// Iteration cap for the 3×3 solver.
const MAX_ITERATIONS: usize = 1000;

/// Why a decomposition could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenFailure {
    /// The matrix contains NaN or infinite entries.
    NonFinite,
    /// The iterative solver did not converge.
    NoConvergence,
}

/// Eigen-decomposition of a symmetric 3×3 matrix with eigenvalues sorted in
/// decreasing order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigen3 {
    /// Eigenvalues, `values[0] >= values[1] >= values[2]`.
    pub values: [f64; 3],
    /// Unit eigenvectors matching `values`.
    pub vectors: [Vector3<f64>; 3],
}

impl Eigen3 {
    /// Eigenvector of the largest eigenvalue.
    #[inline]
    pub fn major(&self) -> Vector3<f64> {
        self.vectors[0]
    }

    /// Eigenvector of the smallest eigenvalue.
    #[inline]
    pub fn minor(&self) -> Vector3<f64> {
        self.vectors[2]
    }
}

/// Decompose a symmetric 3×3 matrix.
///
/// Only the lower triangle is read.
pub fn symmetric_eigen3(m: &Matrix3<f64>) -> Result<Eigen3, EigenFailure> {
    if !m.iter().all(|v| v.is_finite()) {
        return Err(EigenFailure::NonFinite);
    }

    let eigen = SymmetricEigen::try_new(*m, f64::EPSILON, MAX_ITERATIONS)
        .ok_or(EigenFailure::NoConvergence)?;

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let values = order.map(|i| eigen.eigenvalues[i]);
    let vectors = order.map(|i| eigen.eigenvectors.column(i).normalize());

    if !values.iter().all(|v| v.is_finite())
        || !vectors.iter().all(|v| v.iter().all(|c| c.is_finite()))
    {
        return Err(EigenFailure::NonFinite);
    }

    Ok(Eigen3 { values, vectors })
}

/// Eigen-decomposition of a symmetric 2×2 matrix `[[a, b], [b, c]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigen2 {
    /// Eigenvalues, `values[0] >= values[1]`.
    pub values: [f64; 2],
    /// Unit eigenvectors matching `values`.
    pub vectors: [Vector2<f64>; 2],
    /// The two eigenvalues are equal within [`DEGENERACY_TOLERANCE`]; the
    /// vectors are then the coordinate axes.
    pub degenerate: bool,
}

/// Closed-form decomposition of the symmetric 2×2 matrix `[[a, b], [b, c]]`.
pub fn symmetric_eigen2(a: f64, b: f64, c: f64) -> Result<Eigen2, EigenFailure> {
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return Err(EigenFailure::NonFinite);
    }

    let mean = 0.5 * (a + c);
    let half_diff = 0.5 * (a - c);
    let radius = half_diff.hypot(b);
    let values = [mean + radius, mean - radius];

    let degenerate = nearly_equal(values[0], values[1]);
    let vectors = if degenerate {
        [Vector2::x(), Vector2::y()]
    } else {
        let theta = 0.5 * b.atan2(half_diff);
        let (s, co) = theta.sin_cos();
        [Vector2::new(co, s), Vector2::new(-s, co)]
    };

    Ok(Eigen2 {
        values,
        vectors,
        degenerate,
    })
}

/// Check if two eigenvalues are equal within [`DEGENERACY_TOLERANCE`].
#[inline]
pub fn nearly_equal(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= DEGENERACY_TOLERANCE * scale || scale < f64::MIN_POSITIVE
}

/// A unit vector perpendicular to `n`.
///
/// Crosses `n` with the coordinate axis it is least aligned with, so the
/// result depends only on `n`.
pub fn perpendicular_vector(n: &Vector3<f64>) -> Vector3<f64> {
    let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
    let axis = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };
    n.cross(&axis).normalize()
}

/// Orthonormal tangent pair `(e1, e2)` with `e1 × e2 = n` for a unit normal.
pub fn tangent_basis(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let e1 = perpendicular_vector(n);
    let e2 = n.cross(&e1);
    (e1, e2)
}
