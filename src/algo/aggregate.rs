//! Result aggregation.
//!
//! Merges the per-node outputs of both passes into index-aligned arrays,
//! derives the scalar descriptors and classifies every node.

use std::f64::consts::FRAC_2_PI;
use std::fmt;

use nalgebra::Vector3;

use super::curvature::NodeCurvature;
use super::normals::NormalEstimate;
use super::validity::InvalidReason;
use crate::error::{Result, VvError};
use crate::graph::TriangleGraph;

/// Local shape class from the normal-voting saliencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShapeClass {
    /// One dominant normal direction.
    SurfacePatch = 1,
    /// Normals spread within a plane, as along a crease or junction.
    CreaseJunction = 2,
    /// Normals spread in all directions.
    NoPreferredOrientation = 3,
}

impl ShapeClass {
    /// Classify saliencies `[λ1 − λ2, λ2 − λ3, λ3]`.
    ///
    /// The class maximizes `(λ1 − λ2, ε (λ2 − λ3), ε η λ3)`; ties go to the
    /// lower class, so with `ε = 0` every node is a surface patch.
    pub fn classify(saliencies: [f64; 3], epsilon: f64, eta: f64) -> Option<ShapeClass> {
        if !saliencies.iter().all(|s| s.is_finite()) {
            return None;
        }
        let scores = [
            saliencies[0],
            epsilon * saliencies[1],
            epsilon * eta * saliencies[2],
        ];
        let mut best = 0;
        for k in 1..3 {
            if scores[k] > scores[best] {
                best = k;
            }
        }
        Some(match best {
            0 => ShapeClass::SurfacePatch,
            1 => ShapeClass::CreaseJunction,
            _ => ShapeClass::NoPreferredOrientation,
        })
    }

    /// Numeric class label (1, 2 or 3).
    #[inline]
    pub fn label(self) -> u8 {
        self as u8
    }
}

/// Koenderink shape category derived from shape index and curvedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeCategory {
    /// Shape index in `[-1, -7/8)`.
    Cup,
    /// Shape index in `[-7/8, -5/8)`.
    Trough,
    /// Shape index in `[-5/8, -3/8)`.
    Rut,
    /// Shape index in `[-3/8, -1/8)`.
    SaddleRut,
    /// Shape index in `[-1/8, 1/8)`.
    Saddle,
    /// Shape index in `[1/8, 3/8)`.
    SaddleRidge,
    /// Shape index in `[3/8, 5/8)`.
    Ridge,
    /// Shape index in `[5/8, 7/8)`.
    Dome,
    /// Shape index in `[7/8, 1]`.
    Cap,
    /// Curvedness below the flatness threshold.
    Plane,
}

impl ShapeCategory {
    const BY_INDEX: [ShapeCategory; 9] = [
        ShapeCategory::Cup,
        ShapeCategory::Trough,
        ShapeCategory::Rut,
        ShapeCategory::SaddleRut,
        ShapeCategory::Saddle,
        ShapeCategory::SaddleRidge,
        ShapeCategory::Ridge,
        ShapeCategory::Dome,
        ShapeCategory::Cap,
    ];

    /// Categorize a node. Returns `None` for non-finite input.
    pub fn from_shape(shape_index: f64, curvedness: f64, flat_curvedness: f64) -> Option<Self> {
        if !(shape_index.is_finite() && curvedness.is_finite()) {
            return None;
        }
        if curvedness < flat_curvedness {
            return Some(ShapeCategory::Plane);
        }
        let bin = ((shape_index + 1.0) * 4.0 + 0.5).floor().clamp(0.0, 8.0) as usize;
        Some(Self::BY_INDEX[bin])
    }

    /// Categorize a node from its principal curvatures.
    ///
    /// Same as [`from_shape`](Self::from_shape), except that an exact
    /// umbilic (`κ1 = κ2`, shape index 0) is a cap when convex and a cup
    /// when concave.
    pub fn from_curvatures(kappa_1: f64, kappa_2: f64, flat_curvedness: f64) -> Option<Self> {
        if !(kappa_1.is_finite() && kappa_2.is_finite()) {
            return None;
        }
        let c = curvedness(kappa_1, kappa_2);
        if c >= flat_curvedness && kappa_1 == kappa_2 {
            return Some(if kappa_1 > 0.0 {
                ShapeCategory::Cap
            } else {
                ShapeCategory::Cup
            });
        }
        Self::from_shape(shape_index(kappa_1, kappa_2), c, flat_curvedness)
    }

    /// Numeric code: 1 (cup) to 9 (cap), 10 for plane.
    pub fn code(self) -> u8 {
        match self {
            ShapeCategory::Plane => 10,
            other => Self::BY_INDEX
                .iter()
                .position(|&c| c == other)
                .map_or(0, |i| i as u8 + 1),
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeCategory::Cup => "cup",
            ShapeCategory::Trough => "trough",
            ShapeCategory::Rut => "rut",
            ShapeCategory::SaddleRut => "saddle rut",
            ShapeCategory::Saddle => "saddle",
            ShapeCategory::SaddleRidge => "saddle ridge",
            ShapeCategory::Ridge => "ridge",
            ShapeCategory::Dome => "dome",
            ShapeCategory::Cap => "cap",
            ShapeCategory::Plane => "plane",
        }
    }
}

impl fmt::Display for ShapeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape index `(2/π) atan((κ1 + κ2) / (κ1 − κ2))`, 0 when `κ1 = κ2`.
#[inline]
pub fn shape_index(kappa_1: f64, kappa_2: f64) -> f64 {
    if kappa_1 == kappa_2 {
        return 0.0;
    }
    FRAC_2_PI * ((kappa_1 + kappa_2) / (kappa_1 - kappa_2)).atan()
}

/// Curvedness `sqrt((κ1² + κ2²) / 2)`.
#[inline]
pub fn curvedness(kappa_1: f64, kappa_2: f64) -> f64 {
    ((kappa_1 * kappa_1 + kappa_2 * kappa_2) / 2.0).sqrt()
}

/// Scalar per-node attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Maximal principal curvature.
    Kappa1,
    /// Minimal principal curvature.
    Kappa2,
    /// Gauss curvature.
    Gauss,
    /// Mean curvature.
    Mean,
    /// Shape index.
    ShapeIndex,
    /// Curvedness.
    Curvedness,
    /// Triangle area.
    Area,
}

impl Attribute {
    /// All scalar attributes.
    pub const ALL: [Attribute; 7] = [
        Attribute::Kappa1,
        Attribute::Kappa2,
        Attribute::Gauss,
        Attribute::Mean,
        Attribute::ShapeIndex,
        Attribute::Curvedness,
        Attribute::Area,
    ];

    /// Attribute name, used for file and property names.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Kappa1 => "kappa_1",
            Attribute::Kappa2 => "kappa_2",
            Attribute::Gauss => "gauss_curvature",
            Attribute::Mean => "mean_curvature",
            Attribute::ShapeIndex => "shape_index",
            Attribute::Curvedness => "curvedness",
            Attribute::Area => "area",
        }
    }
}

/// Summary statistics over the valid, finite entries of one attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of entries included.
    pub count: usize,
    /// Minimum, NaN when `count == 0`.
    pub min: f64,
    /// Maximum, NaN when `count == 0`.
    pub max: f64,
    /// Arithmetic mean, NaN when `count == 0`.
    pub mean: f64,
}

impl Summary {
    fn of<'a>(values: impl Iterator<Item = &'a f64>) -> Self {
        let mut count = 0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values.filter(|v| v.is_finite()) {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        if count == 0 {
            return Summary {
                count,
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
            };
        }
        Summary {
            count,
            min,
            max,
            mean: sum / count as f64,
        }
    }
}

/// Per-node output of a curvature run, index-aligned with the mesh
/// triangles.
///
/// Invalid nodes have NaN in every curvature field and direction, and
/// `None` as category.
#[derive(Debug, Clone)]
pub struct CurvatureResult {
    /// Graph snapshot carrying the refined normals.
    pub graph: TriangleGraph,
    /// Refined unit normals.
    pub normals: Vec<Vector3<f64>>,
    /// Maximal principal curvature.
    pub kappa_1: Vec<f64>,
    /// Minimal principal curvature.
    pub kappa_2: Vec<f64>,
    /// Direction of `kappa_1`.
    pub dir_1: Vec<Vector3<f64>>,
    /// Direction of `kappa_2`.
    pub dir_2: Vec<Vector3<f64>>,
    /// Gauss curvature `κ1 κ2`.
    pub gauss: Vec<f64>,
    /// Mean curvature `(κ1 + κ2) / 2`.
    pub mean: Vec<f64>,
    /// Shape index.
    pub shape_index: Vec<f64>,
    /// Curvedness.
    pub curvedness: Vec<f64>,
    /// Triangle areas (pass-through).
    pub areas: Vec<f64>,
    /// Normal-voting saliencies.
    pub saliencies: Vec<[f64; 3]>,
    /// Shape class from the saliencies; `None` if normal voting failed.
    pub shape_class: Vec<Option<ShapeClass>>,
    /// Koenderink category.
    pub category: Vec<Option<ShapeCategory>>,
    /// Why a node is invalid; `None` for valid nodes.
    pub invalid: Vec<Option<InvalidReason>>,
}

/// Thresholds used while aggregating.
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Classification weight of the crease saliency.
    pub epsilon: f64,
    /// Classification weight of the ball saliency relative to `epsilon`.
    pub eta: f64,
    /// Curvedness below which a node is categorized as plane.
    pub flat_curvedness: f64,
}

impl CurvatureResult {
    /// Merge pass outputs into a result.
    ///
    /// A node is valid only if both passes produced a valid estimate for it.
    pub fn assemble(
        graph: TriangleGraph,
        normals: &[NormalEstimate],
        curvatures: &[NodeCurvature],
        options: &AggregateOptions,
    ) -> Result<Self> {
        let n = graph.num_nodes();
        for len in [normals.len(), curvatures.len()] {
            if len != n {
                return Err(VvError::LengthMismatch {
                    expected: n,
                    got: len,
                });
            }
        }

        let nan3 = Vector3::repeat(f64::NAN);
        let mut result = CurvatureResult {
            normals: normals.iter().map(|e| e.normal).collect(),
            kappa_1: vec![f64::NAN; n],
            kappa_2: vec![f64::NAN; n],
            dir_1: vec![nan3; n],
            dir_2: vec![nan3; n],
            gauss: vec![f64::NAN; n],
            mean: vec![f64::NAN; n],
            shape_index: vec![f64::NAN; n],
            curvedness: vec![f64::NAN; n],
            areas: graph.nodes().iter().map(|node| node.area).collect(),
            saliencies: normals.iter().map(|e| e.saliencies).collect(),
            shape_class: normals
                .iter()
                .map(|e| ShapeClass::classify(e.saliencies, options.epsilon, options.eta))
                .collect(),
            category: vec![None; n],
            invalid: vec![None; n],
            graph,
        };

        for i in 0..n {
            let pc = match (normals[i].invalid, &curvatures[i]) {
                (Some(reason), _) | (None, &Err(reason)) => {
                    result.invalid[i] = Some(reason);
                    continue;
                }
                (None, Ok(pc)) => *pc,
            };

            let (k1, k2) = (pc.kappa_1, pc.kappa_2);
            result.kappa_1[i] = k1;
            result.kappa_2[i] = k2;
            result.dir_1[i] = pc.dir_1;
            result.dir_2[i] = pc.dir_2;
            result.gauss[i] = k1 * k2;
            result.mean[i] = 0.5 * (k1 + k2);
            result.shape_index[i] = shape_index(k1, k2);
            result.curvedness[i] = curvedness(k1, k2);
            result.category[i] =
                ShapeCategory::from_curvatures(k1, k2, options.flat_curvedness);
        }

        Ok(result)
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.kappa_1.len()
    }

    /// Check if the result is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kappa_1.is_empty()
    }

    /// Whether node `i` has a valid estimate.
    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.invalid[i].is_none()
    }

    /// Validity flags.
    pub fn validity(&self) -> Vec<bool> {
        self.invalid.iter().map(Option::is_none).collect()
    }

    /// Number of valid nodes.
    pub fn num_valid(&self) -> usize {
        self.invalid.iter().filter(|r| r.is_none()).count()
    }

    /// Values of a scalar attribute.
    pub fn scalar(&self, attribute: Attribute) -> &[f64] {
        match attribute {
            Attribute::Kappa1 => &self.kappa_1,
            Attribute::Kappa2 => &self.kappa_2,
            Attribute::Gauss => &self.gauss,
            Attribute::Mean => &self.mean,
            Attribute::ShapeIndex => &self.shape_index,
            Attribute::Curvedness => &self.curvedness,
            Attribute::Area => &self.areas,
        }
    }

    /// Summary statistics of a scalar attribute over valid nodes.
    pub fn summary(&self, attribute: Attribute) -> Summary {
        Summary::of(
            self.scalar(attribute)
                .iter()
                .zip(&self.invalid)
                .filter(|(_, r)| r.is_none())
                .map(|(v, _)| v),
        )
    }

    /// Number of invalid nodes per reason, in order of first occurrence.
    pub fn invalid_counts(&self) -> Vec<(InvalidReason, usize)> {
        let mut counts: Vec<(InvalidReason, usize)> = Vec::new();
        for reason in self.invalid.iter().flatten() {
            match counts.iter_mut().find(|(r, _)| r == reason) {
                Some((_, c)) => *c += 1,
                None => counts.push((*reason, 1)),
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shape_index() {
        assert_eq!(shape_index(0.1, 0.1), 0.0);
        assert_relative_eq!(shape_index(1.0, 0.999_999), 1.0, epsilon = 1e-5);
        assert_relative_eq!(shape_index(-0.999_999, -1.0), -1.0, epsilon = 1e-5);
        assert_relative_eq!(shape_index(1.0, -1.0), 0.0);
        assert_relative_eq!(shape_index(1.0, 0.0), 0.5);
        assert_relative_eq!(shape_index(0.0, -1.0), -0.5);
    }

    #[test]
    fn test_curvedness() {
        assert_relative_eq!(curvedness(0.1, 0.1), 0.1, epsilon = 1e-15);
        assert_relative_eq!(curvedness(3.0, -4.0), (12.5_f64).sqrt());
    }

    #[test]
    fn test_categories() {
        let cat = |s| ShapeCategory::from_shape(s, 1.0, 1e-6).unwrap();
        assert_eq!(cat(-1.0), ShapeCategory::Cup);
        assert_eq!(cat(-0.75), ShapeCategory::Trough);
        assert_eq!(cat(-0.5), ShapeCategory::Rut);
        assert_eq!(cat(-0.25), ShapeCategory::SaddleRut);
        assert_eq!(cat(0.0), ShapeCategory::Saddle);
        assert_eq!(cat(0.25), ShapeCategory::SaddleRidge);
        assert_eq!(cat(0.5), ShapeCategory::Ridge);
        assert_eq!(cat(0.75), ShapeCategory::Dome);
        assert_eq!(cat(1.0), ShapeCategory::Cap);
        assert_eq!(
            ShapeCategory::from_shape(1.0, 1e-9, 1e-6),
            Some(ShapeCategory::Plane)
        );
        assert_eq!(ShapeCategory::from_shape(f64::NAN, 1.0, 1e-6), None);
        assert_eq!(ShapeCategory::Cup.code(), 1);
        assert_eq!(ShapeCategory::Cap.code(), 9);
        assert_eq!(ShapeCategory::Plane.code(), 10);
    }

    #[test]
    fn test_umbilic_categories() {
        let cat = |k| ShapeCategory::from_curvatures(k, k, 1e-6);
        assert_eq!(cat(0.1), Some(ShapeCategory::Cap));
        assert_eq!(cat(-0.1), Some(ShapeCategory::Cup));
        assert_eq!(cat(1e-9), Some(ShapeCategory::Plane));
        assert_eq!(cat(f64::NAN), None);

        // Away from the umbilic the shape index decides
        assert_eq!(
            ShapeCategory::from_curvatures(0.1, -0.1, 1e-6),
            Some(ShapeCategory::Saddle)
        );
        assert_eq!(
            ShapeCategory::from_curvatures(0.1, 0.0, 1e-6),
            Some(ShapeCategory::Ridge)
        );
    }

    #[test]
    fn test_classification() {
        let s = [1.0, 2.0, 4.0];
        assert_eq!(
            ShapeClass::classify(s, 0.0, 0.0),
            Some(ShapeClass::SurfacePatch)
        );
        assert_eq!(
            ShapeClass::classify(s, 1.0, 0.0),
            Some(ShapeClass::CreaseJunction)
        );
        assert_eq!(
            ShapeClass::classify(s, 1.0, 1.0),
            Some(ShapeClass::NoPreferredOrientation)
        );
        assert_eq!(ShapeClass::classify([f64::NAN; 3], 1.0, 1.0), None);
        assert_eq!(ShapeClass::CreaseJunction.label(), 2);
    }

    #[test]
    fn test_summary_skips_non_finite() {
        let values = [1.0, f64::NAN, 3.0, -2.0];
        let s = Summary::of(values.iter());
        assert_eq!(s.count, 3);
        assert_eq!(s.min, -2.0);
        assert_eq!(s.max, 3.0);
        assert_relative_eq!(s.mean, 2.0 / 3.0);

        let empty = Summary::of([].iter());
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_nan());
    }
}
