//! Synthetic benchmark surfaces.
//!
//! Analytic shapes with known curvature, used to validate the estimators:
//!
//! | Surface | κ1 | κ2 |
//! |---------|----|----|
//! | [`icosphere`] of radius R | 1/R | 1/R |
//! | [`cylinder`] of radius r | 1/r | 0 |
//! | [`torus`] with radii c, a | 1/a | cos v / (c + a cos v) |
//! | [`plane`] | 0 | 0 |
//!
//! All surfaces are oriented with outward (or +z) normals. [`add_noise`]
//! displaces vertices along their normals with seeded Gaussian noise.
//!
//! # Example
//!
//! ```
//! use vvcurv::synthetic;
//!
//! let sphere = synthetic::icosphere(10.0, 2).unwrap();
//! assert_eq!(sphere.num_faces(), 320);
//! assert!(sphere.is_closed());
//! ```

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, VvError};
use crate::mesh::{build_from_triangles, TriangleMesh};

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(VvError::invalid_param(
            name,
            value,
            "must be positive and finite",
        ));
    }
    Ok(())
}

/// Sphere around the origin from a subdivided icosahedron.
///
/// Every subdivision splits each triangle into four, so the result has
/// `20 · 4^subdivisions` faces.
pub fn icosphere(radius: f64, subdivisions: usize) -> Result<TriangleMesh> {
    check_positive("radius", radius)?;

    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let mut vertices: Vec<Vector3<f64>> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vector3::new(x, y, z).normalize())
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vector3<f64>>| {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                vertices.push(((vertices[a] + vertices[b]) * 0.5).normalize());
                vertices.len() - 1
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            next.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }

    let points: Vec<Point3<f64>> = vertices
        .iter()
        .map(|v| Point3::from(v * radius))
        .collect();
    build_from_triangles(&points, &faces)
}

/// Latitude-longitude sphere around the origin.
///
/// Has `segments` vertices per ring and `rings` bands between the poles.
/// Triangles are less uniform than on an [`icosphere`], which makes it a
/// harder test case.
pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> Result<TriangleMesh> {
    check_positive("radius", radius)?;
    if segments < 3 {
        return Err(VvError::invalid_param("segments", segments, "must be at least 3"));
    }
    if rings < 2 {
        return Err(VvError::invalid_param("rings", rings, "must be at least 2"));
    }

    let mut vertices = vec![Point3::new(0.0, 0.0, radius)];
    for j in 1..rings {
        let theta = PI * j as f64 / rings as f64;
        for i in 0..segments {
            let phi = TAU * i as f64 / segments as f64;
            vertices.push(Point3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ));
        }
    }
    vertices.push(Point3::new(0.0, 0.0, -radius));
    let south = vertices.len() - 1;
    let ring = |j: usize, i: usize| 1 + (j - 1) * segments + i % segments;

    let mut faces = Vec::new();
    for i in 0..segments {
        faces.push([0, ring(1, i), ring(1, i + 1)]);
        faces.push([south, ring(rings - 1, i + 1), ring(rings - 1, i)]);
    }
    for j in 1..rings - 1 {
        for i in 0..segments {
            let (a, b) = (ring(j, i), ring(j, i + 1));
            let (c, d) = (ring(j + 1, i), ring(j + 1, i + 1));
            faces.push([a, c, d]);
            faces.push([a, d, b]);
        }
    }

    build_from_triangles(&vertices, &faces)
}

/// Open cylinder around the z axis from `z = 0` to `z = height`.
///
/// `segments` vertices around, `rings` bands along the axis. Normals point
/// outward.
pub fn cylinder(radius: f64, height: f64, segments: usize, rings: usize) -> Result<TriangleMesh> {
    check_positive("radius", radius)?;
    check_positive("height", height)?;
    if segments < 3 {
        return Err(VvError::invalid_param("segments", segments, "must be at least 3"));
    }
    if rings == 0 {
        return Err(VvError::invalid_param("rings", rings, "must be at least 1"));
    }

    let mut vertices = Vec::with_capacity(segments * (rings + 1));
    for j in 0..=rings {
        let z = height * j as f64 / rings as f64;
        for i in 0..segments {
            let phi = TAU * i as f64 / segments as f64;
            vertices.push(Point3::new(radius * phi.cos(), radius * phi.sin(), z));
        }
    }

    let index = |j: usize, i: usize| j * segments + i % segments;
    let mut faces = Vec::with_capacity(2 * segments * rings);
    for j in 0..rings {
        for i in 0..segments {
            let v00 = index(j, i);
            let v10 = index(j, i + 1);
            let v01 = index(j + 1, i);
            let v11 = index(j + 1, i + 1);
            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    build_from_triangles(&vertices, &faces)
}

/// Torus around the z axis with ring radius `c` and tube radius `a`.
///
/// A vertex at angles `(u, v)` sits at
/// `((c + a cos v) cos u, (c + a cos v) sin u, a sin v)`, with `nu` vertices
/// around the ring and `nv` around the tube. `v = 0` is the outer equator.
/// Normals point out of the tube.
///
/// The maximal curvature `1/a` follows the tube circle; the minimal one,
/// `cos v / (c + a cos v)`, is negative on the inner half.
pub fn torus(c: f64, a: f64, nu: usize, nv: usize) -> Result<TriangleMesh> {
    check_positive("c", c)?;
    check_positive("a", a)?;
    if a >= c {
        return Err(VvError::invalid_param("a", a, "must be smaller than c"));
    }
    if nu < 3 {
        return Err(VvError::invalid_param("nu", nu, "must be at least 3"));
    }
    if nv < 3 {
        return Err(VvError::invalid_param("nv", nv, "must be at least 3"));
    }

    let mut vertices = Vec::with_capacity(nu * nv);
    for j in 0..nv {
        let (sin_v, cos_v) = (TAU * j as f64 / nv as f64).sin_cos();
        let r = c + a * cos_v;
        for i in 0..nu {
            let (sin_u, cos_u) = (TAU * i as f64 / nu as f64).sin_cos();
            vertices.push(Point3::new(r * cos_u, r * sin_u, a * sin_v));
        }
    }

    let index = |j: usize, i: usize| (j % nv) * nu + i % nu;
    let mut faces = Vec::with_capacity(2 * nu * nv);
    for j in 0..nv {
        for i in 0..nu {
            let v00 = index(j, i);
            let v10 = index(j, i + 1);
            let v01 = index(j + 1, i);
            let v11 = index(j + 1, i + 1);
            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    build_from_triangles(&vertices, &faces)
}

/// Square patch in the z = 0 plane, centered on the origin.
///
/// `size` is the side length and `n` the number of cells per side; each
/// cell is split into two triangles. Normals point along +z.
pub fn plane(size: f64, n: usize) -> Result<TriangleMesh> {
    check_positive("size", size)?;
    if n == 0 {
        return Err(VvError::invalid_param("n", n, "must be at least 1"));
    }

    let step = size / n as f64;
    let half = size / 2.0;
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(
                i as f64 * step - half,
                j as f64 * step - half,
                0.0,
            ));
        }
    }

    let index = |j: usize, i: usize| j * (n + 1) + i;
    let mut faces = Vec::with_capacity(2 * n * n);
    for j in 0..n {
        for i in 0..n {
            faces.push([index(j, i), index(j, i + 1), index(j + 1, i + 1)]);
            faces.push([index(j, i), index(j + 1, i + 1), index(j + 1, i)]);
        }
    }

    build_from_triangles(&vertices, &faces)
}

/// Area-weighted vertex normals; zero for vertices without a usable face.
pub fn vertex_normals(mesh: &TriangleMesh) -> Vec<Vector3<f64>> {
    let mut normals = vec![Vector3::zeros(); mesh.num_vertices()];
    for f in mesh.face_ids() {
        let [p0, p1, p2] = mesh.face_positions(f);
        // Cross product length is twice the area
        let weighted = (p1 - p0).cross(&(p2 - p0));
        for v in mesh.face_triangle(f) {
            normals[v.index()] += weighted;
        }
    }
    for n in &mut normals {
        *n = n.try_normalize(f64::MIN_POSITIVE).unwrap_or_else(Vector3::zeros);
    }
    normals
}

/// Mean edge length over all face edges.
pub fn mean_edge_length(mesh: &TriangleMesh) -> f64 {
    let mut total = 0.0;
    for f in mesh.face_ids() {
        let [p0, p1, p2] = mesh.face_positions(f);
        total += (p1 - p0).norm() + (p2 - p1).norm() + (p0 - p2).norm();
    }
    total / (3 * mesh.num_faces()).max(1) as f64
}

/// Displace every vertex along its normal by Gaussian noise.
///
/// `sigma` is the standard deviation in mesh units. The same `seed` always
/// gives the same displacement. Connectivity is unchanged and areas are
/// recomputed.
pub fn add_noise(mesh: &TriangleMesh, sigma: f64, seed: u64) -> Result<TriangleMesh> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(VvError::invalid_param("sigma", sigma, "must not be negative"));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normals = vertex_normals(mesh);
    let vertices: Vec<Point3<f64>> = mesh
        .positions()
        .iter()
        .zip(&normals)
        .map(|(p, n)| p + n * (sigma * standard_normal(&mut rng)))
        .collect();

    build_from_triangles(&vertices, &mesh.raw_faces())
}

/// Box-Muller sample from N(0, 1).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
