//! Property-based tests for the voting pipeline.
//!
//! Random noisy surfaces, random parameters; the invariants below must hold
//! for every node regardless of estimate quality.
//!
//! Run with: cargo test --test proptest_voting

use proptest::prelude::*;
use vvcurv::graph::{neighborhood, NeighborhoodOptions};
use vvcurv::prelude::*;
use vvcurv::synthetic;

// =============================================================================
// Strategies
// =============================================================================

fn arb_variant() -> impl Strategy<Value = Variant> {
    prop_oneof![Just(Variant::Avv), Just(Variant::Ssvv), Just(Variant::Rvv)]
}

/// A small noisy surface: sphere, cylinder or plane.
fn arb_surface() -> impl Strategy<Value = TriangleMesh> {
    let sphere = (2.0..20.0f64, 0..3usize).prop_map(|(r, level)| {
        synthetic::icosphere(r, level).unwrap()
    });
    let cylinder = (2.0..10.0f64, 8..24usize, 1..6usize).prop_map(|(r, segments, rings)| {
        synthetic::cylinder(r, 2.0 * r, segments, rings).unwrap()
    });
    let plane = (1.0..10.0f64, 2..10usize).prop_map(|(size, n)| synthetic::plane(size, n).unwrap());

    (prop_oneof![sphere, cylinder, plane], 0.0..0.2f64, any::<u64>()).prop_map(
        |(mesh, noise, seed)| {
            let sigma = noise * synthetic::mean_edge_length(&mesh);
            synthetic::add_noise(&mesh, sigma, seed).unwrap()
        },
    )
}

// =============================================================================
// Property Tests: Per-node invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// κ1 ≥ κ2, directions orthonormal and tangent, lengths aligned.
    #[test]
    fn estimates_are_well_formed(
        mesh in arb_surface(),
        variant in arb_variant(),
        radius_fraction in 0.05..0.5f64,
        workers in 1..4usize,
    ) {
        let (min, max) = mesh.bounding_box().unwrap();
        let radius_hit = radius_fraction * (max - min).norm();
        let options = VotingOptions::new(radius_hit)
            .with_variant(variant)
            .with_num_workers(workers);
        let result = estimate_curvature(&mesh, &options).unwrap();

        prop_assert_eq!(result.len(), mesh.num_faces());
        for i in 0..result.len() {
            if !result.is_valid(i) {
                prop_assert!(result.kappa_1[i].is_nan());
                prop_assert!(result.category[i].is_none());
                continue;
            }
            let n = result.normals[i];
            let (d1, d2) = (result.dir_1[i], result.dir_2[i]);

            prop_assert!(result.kappa_1[i] >= result.kappa_2[i]);
            prop_assert!((n.norm() - 1.0).abs() < 1e-9);
            prop_assert!((d1.norm() - 1.0).abs() < 1e-9);
            prop_assert!((d2.norm() - 1.0).abs() < 1e-9);
            prop_assert!(d1.dot(&n).abs() < 1e-9);
            prop_assert!(d2.dot(&n).abs() < 1e-9);
            prop_assert!(d1.dot(&d2).abs() < 1e-9);

            prop_assert!((-1.0..=1.0).contains(&result.shape_index[i]));
            prop_assert!(result.curvedness[i] >= 0.0);
            prop_assert!(result.category[i].is_some());
            prop_assert!(result.shape_class[i].is_some());
        }
    }

    /// Classification never fails for finite saliencies.
    #[test]
    fn saliencies_are_non_negative(mesh in arb_surface()) {
        let (min, max) = mesh.bounding_box().unwrap();
        let options = VotingOptions::new(0.2 * (max - min).norm())
            .with_variant(Variant::Avv)
            .with_classification(1.0, 1.0)
            .with_num_workers(2);
        let result = estimate_curvature(&mesh, &options).unwrap();

        for (i, s) in result.saliencies.iter().enumerate() {
            if s.iter().all(|v| v.is_finite()) {
                let scale = 1.0 + s.iter().map(|v| v.abs()).sum::<f64>();
                prop_assert!(s.iter().all(|&v| v >= -1e-9 * scale), "node {}: {:?}", i, s);
                prop_assert!(result.shape_class[i].is_some());
            }
        }
    }
}

// =============================================================================
// Property Tests: Neighborhoods
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A larger radius never drops a neighbor.
    #[test]
    fn neighborhoods_grow_with_radius(
        mesh in arb_surface(),
        node_fraction in 0.0..1.0f64,
        r1 in 0.0..5.0f64,
        extra in 0.0..5.0f64,
    ) {
        let graph = build_graph(&mesh, &GraphOptions::default()).unwrap();
        let node = NodeId::new(((graph.num_nodes() - 1) as f64 * node_fraction) as usize);

        let small = neighborhood(&graph, node, &NeighborhoodOptions::new(r1));
        let large = neighborhood(&graph, node, &NeighborhoodOptions::new(r1 + extra));

        prop_assert!(small.len() <= large.len());
        prop_assert_eq!(small.entries()[0].node, node);
        for entry in small.entries() {
            prop_assert!(large.contains(entry.node));
            prop_assert!(entry.distance <= r1);
        }
    }
}
