//! Integration tests for the distance functions exported by `tsukiji-core`.

use tsukiji_core::{
    Cosine, DistanceError, DistanceFunction, Euclidean, SquaredEuclidean, VectorKind,
    cosine_distance, euclidean_distance, squared_euclidean_distance,
};
use rstest::rstest;

#[rstest]
#[case(vec![0.0_f32, 0.0], vec![0.0_f32, 0.0], 0.0_f32)]
#[case(vec![1.0_f32, 2.0], vec![4.0_f32, 6.0], 5.0_f32)]
#[case(vec![1.0_f32, 2.0, 3.0], vec![4.0_f32, 6.0, 8.0], 50.0_f32.sqrt())]
fn euclidean_distance_returns_expected(
    #[case] left: Vec<f32>,
    #[case] right: Vec<f32>,
    #[case] expected: f32,
) {
    let distance = euclidean_distance(&left, &right).expect("distance should succeed");
    assert!((distance.value() - expected).abs() < 1e-6);
    let squared = squared_euclidean_distance(&left, &right).expect("distance should succeed");
    assert!((squared.value() - expected * expected).abs() < 1e-4);
}

#[test]
fn euclidean_distance_rejects_dimension_mismatch() {
    let error =
        euclidean_distance(&[1.0_f32], &[1.0_f32, 2.0_f32]).expect_err("dimensions must match");
    assert_eq!(error, DistanceError::DimensionMismatch { left: 1, right: 2 });
}

#[test]
fn distances_reject_zero_length() {
    let empty: [f32; 0] = [];
    let error = squared_euclidean_distance(&empty, &empty).expect_err("empty input");
    assert_eq!(error, DistanceError::ZeroLength);
}

#[test]
fn distances_reject_non_finite_values() {
    let error = euclidean_distance(&[0.0_f32], &[f32::INFINITY]).expect_err("reject infinity");
    assert!(matches!(
        error,
        DistanceError::NonFinite {
            which: VectorKind::Right,
            index: 0,
            ..
        }
    ));
}

#[rstest]
#[case(vec![1.0_f32, 0.0], vec![1.0_f32, 0.0], 0.0_f32)]
#[case(vec![1.0_f32, 0.0], vec![-1.0_f32, 0.0], 2.0_f32)]
#[case(vec![1.0_f32, 0.0, 0.0], vec![0.0_f32, 1.0, 0.0], 1.0_f32)]
fn cosine_distance_returns_expected(
    #[case] left: Vec<f32>,
    #[case] right: Vec<f32>,
    #[case] expected: f32,
) {
    let distance = cosine_distance(&left, &right).expect("distance should succeed");
    assert!((distance.value() - expected).abs() < 1e-6);
}

#[test]
fn cosine_distance_rejects_zero_magnitude() {
    let error = cosine_distance(&[1.0_f32, 0.0], &[0.0_f32, 0.0]).expect_err("zero vector");
    assert_eq!(
        error,
        DistanceError::ZeroMagnitude {
            which: VectorKind::Right
        }
    );
}

#[rstest]
#[case::squared(&SquaredEuclidean as &dyn DistanceFunction, 25.0)]
#[case::euclidean(&Euclidean as &dyn DistanceFunction, 5.0)]
fn metrics_agree_with_free_functions(#[case] metric: &dyn DistanceFunction, #[case] expected: f32) {
    let distance = metric
        .distance(&[0.0, 0.0], &[3.0, 4.0])
        .expect("valid vectors");
    assert!((distance.value() - expected).abs() < 1e-6);
}

#[test]
fn metrics_are_symmetric() {
    let left = [0.3_f32, -1.2, 4.0];
    let right = [2.0_f32, 0.5, -0.25];
    for metric in [&SquaredEuclidean as &dyn DistanceFunction, &Euclidean, &Cosine] {
        let forward = metric.distance(&left, &right).expect("valid");
        let backward = metric.distance(&right, &left).expect("valid");
        assert!(
            (forward.value() - backward.value()).abs() < 1e-6,
            "{} is not symmetric",
            metric.name()
        );
    }
}
