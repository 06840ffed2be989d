use super::*;

const EPSILON: f32 = 1e-5;

fn approx_eq(left: f32, right: f32) {
    assert!((left - right).abs() < EPSILON, "expected {left} ~= {right}");
}

fn approx_eq_tol(left: f32, right: f32, epsilon: f32) {
    assert!((left - right).abs() < epsilon, "expected {left} ~= {right}");
}

fn deterministic_counts(seed: usize, len: usize) -> Vec<f32> {
    (0..len)
        .map(|index| {
            let mixed = seed
                .wrapping_mul(1_103_515_245)
                .wrapping_add(index.wrapping_mul(12_345))
                .wrapping_add(97);
            (mixed % 7) as f32
        })
        .collect()
}

#[test]
fn l2_distance_works() {
    let left = [2.0, 0.0, 1.0];
    let right = [2.0, 0.0, 4.0];
    let distance = l2_distance(&left, &right).expect("l2 distance should succeed");
    approx_eq(distance, 3.0);
    approx_eq(l2_squared_unchecked(&left, &right), 9.0);
}

#[test]
fn l1_distance_works() {
    let left = [2.0, 0.0, 1.0];
    let right = [0.0, 3.0, 1.0];
    let distance = l1_distance(&left, &right).expect("l1 distance should succeed");
    approx_eq(distance, 5.0);
    approx_eq(l1_distance_unchecked(&left, &right), 5.0);
}

#[test]
fn errors_on_dimension_mismatch() {
    let error = l2_distance(&[1.0, 2.0], &[1.0]).expect_err("must fail");
    assert!(matches!(
        error,
        VectorError::DimensionMismatch { left: 2, right: 1 }
    ));
}

#[test]
fn errors_on_empty_vectors() {
    let error = l1_distance(&[], &[]).expect_err("must fail");
    assert!(matches!(error, VectorError::EmptyVector));
}

#[test]
fn rejects_nan_on_left() {
    let error = l2_distance(&[f32::NAN, 1.0], &[1.0, 1.0]).expect_err("must fail");
    assert!(matches!(
        error,
        VectorError::NonFinite {
            side: VectorSide::Left,
            index: 0,
            ..
        }
    ));
}

#[test]
fn rejects_inf_on_right() {
    let error = l1_distance(&[1.0, 1.0], &[1.0, f32::INFINITY]).expect_err("must fail");
    assert!(matches!(
        error,
        VectorError::NonFinite {
            side: VectorSide::Right,
            index: 1,
            ..
        }
    ));
}

#[test]
fn first_non_finite_reports_position() {
    assert_eq!(first_non_finite(&[1.0, 2.0]), None);
    let (index, value) = first_non_finite(&[1.0, f32::NEG_INFINITY]).expect("must find");
    assert_eq!(index, 1);
    assert!(value.is_infinite());
}

#[test]
fn l2_identity_and_symmetry() {
    let a = [1.0, 0.0, 4.0];
    let b = [5.0, 3.0, 0.0];
    approx_eq(l2_distance(&a, &a).expect("must succeed"), 0.0);
    approx_eq(
        l2_distance(&a, &b).expect("must succeed"),
        l2_distance(&b, &a).expect("must succeed"),
    );
}

#[test]
fn simd_paths_match_scalar_reference_across_varied_dimensions() {
    for len in [1usize, 2, 3, 7, 8, 9, 15, 16, 17, 31, 32, 33, 127, 128, 129] {
        let left = deterministic_counts(11, len);
        let right = deterministic_counts(29, len);

        let l2 = l2_distance(&left, &right).expect("l2 must succeed");
        let l2_reference = left
            .iter()
            .zip(&right)
            .map(|(l, r)| {
                let delta = l - r;
                delta * delta
            })
            .sum::<f32>()
            .sqrt();
        approx_eq_tol(l2, l2_reference, 1e-3);

        let l1 = l1_distance(&left, &right).expect("l1 must succeed");
        let l1_reference: f32 = left.iter().zip(&right).map(|(l, r)| (l - r).abs()).sum();
        approx_eq_tol(l1, l1_reference, 1e-3);
    }
}
