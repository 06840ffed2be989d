use std::error::Error;
use std::fmt;
use wide::f32x8;

const SIMD_WIDTH: usize = 8;

/// Identifies which input vector triggered a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSide {
    Left,
    Right,
}

/// Error type for validated distance computations.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorError {
    /// Returned when vectors do not share the same dimension.
    DimensionMismatch { left: usize, right: usize },
    /// Returned when one or both vectors are empty.
    EmptyVector,
    /// Returned when a NaN or Infinity value is present.
    NonFinite {
        side: VectorSide,
        index: usize,
        value: f32,
    },
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { left, right } => {
                write!(f, "dimension mismatch: left={left}, right={right}")
            }
            Self::EmptyVector => write!(f, "vector is empty"),
            Self::NonFinite { side, index, value } => {
                let side = match side {
                    VectorSide::Left => "left",
                    VectorSide::Right => "right",
                };
                write!(
                    f,
                    "non-finite value in {side} vector at index {index}: {value}"
                )
            }
        }
    }
}

impl Error for VectorError {}

fn validate_vectors(left: &[f32], right: &[f32]) -> Result<(), VectorError> {
    if left.is_empty() || right.is_empty() {
        return Err(VectorError::EmptyVector);
    }
    if left.len() != right.len() {
        return Err(VectorError::DimensionMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if let Some((index, value)) = first_non_finite(left) {
        return Err(VectorError::NonFinite {
            side: VectorSide::Left,
            index,
            value,
        });
    }
    if let Some((index, value)) = first_non_finite(right) {
        return Err(VectorError::NonFinite {
            side: VectorSide::Right,
            index,
            value,
        });
    }
    Ok(())
}

/// Returns the position and value of the first NaN or Infinity entry.
pub fn first_non_finite(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
}

/// Computes the Euclidean (L2) distance with validation.
pub fn l2_distance(left: &[f32], right: &[f32]) -> Result<f32, VectorError> {
    validate_vectors(left, right)?;
    Ok(simd_l2_squared(left, right).sqrt())
}

/// Computes the Manhattan (L1) distance with validation.
pub fn l1_distance(left: &[f32], right: &[f32]) -> Result<f32, VectorError> {
    validate_vectors(left, right)?;
    Ok(simd_l1(left, right))
}

/// Computes the squared Euclidean (L2) distance without runtime validation.
///
/// Callers must ensure both vectors are non-empty, have the same length and
/// only contain finite values.
pub fn l2_squared_unchecked(left: &[f32], right: &[f32]) -> f32 {
    debug_assert!(!left.is_empty());
    debug_assert_eq!(left.len(), right.len());
    simd_l2_squared(left, right)
}

/// Computes the Manhattan (L1) distance without runtime validation.
///
/// Same preconditions as [`l2_squared_unchecked`].
pub fn l1_distance_unchecked(left: &[f32], right: &[f32]) -> f32 {
    debug_assert!(!left.is_empty());
    debug_assert_eq!(left.len(), right.len());
    simd_l1(left, right)
}

fn load_f32x8(values: &[f32]) -> f32x8 {
    debug_assert_eq!(values.len(), SIMD_WIDTH);
    f32x8::from([
        values[0], values[1], values[2], values[3], values[4], values[5], values[6], values[7],
    ])
}

fn simd_scan(
    left: &[f32],
    right: &[f32],
    mut simd_step: impl FnMut(f32x8, f32x8),
    mut scalar_step: impl FnMut(f32, f32),
) {
    let mut left_chunks = left.chunks_exact(SIMD_WIDTH);
    let mut right_chunks = right.chunks_exact(SIMD_WIDTH);

    for (left_chunk, right_chunk) in left_chunks.by_ref().zip(right_chunks.by_ref()) {
        simd_step(load_f32x8(left_chunk), load_f32x8(right_chunk));
    }

    for (&left_value, &right_value) in left_chunks.remainder().iter().zip(right_chunks.remainder())
    {
        scalar_step(left_value, right_value);
    }
}

fn simd_l2_squared(left: &[f32], right: &[f32]) -> f32 {
    let mut simd_sum = f32x8::ZERO;
    let mut scalar_sum = 0.0;

    simd_scan(
        left,
        right,
        |left_v, right_v| {
            let delta = left_v - right_v;
            simd_sum += delta * delta;
        },
        |left_value, right_value| {
            let delta = left_value - right_value;
            scalar_sum += delta * delta;
        },
    );

    simd_sum.reduce_add() + scalar_sum
}

fn simd_l1(left: &[f32], right: &[f32]) -> f32 {
    let mut simd_sum = f32x8::ZERO;
    let mut scalar_sum = 0.0;

    simd_scan(
        left,
        right,
        |left_v, right_v| {
            simd_sum += (left_v - right_v).abs();
        },
        |left_value, right_value| {
            scalar_sum += (left_value - right_value).abs();
        },
    );

    simd_sum.reduce_add() + scalar_sum
}

#[cfg(test)]
mod tests;
