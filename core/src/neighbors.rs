use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matrix::{CustomerId, InteractionMatrix};
use crate::vector::{first_non_finite, l1_distance_unchecked, l2_squared_unchecked};

/// Distance used to rank stored vectors against a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: CustomerId,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    ZeroDimension,
    EmptyId { position: usize },
    DuplicateId(CustomerId),
    InvalidDimension {
        id: CustomerId,
        expected: usize,
        got: usize,
    },
    NonFiniteValue { id: CustomerId, index: usize },
    QueryDimension { expected: usize, got: usize },
    NonFiniteQuery { index: usize },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "index dimension must be > 0"),
            Self::EmptyId { position } => {
                write!(f, "indexed vector at position {position} has an empty id")
            }
            Self::DuplicateId(id) => write!(f, "duplicate indexed id '{id}'"),
            Self::InvalidDimension { id, expected, got } => write!(
                f,
                "indexed vector '{id}' has dimension {got}, expected {expected}"
            ),
            Self::NonFiniteValue { id, index } => write!(
                f,
                "indexed vector '{id}' contains a non-finite value at index {index}"
            ),
            Self::QueryDimension { expected, got } => write!(
                f,
                "query dimension {got} does not match index dimension {expected}"
            ),
            Self::NonFiniteQuery { index } => {
                write!(f, "query contains a non-finite value at index {index}")
            }
        }
    }
}

impl Error for IndexError {}

/// Nearest-neighbor lookup over a fixed set of customer vectors.
pub trait NeighborIndex: Send + Sync {
    /// Returns at most `k` stored vectors ordered by ascending distance to
    /// `query`. Ties keep the index's own stored order.
    fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError>;
}

/// Exact nearest-neighbor index that scans every stored vector.
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    metric: Metric,
    dimension: usize,
    ids: Vec<CustomerId>,
    values: Vec<f32>,
}

impl BruteForceIndex {
    pub fn new(
        metric: Metric,
        dimension: usize,
        points: Vec<(CustomerId, Vec<f32>)>,
    ) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let mut seen = BTreeSet::new();
        let mut ids = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len().saturating_mul(dimension));
        for (position, (id, point)) in points.into_iter().enumerate() {
            if id.is_empty() {
                return Err(IndexError::EmptyId { position });
            }
            if !seen.insert(id.clone()) {
                return Err(IndexError::DuplicateId(id));
            }
            if point.len() != dimension {
                return Err(IndexError::InvalidDimension {
                    id,
                    expected: dimension,
                    got: point.len(),
                });
            }
            if let Some((index, _)) = first_non_finite(&point) {
                return Err(IndexError::NonFiniteValue { id, index });
            }
            values.extend_from_slice(&point);
            ids.push(id);
        }

        Ok(Self {
            metric,
            dimension,
            ids,
            values,
        })
    }

    /// Indexes every row of `matrix` in matrix row order.
    pub fn from_matrix(matrix: &InteractionMatrix, metric: Metric) -> Self {
        let mut values = Vec::with_capacity(matrix.len().saturating_mul(matrix.dimension()));
        for (_, row) in matrix.iter_rows() {
            values.extend_from_slice(row);
        }

        Self {
            metric,
            dimension: matrix.dimension(),
            ids: matrix.customer_ids().to_vec(),
            values,
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[CustomerId] {
        &self.ids
    }

    pub fn iter_points(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.ids
            .iter()
            .zip(self.values.chunks_exact(self.dimension))
            .map(|(id, values)| (id.as_str(), values))
    }

    // Euclidean ranks on the squared distance and takes the root on output.
    fn rank_score(&self, query: &[f32], values: &[f32]) -> f32 {
        match self.metric {
            Metric::Euclidean => l2_squared_unchecked(query, values),
            Metric::Manhattan => l1_distance_unchecked(query, values),
        }
    }

    fn distance_from_rank_score(&self, score: f32) -> f32 {
        match self.metric {
            Metric::Euclidean => score.sqrt(),
            Metric::Manhattan => score,
        }
    }
}

impl NeighborIndex for BruteForceIndex {
    fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if let Some((index, _)) = first_non_finite(query) {
            return Err(IndexError::NonFiniteQuery { index });
        }

        let keep = k.min(self.len());
        if keep == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .values
            .chunks_exact(self.dimension)
            .map(|values| self.rank_score(query, values))
            .enumerate()
            .collect();

        if scored.len() > keep {
            scored.select_nth_unstable_by(keep - 1, compare_scored);
            scored.truncate(keep);
        }
        scored.sort_by(compare_scored);

        Ok(scored
            .into_iter()
            .map(|(position, score)| Neighbor {
                id: self.ids[position].clone(),
                distance: self.distance_from_rank_score(score),
            })
            .collect())
    }
}

fn compare_scored(left: &(usize, f32), right: &(usize, f32)) -> Ordering {
    left.1
        .total_cmp(&right.1)
        .then_with(|| left.0.cmp(&right.0))
}

#[cfg(test)]
mod tests;
