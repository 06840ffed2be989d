use std::error::Error;
use std::fmt;

use serde::Serialize;

use crate::matrix::{InteractionMatrix, ProductId};
use crate::neighbors::{IndexError, NeighborIndex};

pub const DEFAULT_TOP_N: usize = 5;

/// Which ranking produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The customer has a row in the interaction matrix; ranked by neighbor vote.
    Existing,
    /// Unknown customer; ranked by overall product popularity.
    New,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::New => "new",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    /// Product ids, best first.
    pub items: Vec<ProductId>,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendError {
    InvalidArgument(String),
    /// The index returned a customer that the interaction matrix does not know.
    InconsistentIndex(String),
    Index(IndexError),
}

impl fmt::Display for RecommendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InconsistentIndex(message) => write!(f, "inconsistent index: {message}"),
            Self::Index(error) => write!(f, "neighbor query failed: {error}"),
        }
    }
}

impl Error for RecommendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Index(error) => Some(error),
            Self::InvalidArgument(_) | Self::InconsistentIndex(_) => None,
        }
    }
}

impl From<IndexError> for RecommendError {
    fn from(value: IndexError) -> Self {
        Self::Index(value)
    }
}

/// Recommends up to `top_n` products for `customer_id`.
///
/// Known customers get the products their `top_n` nearest neighbors interacted
/// with, minus anything they already have; only products with a positive
/// neighbor vote are returned, so the list may be shorter than `top_n` or
/// empty. Unknown customers get the `top_n` most popular products. Equal
/// scores keep vocabulary column order.
pub fn recommend<I>(
    customer_id: &str,
    index: &I,
    matrix: &InteractionMatrix,
    top_n: usize,
) -> Result<Recommendation, RecommendError>
where
    I: NeighborIndex + ?Sized,
{
    if top_n == 0 {
        return Err(RecommendError::InvalidArgument(
            "top_n must be > 0".to_string(),
        ));
    }

    let Some(history) = matrix.row(customer_id) else {
        let scores = matrix.popularity().iter().copied().enumerate().collect();
        return Ok(Recommendation {
            items: top_products(matrix, scores, top_n),
            classification: Classification::New,
        });
    };

    let votes = neighbor_votes(customer_id, history, index, matrix, top_n)?;
    let scores = votes
        .into_iter()
        .enumerate()
        .filter(|(column, vote)| history[*column] <= 0.0 && *vote > 0.0)
        .collect();

    Ok(Recommendation {
        items: top_products(matrix, scores, top_n),
        classification: Classification::Existing,
    })
}

fn neighbor_votes<I>(
    customer_id: &str,
    history: &[f32],
    index: &I,
    matrix: &InteractionMatrix,
    top_n: usize,
) -> Result<Vec<f32>, RecommendError>
where
    I: NeighborIndex + ?Sized,
{
    // One extra slot for the customer's own vector, which the index returns too.
    let neighbors = index.nearest_neighbors(history, top_n.saturating_add(1))?;

    let mut votes = vec![0.0f32; matrix.dimension()];
    for neighbor in neighbors
        .iter()
        .filter(|neighbor| neighbor.id != customer_id)
        .take(top_n)
    {
        let row = matrix.row(&neighbor.id).ok_or_else(|| {
            RecommendError::InconsistentIndex(format!(
                "neighbor '{}' is not present in the interaction matrix",
                neighbor.id
            ))
        })?;
        for (vote, value) in votes.iter_mut().zip(row) {
            *vote += value;
        }
    }
    Ok(votes)
}

fn top_products(
    matrix: &InteractionMatrix,
    mut scores: Vec<(usize, f32)>,
    top_n: usize,
) -> Vec<ProductId> {
    // Stable: equal scores stay in column order.
    scores.sort_by(|left, right| right.1.total_cmp(&left.1));
    scores
        .into_iter()
        .take(top_n)
        .map(|(column, _)| matrix.products()[column].clone())
        .collect()
}
