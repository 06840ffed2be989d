use knnrec_core::{Classification, Recommendation};

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::models::{RankedItem, RecommendationResponse};

const EXISTING_MESSAGE: &str = "Found your profile! Here are your personalized recommendations.";
const NEW_MESSAGE: &str = "New user detected! Showing popular products.";
const EXHAUSTED_MESSAGE: &str = "No new recommendations available. You've purchased everything!";

pub(crate) fn canonical_customer_id(customer_id: &str) -> Result<String, ApiError> {
    let trimmed = customer_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_argument("customer_id must not be empty"));
    }

    Ok(trimmed.to_string())
}

pub(crate) fn resolve_top_n(requested: Option<i64>, config: &AppConfig) -> Result<usize, ApiError> {
    let Some(requested) = requested else {
        return Ok(config.default_top_n);
    };
    if requested <= 0 {
        return Err(ApiError::invalid_argument("top_n must be > 0"));
    }

    let top_n = usize::try_from(requested).unwrap_or(usize::MAX);
    if top_n > config.max_top_n {
        return Err(ApiError::invalid_argument(format!(
            "top_n {top_n} exceeds configured maximum {}",
            config.max_top_n
        )));
    }
    Ok(top_n)
}

pub(crate) fn build_recommendation_response(
    customer_id: String,
    recommendation: Recommendation,
) -> RecommendationResponse {
    let message = match recommendation.classification {
        _ if recommendation.items.is_empty() => EXHAUSTED_MESSAGE,
        Classification::Existing => EXISTING_MESSAGE,
        Classification::New => NEW_MESSAGE,
    };

    RecommendationResponse {
        customer_id,
        classification: recommendation.classification,
        message,
        items: recommendation
            .items
            .into_iter()
            .enumerate()
            .map(|(index, product_id)| RankedItem {
                rank: index + 1,
                product_id,
            })
            .collect(),
    }
}
