use knnrec_core::{Classification, ProductId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
pub(crate) struct RecommendQuery {
    #[serde(default)]
    pub(crate) top_n: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendRequest {
    pub(crate) customer_id: String,
    #[serde(default)]
    pub(crate) top_n: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRecommendRequest {
    pub(crate) customer_ids: Vec<String>,
    #[serde(default)]
    pub(crate) top_n: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RankedItem {
    pub(crate) rank: usize,
    pub(crate) product_id: ProductId,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecommendationResponse {
    pub(crate) customer_id: String,
    pub(crate) classification: Classification,
    pub(crate) message: &'static str,
    pub(crate) items: Vec<RankedItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchRecommendResponse {
    pub(crate) top_n: usize,
    pub(crate) results: Vec<RecommendationResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LiveResponse {
    pub(crate) status: &'static str,
    pub(crate) uptime_ms: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReadyResponse {
    pub(crate) status: &'static str,
    pub(crate) uptime_ms: u64,
    pub(crate) customers: usize,
    pub(crate) products: usize,
    pub(crate) indexed_customers: usize,
}
