use std::fmt;

use knnrec_core::Classification;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const LATENCY_BUCKETS: &[f64] = &[
    0.000_05, 0.000_1, 0.000_25, 0.000_5, 0.001, 0.002_5, 0.005, 0.01, 0.025, 0.05, 0.1,
];

#[derive(Debug)]
pub(crate) enum PrometheusRenderError {
    Encode(prometheus::Error),
}

impl fmt::Display for PrometheusRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(error) => write!(f, "failed to encode prometheus payload: {error}"),
        }
    }
}

impl std::error::Error for PrometheusRenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(error) => Some(error),
        }
    }
}

pub(crate) struct ServiceMetrics {
    registry: Registry,
    pub(crate) http_requests_total: IntCounterVec,
    pub(crate) http_requests_in_flight: IntGauge,
    pub(crate) http_request_duration_seconds: Histogram,
    recommendations_total: IntCounterVec,
    recommendations_empty_total: IntCounter,
    recommendation_errors_total: IntCounterVec,
    recommendation_duration_seconds: Histogram,
}

impl ServiceMetrics {
    pub(crate) fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "knnrec_http_requests_total",
                "Total number of processed HTTP requests by status class.",
            ),
            &["status_class"],
        )?;
        let http_requests_in_flight = IntGauge::new(
            "knnrec_http_requests_in_flight",
            "Number of HTTP requests currently being processed.",
        )?;
        let http_request_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "knnrec_http_request_duration_seconds",
                "HTTP request processing time in seconds.",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let recommendations_total = IntCounterVec::new(
            Opts::new(
                "knnrec_recommendations_total",
                "Recommendations served by customer classification.",
            ),
            &["classification"],
        )?;
        let recommendations_empty_total = IntCounter::new(
            "knnrec_recommendations_empty_total",
            "Recommendations that returned no products.",
        )?;
        let recommendation_errors_total = IntCounterVec::new(
            Opts::new(
                "knnrec_recommendation_errors_total",
                "Recommendation requests rejected or failed, by error code.",
            ),
            &["code"],
        )?;
        let recommendation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "knnrec_recommendation_duration_seconds",
                "Time spent ranking products for one customer, in seconds.",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(recommendations_total.clone()))?;
        registry.register(Box::new(recommendations_empty_total.clone()))?;
        registry.register(Box::new(recommendation_errors_total.clone()))?;
        registry.register(Box::new(recommendation_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_requests_in_flight,
            http_request_duration_seconds,
            recommendations_total,
            recommendations_empty_total,
            recommendation_errors_total,
            recommendation_duration_seconds,
        })
    }

    pub(crate) fn record_recommendation(
        &self,
        classification: Classification,
        item_count: usize,
        elapsed_seconds: f64,
    ) {
        self.recommendations_total
            .with_label_values(&[classification.as_str()])
            .inc();
        if item_count == 0 {
            self.recommendations_empty_total.inc();
        }
        self.recommendation_duration_seconds.observe(elapsed_seconds);
    }

    pub(crate) fn record_error(&self, code: &str) {
        self.recommendation_errors_total
            .with_label_values(&[code])
            .inc();
    }

    pub(crate) fn render(&self) -> Result<Vec<u8>, PrometheusRenderError> {
        let families = self.registry.gather();
        let mut encoded = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut encoded)
            .map_err(PrometheusRenderError::Encode)?;
        Ok(encoded)
    }
}
