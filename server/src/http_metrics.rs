use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::IntGauge;

use crate::state::AppState;

/// Holds one unit of the in-flight gauge until dropped, including when the
/// request future is cancelled.
struct InFlightGuard(IntGauge);

impl InFlightGuard {
    fn enter(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

// Installed outside the timeout layer so timed-out requests are observed as 408s.
pub(crate) async fn track_http_metrics(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let in_flight = InFlightGuard::enter(&state.metrics.http_requests_in_flight);
    let started = Instant::now();

    let response = next.run(request).await;

    drop(in_flight);
    let status = response.status();
    let status_class = if status.is_success() {
        "2xx"
    } else if status.is_client_error() {
        "4xx"
    } else if status.is_server_error() {
        "5xx"
    } else {
        "other"
    };
    state
        .metrics
        .http_requests_total
        .with_label_values(&[status_class])
        .inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(started.elapsed().as_secs_f64());

    response
}
