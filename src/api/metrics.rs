use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static REGISTRATION_COUNT: AtomicU64 = AtomicU64::new(0);
static COMPENSATION_COUNT: AtomicU64 = AtomicU64::new(0);
static COMPENSATION_FAILURE_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_registration_count() {
    REGISTRATION_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_compensation_count() {
    COMPENSATION_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn increment_compensation_failure_count() {
    COMPENSATION_FAILURE_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_errors_total: u64,
    pub investor_registrations_total: u64,
    pub saga_compensations_total: u64,
    pub saga_compensation_failures_total: u64,
}

impl MetricsResponse {
    fn snapshot() -> Self {
        MetricsResponse {
            http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
            http_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
            investor_registrations_total: REGISTRATION_COUNT.load(Ordering::Relaxed),
            saga_compensations_total: COMPENSATION_COUNT.load(Ordering::Relaxed),
            saga_compensation_failures_total: COMPENSATION_FAILURE_COUNT.load(Ordering::Relaxed),
        }
    }

    fn to_prometheus(&self) -> String {
        let counters = [
            ("http_requests_total", "Total number of HTTP requests", self.http_requests_total),
            ("http_errors_total", "Total number of HTTP errors", self.http_errors_total),
            ("investor_registrations_total", "Completed investor registrations", self.investor_registrations_total),
            ("saga_compensations_total", "Compensating actions executed", self.saga_compensations_total),
            ("saga_compensation_failures_total", "Compensating actions that failed", self.saga_compensation_failures_total),
        ];

        counters
            .iter()
            .map(|(name, help, value)| {
                format!("# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Service metrics in Prometheus text format", body = String)
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(MetricsResponse::snapshot().to_prometheus())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_format() {
        increment_compensation_count();
        let text = MetricsResponse::snapshot().to_prometheus();
        assert!(text.contains("# TYPE saga_compensations_total counter"));
        assert!(text.contains("http_requests_total "));
        assert!(!text.contains("saga_compensations_total 0\n"));
    }
}
