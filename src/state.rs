//! # Application State Management
//!
//! State shared by every HTTP worker. Almost all of it is read-only after startup:
//! the configuration and the separation service (which owns the object store handle).
//! The only mutable part is the request metrics, written by the metrics middleware
//! on every request.
//!
//! ### Arc<RwLock<T>> Pattern
//! - **Arc**: Each actix worker holds a clone of `AppState`; they all point at the same data
//! - **RwLock**: The health endpoints read metrics while the middleware writes them
//!
//! Nothing here is needed by the separation itself: an upload never reads or writes
//! another upload's state.

use crate::config::AppConfig;
use crate::separation::SeparationService;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Configuration the server was started with
    pub config: Arc<AppConfig>,

    /// The separation pipeline and its object store
    pub service: Arc<SeparationService>,

    /// Request metrics (updated by the metrics middleware)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Request metrics collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Requests that ended in a 4xx or 5xx
    pub error_count: u64,

    /// Key: route pattern with method (e.g., "POST /api/v1/separate")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
///
/// ## Performance calculations:
/// - **Average response time**: total_duration_ms / request_count
/// - **Error rate**: error_count / request_count
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, service: SeparationService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.request_count += 1;
    }

    /// Record the outcome of one request against its endpoint.
    ///
    /// The first request to an endpoint creates its entry.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);

        if is_error {
            metrics.error_count += 1;
        }

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// Cloning releases the lock before the response is serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0 // No requests yet, so no average to calculate
        }
    }

    /// Error rate for this endpoint, from 0.0 (no errors) to 1.0 (every request failed).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
