//! Shared state handed to every axum handler.

use crate::application::KbCore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Cloneable handle axum threads through every request. Cloning only bumps an `Arc` refcount.
#[derive(Clone)]
pub struct AppState {
    /// The platform facade every handler calls into.
    pub core: Arc<KbCore>,
    /// Prometheus exposition handle, set when `metrics.enabled` is true (serves `GET /metrics`).
    pub metrics_handle: Option<PrometheusHandle>,
}
