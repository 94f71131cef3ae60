//! slm-scanner library interface
//!
//! Barcode scans in, shopping list entries out. A scan is decoded from a
//! keyboard-emulating reader, resolved to a product name (local cache, web
//! search plus language model, or a placeholder) and published to the shopping
//! list in category order. A small web UI lists scanned products and accepts
//! manual corrections.

pub mod api;
pub mod cache;
pub mod clients;
pub mod config;
pub mod decoder;
pub mod device;
pub mod error;
pub mod event_loop;
pub mod extraction;
pub mod resolver;
pub mod scan;
pub mod shopping_list;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use slm_common::CategoryOrdering;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::scan::ScanService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScanService>,
    pub categories: CategoryOrdering,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last scan failure, shared with the scan service
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(service: Arc<ScanService>) -> Self {
        Self {
            categories: *service.categories(),
            last_error: service.last_error(),
            service,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::ui_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
