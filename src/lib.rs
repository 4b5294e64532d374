//! Tamper-evident ownership history for physical devices.
//!
//! Every state change of a device (registration, sale, theft report) is
//! appended as a block to that device's chain, keyed by serial number and
//! linked to its predecessor by SHA-256 hash.

pub mod config;
pub mod crypto;
pub mod error;
pub mod model;
pub mod routes;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::crypto::DisplayKey;
use crate::error::ApiError;
use crate::storage::ChainStore;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<ChainStore>>,
    pub display_key: Arc<DisplayKey>,
}

impl AppState {
    pub fn new(ledger: ChainStore, display_key: DisplayKey) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            display_key: Arc::new(display_key),
        }
    }

    pub(crate) fn ledger(&self) -> Result<MutexGuard<'_, ChainStore>, ApiError> {
        self.ledger.lock().map_err(|_| ApiError::Internal)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/devices",
            post(routes::register_device).get(routes::list_devices),
        )
        .route("/devices/:serial", get(routes::device_history))
        .route("/devices/:serial/edit", post(routes::edit_device))
        .route("/devices/:serial/verify", get(routes::verify_device))
        .route("/genesis", get(routes::genesis))
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .with_state(state)
}
