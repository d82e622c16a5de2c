//! Thin HTTP surface translating engine results into status codes.

mod errors;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

pub use errors::ApiError;

use crate::engine::TransferEngine;
use crate::lock::LockService;
use crate::search::WalletSearch;
use crate::store::DocumentStore;
use crate::wallets::WalletStore;

pub struct AppState<S, L> {
    pub wallets: Arc<WalletStore<S>>,
    pub engine: Arc<TransferEngine<S, L>>,
    pub search: Arc<WalletSearch<S>>
}

impl<S, L> Clone for AppState<S, L> {
    fn clone(&self) -> Self {
        Self {
            wallets: self.wallets.clone(),
            engine: self.engine.clone(),
            search: self.search.clone()
        }
    }
}

pub fn router<S: DocumentStore, L: LockService>(state: AppState<S, L>) -> Router {
    Router::new()
        .route("/wallets", post(handlers::create_wallet::<S, L>).get(handlers::search_wallets::<S, L>))
        .route("/wallets/:wallet_id", get(handlers::get_wallet::<S, L>))
        .route("/transactions", post(handlers::create_transaction::<S, L>))
        .with_state(state)
}
