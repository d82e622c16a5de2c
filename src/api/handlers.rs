use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::api::{ApiError, AppState};
use crate::lock::LockService;
use crate::models::{Transaction, TransferRequest, Wallet, WalletMetadata};
use crate::search::{SearchField, WalletMatches};
use crate::store::DocumentStore;
use crate::types::{Monetary, WalletId};

/// Body of `POST /wallets`. Balance and history are never taken from the client.
#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    pub wallet_id: WalletId,
    #[serde(flatten)]
    pub metadata: WalletMetadata
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    #[serde(default)]
    pub field: SearchField
}

pub async fn create_wallet<S: DocumentStore, L: LockService>(
    State(state): State<AppState<S, L>>,
    Json(request): Json<CreateWalletRequest>
) -> Result<(StatusCode, Json<Wallet>), ApiError> {
    let wallet = state.wallets.create(&request.wallet_id, Monetary::zero(), request.metadata).await?;

    Ok((StatusCode::CREATED, Json(wallet)))
}

pub async fn get_wallet<S: DocumentStore, L: LockService>(
    State(state): State<AppState<S, L>>,
    Path(wallet_id): Path<WalletId>
) -> Result<Json<Wallet>, ApiError> {
    Ok(Json(state.wallets.get(&wallet_id).await?))
}

pub async fn create_transaction<S: DocumentStore, L: LockService>(
    State(state): State<AppState<S, L>>,
    Json(request): Json<TransferRequest>
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    info!("Received transfer of {} from [{}] to [{}]", request.amount, request.source_wallet, request.destination_wallet);

    let transaction = state.engine.transfer(request).await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn search_wallets<S: DocumentStore, L: LockService>(
    State(state): State<AppState<S, L>>,
    Query(params): Query<SearchParams>
) -> Result<(StatusCode, Json<WalletMatches>), ApiError> {
    let query = params.query.filter(|query| !query.trim().is_empty()).ok_or(ApiError::MissingQuery)?;
    let matches = state.search.search(params.field, &query).await?;

    if matches.total == 0 {
        return Err(ApiError::NoMatches(query));
    }

    Ok((StatusCode::FOUND, Json(matches)))
}
