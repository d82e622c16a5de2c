use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::{TransferError, WalletError};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Search(#[from] StoreError),
    #[error("Missing query parameter [query]")]
    MissingQuery,
    #[error("No wallets match [{0}]")]
    NoMatches(String)
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::Unavailable(_) | StoreError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Wallet(WalletError::InvalidWalletId) => StatusCode::BAD_REQUEST,
            ApiError::Wallet(WalletError::WalletExists { .. }) => StatusCode::CONFLICT,
            ApiError::Wallet(WalletError::WalletNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Wallet(WalletError::Store(error)) => store_status(error),
            ApiError::Transfer(TransferError::InvalidAmount { .. })
            | ApiError::Transfer(TransferError::SameWallet { .. })
            | ApiError::Transfer(TransferError::InsufficientBalance { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Transfer(TransferError::WalletNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Transfer(TransferError::TransferFailed { .. }) => StatusCode::CONFLICT,
            ApiError::Transfer(TransferError::CoordinationFailure { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Transfer(TransferError::StoreUnavailable { reason, .. }) => store_status(reason),
            ApiError::Search(error) => store_status(error),
            ApiError::MissingQuery => StatusCode::BAD_REQUEST,
            ApiError::NoMatches(_) => StatusCode::NOT_FOUND
        }
    }

    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Wallet(WalletError::InvalidWalletId) => "invalid_wallet_id",
            ApiError::Wallet(WalletError::WalletExists { .. }) => "wallet_exists",
            ApiError::Wallet(WalletError::WalletNotFound { .. }) => "wallet_not_found",
            ApiError::Wallet(WalletError::Store(_)) => "store_unavailable",
            ApiError::Transfer(TransferError::InvalidAmount { .. }) => "invalid_amount",
            ApiError::Transfer(TransferError::SameWallet { .. }) => "same_wallet",
            ApiError::Transfer(TransferError::WalletNotFound { .. }) => "wallet_not_found",
            ApiError::Transfer(TransferError::InsufficientBalance { .. }) => "insufficient_balance",
            ApiError::Transfer(TransferError::CoordinationFailure { .. }) => "coordination_failure",
            ApiError::Transfer(TransferError::TransferFailed { .. }) => "transfer_failed",
            ApiError::Transfer(TransferError::StoreUnavailable { .. }) => "store_unavailable",
            ApiError::Search(_) => "search_failed",
            ApiError::MissingQuery => "missing_query",
            ApiError::NoMatches(_) => "no_matches"
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }

        let body = json!({ "error": self.kind(), "message": self.to_string() });

        (status, Json(body)).into_response()
    }
}
