use thiserror::Error;

use crate::lock::LockError;
use crate::models::TransferRequest;
use crate::store::StoreError;
use crate::types::{Monetary, WalletId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    #[error("Wallet id must not be empty")]
    InvalidWalletId,
    #[error("Wallet [{wallet_id}] already exists")]
    WalletExists {
        wallet_id: WalletId
    },
    #[error("Wallet [{wallet_id}] was not found")]
    WalletNotFound {
        wallet_id: WalletId
    },
    #[error(transparent)]
    Store(#[from] StoreError)
}

impl WalletError {
    pub fn exists(wallet_id: &str) -> Self {
        Self::WalletExists { wallet_id: wallet_id.to_string() }
    }

    pub fn not_found(wallet_id: &str) -> Self {
        Self::WalletNotFound { wallet_id: wallet_id.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    #[error("Amount [{amount}] must be positive for transfer [{source_wallet}] -> [{destination_wallet}]")]
    InvalidAmount {
        source_wallet: WalletId,
        destination_wallet: WalletId,
        amount: Monetary
    },
    #[error("Cannot transfer from wallet [{wallet_id}] to itself")]
    SameWallet {
        wallet_id: WalletId
    },
    #[error("Wallet [{wallet_id}] was not found for transfer [{source_wallet}] -> [{destination_wallet}]")]
    WalletNotFound {
        wallet_id: WalletId,
        source_wallet: WalletId,
        destination_wallet: WalletId
    },
    #[error("Not enough balance in wallet [{source_wallet}], required {requested} but has {available}")]
    InsufficientBalance {
        source_wallet: WalletId,
        available: Monetary,
        requested: Monetary
    },
    #[error("Could not coordinate transfer [{source_wallet}] -> [{destination_wallet}]: {reason}")]
    CoordinationFailure {
        source_wallet: WalletId,
        destination_wallet: WalletId,
        #[source]
        reason: LockError
    },
    #[error("Transfer [{source_wallet}] -> [{destination_wallet}] failed after {attempts} attempts: {last}")]
    TransferFailed {
        source_wallet: WalletId,
        destination_wallet: WalletId,
        attempts: u32,
        #[source]
        last: StoreError
    },
    #[error("Store unavailable during transfer [{source_wallet}] -> [{destination_wallet}]: {reason}")]
    StoreUnavailable {
        source_wallet: WalletId,
        destination_wallet: WalletId,
        #[source]
        reason: StoreError
    }
}

impl TransferError {
    pub fn invalid_amount(request: &TransferRequest) -> Self {
        Self::InvalidAmount {
            source_wallet: request.source_wallet.clone(),
            destination_wallet: request.destination_wallet.clone(),
            amount: request.amount
        }
    }

    pub fn same_wallet(request: &TransferRequest) -> Self {
        Self::SameWallet { wallet_id: request.source_wallet.clone() }
    }

    pub fn wallet_not_found(request: &TransferRequest, wallet_id: &str) -> Self {
        Self::WalletNotFound {
            wallet_id: wallet_id.to_string(),
            source_wallet: request.source_wallet.clone(),
            destination_wallet: request.destination_wallet.clone()
        }
    }

    pub fn insufficient_balance(request: &TransferRequest, available: Monetary) -> Self {
        Self::InsufficientBalance {
            source_wallet: request.source_wallet.clone(),
            available,
            requested: request.amount
        }
    }

    pub fn coordination_failure(request: &TransferRequest, reason: LockError) -> Self {
        Self::CoordinationFailure {
            source_wallet: request.source_wallet.clone(),
            destination_wallet: request.destination_wallet.clone(),
            reason
        }
    }

    pub fn transfer_failed(request: &TransferRequest, attempts: u32, last: StoreError) -> Self {
        Self::TransferFailed {
            source_wallet: request.source_wallet.clone(),
            destination_wallet: request.destination_wallet.clone(),
            attempts,
            last
        }
    }

    pub fn store_unavailable(request: &TransferRequest, reason: StoreError) -> Self {
        Self::StoreUnavailable {
            source_wallet: request.source_wallet.clone(),
            destination_wallet: request.destination_wallet.clone(),
            reason
        }
    }
}
