use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::EngineConfig;
use crate::lock::{DistributedMutex, LockService};
use crate::models::{Transaction, TransferError, TransferRequest, Wallet, WalletError, BALANCE_PATH, TRANSACTIONS_PATH};
use crate::store::{with_timeout, DocumentStore, Multi, StoreError};
use crate::wallets::WalletStore;

/// Outcome of a single commit attempt that did not commit.
enum AttemptError {
    /// A watched wallet changed underneath the attempt; worth retrying.
    Conflict(StoreError),
    /// The transfer cannot succeed as requested; retrying would not help.
    Rejected(TransferError)
}

impl AttemptError {
    fn store(request: &TransferRequest, error: StoreError) -> Self {
        match error {
            StoreError::Conflict { .. } => Self::Conflict(error),
            other => Self::Rejected(TransferError::store_unavailable(request, other))
        }
    }

    fn wallet(request: &TransferRequest, wallet_id: &str, error: WalletError) -> Self {
        match error {
            WalletError::Store(error) => Self::store(request, error),
            WalletError::WalletNotFound { .. } | WalletError::InvalidWalletId | WalletError::WalletExists { .. } => {
                Self::Rejected(TransferError::wallet_not_found(request, wallet_id))
            }
        }
    }
}

/// Applies double-entry transfers between wallets.
///
/// A transfer holds the [`DistributedMutex`] for its whole critical section and commits
/// through the store's watch/exec primitive. The exec rejects any attempt whose wallets
/// changed since the watch, whether or not the lease is still held at that point.
///
/// If the transfer future is dropped midway, the held locks are released in the background.
pub struct TransferEngine<S, L> {
    store: Arc<S>,
    wallets: Arc<WalletStore<S>>,
    mutex: DistributedMutex<L>,
    max_attempts: u32,
    timeout: Duration
}

impl<S: DocumentStore, L: LockService> TransferEngine<S, L> {
    pub fn new(store: Arc<S>, wallets: Arc<WalletStore<S>>, mutex: DistributedMutex<L>, config: EngineConfig) -> Self {
        Self {
            store,
            wallets,
            mutex,
            max_attempts: config.max_attempts.max(1),
            timeout: config.store_timeout
        }
    }

    /// Moves `request.amount` from the source wallet to the destination wallet.
    ///
    /// Returns the committed transaction with its generated id. Nothing is persisted
    /// unless this returns `Ok`.
    ///
    /// # Errors
    /// - `InvalidAmount` / `SameWallet` before any lock is taken.
    /// - `CoordinationFailure` if the mutex cannot be acquired.
    /// - `WalletNotFound` / `InsufficientBalance` from the balance check of any attempt.
    /// - `TransferFailed` once every attempt lost a race with a concurrent writer.
    /// - `StoreUnavailable` for any other store failure.
    pub async fn transfer(&self, request: TransferRequest) -> Result<Transaction, TransferError> {
        if !request.amount.is_positive() {
            return Err(TransferError::invalid_amount(&request));
        }

        if request.source_wallet == request.destination_wallet {
            return Err(TransferError::same_wallet(&request));
        }

        debug!("Acquiring transfer lock for [{}] -> [{}]", request.source_wallet, request.destination_wallet);

        let held = self.mutex.acquire(&request.source_wallet, &request.destination_wallet).await
            .map_err(|lock_error| {
                error!("Could not acquire transfer lock, aborting: {lock_error}");
                TransferError::coordination_failure(&request, lock_error)
            })?;

        let outcome = self.transfer_locked(&request).await;

        debug!("Releasing transfer lock for [{}] -> [{}]", request.source_wallet, request.destination_wallet);

        if let Err(lock_error) = self.mutex.release(held).await {
            warn!("Could not release transfer lock cleanly: {lock_error}");
        }

        outcome
    }

    async fn transfer_locked(&self, request: &TransferRequest) -> Result<Transaction, TransferError> {
        let mut prepared = None;
        let mut attempt = 1;

        loop {
            match self.attempt(request, &mut prepared).await {
                Ok(transaction) => {
                    info!(
                        "Committed transaction [{}]: {} from [{}] to [{}] on attempt {attempt}",
                        transaction.transaction_id, transaction.amount, transaction.source_wallet, transaction.destination_wallet
                    );
                    return Ok(transaction);
                }
                Err(AttemptError::Conflict(conflict)) if attempt < self.max_attempts => {
                    warn!("Transfer [{}] -> [{}] attempt {attempt}/{} conflicted: {conflict}", request.source_wallet, request.destination_wallet, self.max_attempts);
                    attempt += 1;
                }
                Err(AttemptError::Conflict(conflict)) => {
                    error!("Transfer [{}] -> [{}] failed after {attempt} attempts: {conflict}", request.source_wallet, request.destination_wallet);
                    return Err(TransferError::transfer_failed(request, attempt, conflict));
                }
                Err(AttemptError::Rejected(rejection)) => {
                    info!("Transfer [{}] -> [{}] rejected: {rejection}", request.source_wallet, request.destination_wallet);
                    return Err(rejection);
                }
            }
        }
    }

    /// One watch -> check -> exec cycle. The balance is read after the watch is in place,
    /// so any write that invalidates the check also aborts the exec.
    ///
    /// The transaction id and date are assigned once the first attempt has passed its
    /// checks, and are kept by later attempts.
    async fn attempt(&self, request: &TransferRequest, prepared: &mut Option<Transaction>) -> Result<Transaction, AttemptError> {
        let source_key = Wallet::store_key(&request.source_wallet);
        let destination_key = Wallet::store_key(&request.destination_wallet);
        let keys = [source_key.as_str(), destination_key.as_str()];

        let watch = with_timeout(self.timeout, self.store.watch(&keys)).await
            .map_err(|store_error| AttemptError::store(request, store_error))?;

        let available = self.wallets.balance(&request.source_wallet).await
            .map_err(|wallet_error| AttemptError::wallet(request, &request.source_wallet, wallet_error))?;

        if request.amount > available {
            return Err(AttemptError::Rejected(TransferError::insufficient_balance(request, available)));
        }

        let destination_exists = self.wallets.exists(&request.destination_wallet).await
            .map_err(|wallet_error| AttemptError::wallet(request, &request.destination_wallet, wallet_error))?;

        if !destination_exists {
            return Err(AttemptError::Rejected(TransferError::wallet_not_found(request, &request.destination_wallet)));
        }

        let transaction = prepared
            .get_or_insert_with(|| Transaction::from_request(request, Uuid::new_v4().to_string(), Utc::now()))
            .clone();

        debug!("Attempting transaction [{}]", transaction.transaction_id);

        let debit = transaction.debit_entry()
            .ok_or_else(|| AttemptError::Rejected(TransferError::invalid_amount(request)))?;
        let debit_value = serde_json::to_value(&debit)
            .map_err(|json_error| AttemptError::store(request, json_error.into()))?;
        let credit_value = serde_json::to_value(&transaction)
            .map_err(|json_error| AttemptError::store(request, json_error.into()))?;

        let mut multi = Multi::new();
        multi.append(&source_key, TRANSACTIONS_PATH, debit_value)
            .incr_by(&source_key, BALANCE_PATH, Decimal::from(debit.amount))
            .append(&destination_key, TRANSACTIONS_PATH, credit_value)
            .incr_by(&destination_key, BALANCE_PATH, Decimal::from(transaction.amount));

        with_timeout(self.timeout, self.store.exec(watch, multi)).await
            .map_err(|store_error| AttemptError::store(request, store_error))?;

        Ok(transaction)
    }
}
