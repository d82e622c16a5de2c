use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Monetary, TransactionId, WalletId};

/// A transfer as submitted by a client. The id and date are assigned at processing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_wallet: WalletId,
    pub destination_wallet: WalletId,
    pub amount: Monetary,
    #[serde(rename = "transaction_description", default)]
    pub description: String
}

/// A committed transfer.
///
/// The same record is appended to both wallets: unchanged at the destination, and with
/// its amount negated at the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub source_wallet: WalletId,
    pub destination_wallet: WalletId,
    pub amount: Monetary,
    #[serde(rename = "transaction_description", default)]
    pub description: String,
    pub date: DateTime<Utc>
}

impl Transaction {
    pub fn from_request(request: &TransferRequest, transaction_id: TransactionId, date: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            source_wallet: request.source_wallet.clone(),
            destination_wallet: request.destination_wallet.clone(),
            amount: request.amount,
            description: request.description.clone(),
            date
        }
    }

    /// Entry recorded at the source wallet, `None` if the amount cannot be negated.
    pub fn debit_entry(&self) -> Option<Transaction> {
        let amount = self.amount.checked_neg()?;

        Some(Transaction { amount, ..self.clone() })
    }
}
