mod errors;
#[cfg(test)]
mod tests;
mod transaction;
mod wallet;

pub use errors::{TransferError, WalletError};
pub use transaction::{Transaction, TransferRequest};
pub use wallet::{Wallet, WalletMetadata, BALANCE_PATH, TRANSACTIONS_PATH, WALLET_KEY_PREFIX};
