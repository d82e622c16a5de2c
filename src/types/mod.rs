mod errors;
mod monetary;

pub use monetary::Monetary;

pub type WalletId = String;
pub type TransactionId = String;
