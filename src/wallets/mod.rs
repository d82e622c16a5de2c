mod wallet_store;

pub use wallet_store::WalletStore;
