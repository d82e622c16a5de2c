use super::{Transaction, TransferError, TransferRequest, Wallet, WalletMetadata};

use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde_json::json;

use crate::types::Monetary;

fn create_request(amount: &str) -> Result<TransferRequest> {
    Ok(TransferRequest {
        source_wallet: "vault".to_string(),
        destination_wallet: "alice".to_string(),
        amount: Monetary::from_str(amount)?,
        description: "rent".to_string()
    })
}

#[test]
fn test_transfer_request_accepts_numeric_amounts() -> Result<()> {
    let request: TransferRequest = serde_json::from_value(json!({
        "source_wallet": "vault",
        "destination_wallet": "alice",
        "amount": 100,
        "transaction_description": "rent"
    }))?;

    assert_eq!(request, create_request("100")?);

    Ok(())
}

#[test]
fn test_transfer_request_description_is_optional() -> Result<()> {
    let request: TransferRequest = serde_json::from_value(json!({
        "source_wallet": "vault",
        "destination_wallet": "alice",
        "amount": "1.5"
    }))?;

    assert!(request.description.is_empty());
    assert_eq!(request.amount.to_string(), "1.5000");

    Ok(())
}

#[test]
fn test_debit_entry_mirrors_the_transaction_with_negated_amount() -> Result<()> {
    let transaction = Transaction::from_request(&create_request("100")?, "tx-1".to_string(), Utc::now());
    let debit = transaction.debit_entry().ok_or_else(|| anyhow!("debit could not be built"))?;

    assert_eq!(debit.transaction_id, transaction.transaction_id);
    assert_eq!(debit.amount.to_string(), "-100.0000");
    assert_eq!(debit.source_wallet, transaction.source_wallet);
    assert_eq!(debit.destination_wallet, transaction.destination_wallet);
    assert_eq!(debit.date, transaction.date);

    Ok(())
}

#[test]
fn test_wallet_serializes_with_store_field_names() -> Result<()> {
    let metadata = WalletMetadata { owner: "Ada".to_string(), tags: vec!["savings".to_string()] };
    let wallet = Wallet::new("alice", Monetary::from_str("12.5")?, metadata);
    let value = serde_json::to_value(&wallet)?;

    assert_eq!(value, json!({
        "wallet_id": "alice",
        "transactions": [],
        "balance": "12.5000",
        "owner": "Ada",
        "tags": ["savings"]
    }));
    assert_eq!(wallet.key(), "wallet:alice");

    Ok(())
}

#[test]
fn test_wallet_deserializes_with_missing_optional_fields() -> Result<()> {
    let wallet: Wallet = serde_json::from_value(json!({ "wallet_id": "bob" }))?;

    assert_eq!(wallet, Wallet::new("bob", Monetary::zero(), WalletMetadata::default()));

    Ok(())
}

#[test]
fn test_recorded_total_sums_mirrored_entries() -> Result<()> {
    let credit = Transaction::from_request(&create_request("30")?, "tx-1".to_string(), Utc::now());
    let debit = Transaction::from_request(&create_request("12.25")?, "tx-2".to_string(), Utc::now())
        .debit_entry()
        .ok_or_else(|| anyhow!("debit could not be built"))?;

    let mut wallet = Wallet::new("alice", Monetary::zero(), WalletMetadata::default());
    wallet.transactions = vec![credit, debit];

    assert_eq!(wallet.recorded_total(), Some(Monetary::from_str("17.75")?));

    Ok(())
}

#[test]
fn test_transfer_errors_carry_request_context() -> Result<()> {
    let request = create_request("100")?;
    let error = TransferError::insufficient_balance(&request, Monetary::from_str("40")?);

    assert_eq!(error.to_string(), "Not enough balance in wallet [vault], required 100.0000 but has 40.0000");
    assert!(matches!(
        TransferError::wallet_not_found(&request, "alice"),
        TransferError::WalletNotFound { wallet_id, .. } if wallet_id == "alice"
    ));

    Ok(())
}
