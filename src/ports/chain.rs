use std::future::Future;

use alloy::primitives::{Address, Bytes, B256};
use thiserror::Error;

/// Transaction receipt information surfaced to the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: B256,
    /// Block number
    pub block_number: u64,
    /// Whether the transaction succeeded
    pub success: bool,
}

/// A raw `getPurchase` result, before client-side numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseEntry {
    pub buyer: Address,
    pub remaining_handle: B256,
    pub recipient_handle: B256,
}

/// Errors that can occur during on-chain interactions.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("contract error: {0}")]
    ContractError(String),

    #[error("signer error: {0}")]
    SignerError(String),

    #[error("purchase id out of range: {0}")]
    UnknownPurchase(u64),
}

/// Contract surface of the purchase manager.
///
/// Implementations:
/// - `EthereumRpc` (alloy, HTTP RPC)
/// - `MockPurchaseChain` for tests
pub trait PurchaseChain: Send + Sync {
    /// Submit an encrypted purchase. The encrypted amount and recipient
    /// are produced together and share one input proof.
    fn purchase(
        &self,
        enc_amount: B256,
        amount_proof: Bytes,
        enc_recipient: B256,
        recipient_proof: Bytes,
    ) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;

    /// Claim a set of purchase ids for the connected account. The
    /// contract decides homomorphically whether the caller is the
    /// recipient; nothing is revealed either way.
    fn claim(&self, ids: &[u64]) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;

    /// Number of purchases ever created. Monotonically growing.
    fn get_purchase_count(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Read the purchase record at `id`.
    fn get_purchase(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<PurchaseEntry, ChainError>> + Send;

    /// Handle of `user`'s encrypted balance; all-zero when none exists.
    fn get_encrypted_balance(
        &self,
        user: Address,
    ) -> impl Future<Output = Result<B256, ChainError>> + Send;
}
