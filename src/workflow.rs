//! Client-side orchestration of the purchase manager.
//!
//! Ties the chain and FHE ports together behind the operations the CLI
//! exposes: submit, claim, list, and the two decryption flows. All
//! validation happens here before anything leaves the process, and no
//! operation retries on failure.

use std::collections::{HashMap, HashSet};

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::decryption::{
    normalize_amount, normalize_recipient, AuthorizationError, DecryptionAuthorization,
    DecryptionKeypair,
};
use crate::domain::purchase::Purchase;
use crate::domain::request::{PurchaseRequest, ValidationError};
use crate::ports::chain::{ChainError, PurchaseChain, TxReceipt};
use crate::ports::fhe::{FheError, FheService};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Fhe(#[from] FheError),

    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("transaction {0} did not succeed")]
    TransactionFailed(B256),
}

/// Result of a successful submission: the purchase receipt plus the
/// refreshed listing.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub receipt: TxReceipt,
    pub purchases: Vec<Purchase>,
}

/// The purchase client proper, generic over its two ports.
pub struct PurchaseWorkflow<C, F> {
    chain: C,
    fhe: F,
    signer: PrivateKeySigner,
    contract: Address,
    chain_id: u64,
    decrypt_window_days: u64,
}

impl<C: PurchaseChain, F: FheService> PurchaseWorkflow<C, F> {
    pub fn new(chain: C, fhe: F, signer: PrivateKeySigner, contract: Address, chain_id: u64) -> Self {
        Self {
            chain,
            fhe,
            signer,
            contract,
            chain_id,
            decrypt_window_days: crate::domain::decryption::DEFAULT_DURATION_DAYS,
        }
    }

    /// Override the validity window of signed decryption requests.
    pub fn with_decrypt_window_days(mut self, days: u64) -> Self {
        self.decrypt_window_days = days;
        self
    }

    /// The connected account.
    pub fn account(&self) -> Address {
        self.signer.address()
    }

    /// Validate, encrypt, and submit one purchase, then refresh the
    /// listing. Invalid input fails before any encryption or network
    /// call; a non-success receipt is an error, not a result.
    pub async fn submit_purchase(
        &self,
        amount: &str,
        recipient: &str,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let request = PurchaseRequest::parse(amount, recipient)?;
        info!(amount = request.amount, recipient = %request.recipient, "submitting purchase");

        let input = self
            .fhe
            .encrypt_purchase_input(self.contract, self.account(), request.amount, request.recipient)
            .await?;
        let [enc_amount, enc_recipient] = input.handles[..] else {
            return Err(FheError::EncryptionFailed(format!(
                "expected 2 handles, got {}",
                input.handles.len()
            ))
            .into());
        };

        let receipt = self
            .chain
            .purchase(enc_amount, input.proof.clone(), enc_recipient, input.proof)
            .await?;
        if !receipt.success {
            return Err(WorkflowError::TransactionFailed(receipt.tx_hash));
        }
        info!(tx = %receipt.tx_hash, block = receipt.block_number, "purchase confirmed");

        let purchases = self.list_purchases().await?;
        Ok(SubmitOutcome { receipt, purchases })
    }

    /// Claim a set of purchase ids for the connected account.
    pub async fn claim(&self, ids: &[u64]) -> Result<TxReceipt, WorkflowError> {
        info!(?ids, "claiming purchases");
        let receipt = self.chain.claim(ids).await?;
        if !receipt.success {
            return Err(WorkflowError::TransactionFailed(receipt.tx_hash));
        }
        Ok(receipt)
    }

    /// Fetch every purchase, numbered by its on-chain id. Records are
    /// fetched concurrently and reassembled in id order; an empty
    /// contract short-circuits without any per-id read.
    pub async fn list_purchases(&self) -> Result<Vec<Purchase>, WorkflowError> {
        let count = self.chain.get_purchase_count().await?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let entries =
            try_join_all((0..count).map(|id| self.chain.get_purchase(id))).await?;
        debug!(count, "fetched purchase records");

        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(id, entry)| {
                Purchase::new(
                    id as u64,
                    entry.buyer,
                    entry.remaining_handle,
                    entry.recipient_handle,
                )
            })
            .collect())
    }

    /// Decrypt the handles of `purchases` the connected account may read
    /// and attach the plaintexts. Handles the account cannot read leave
    /// their purchase unchanged.
    pub async fn decrypt_purchases(
        &self,
        mut purchases: Vec<Purchase>,
    ) -> Result<Vec<Purchase>, WorkflowError> {
        let mut handles = Vec::new();
        let mut seen = HashSet::new();
        for purchase in &purchases {
            for handle in purchase.handles() {
                if seen.insert(handle) {
                    handles.push(handle);
                }
            }
        }
        if handles.is_empty() {
            return Ok(purchases);
        }

        let plaintexts = self.user_decrypt(&handles).await?;
        for purchase in &mut purchases {
            if let Some(value) = plaintexts.get(&purchase.remaining_handle) {
                purchase.remaining_plain = Some(normalize_amount(*value));
            }
            if let Some(value) = plaintexts.get(&purchase.recipient_handle) {
                purchase.recipient_plain = normalize_recipient(*value);
            }
        }
        Ok(purchases)
    }

    /// The connected account's encrypted balance handle.
    pub async fn encrypted_balance(&self) -> Result<B256, WorkflowError> {
        Ok(self.chain.get_encrypted_balance(self.account()).await?)
    }

    /// Decrypt the connected account's balance to a decimal string. An
    /// all-zero handle means no balance exists yet and decrypts to "0"
    /// without contacting the co-processor.
    pub async fn decrypt_balance(&self) -> Result<String, WorkflowError> {
        let handle = self.encrypted_balance().await?;
        if handle == B256::ZERO {
            return Ok("0".to_string());
        }

        let plaintexts = self.user_decrypt(&[handle]).await?;
        Ok(plaintexts
            .get(&handle)
            .map(|v| normalize_amount(*v))
            .unwrap_or_else(|| "0".to_string()))
    }

    async fn user_decrypt(
        &self,
        handles: &[B256],
    ) -> Result<HashMap<B256, U256>, WorkflowError> {
        let keypair = DecryptionKeypair::generate();
        let auth = DecryptionAuthorization::sign(
            &self.signer,
            &keypair,
            vec![self.contract],
            self.chain_id,
            self.decrypt_window_days,
        )?;
        debug!(handles = handles.len(), "requesting user decryption");
        Ok(self.fhe.user_decrypt(handles, &keypair, &auth).await?)
    }
}
