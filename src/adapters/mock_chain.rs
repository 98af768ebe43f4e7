//! In-memory purchase manager contract.
//!
//! Mirrors the on-chain semantics closely enough to test the client
//! workflow: purchases store the two ciphertext handles as submitted,
//! claiming credits the caller only when the encrypted recipient matches
//! them, and a claimed purchase's remaining amount drops to zero so a
//! second claim adds nothing. Plaintext access control lives in the
//! shared `FheState`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::adapters::mock_fhe::FheState;
use crate::domain::decryption::normalize_recipient;
use crate::ports::chain::{ChainError, PurchaseChain, PurchaseEntry, TxReceipt};

#[derive(Debug, Clone)]
struct StoredPurchase {
    buyer: Address,
    remaining_handle: B256,
    recipient_handle: B256,
}

#[derive(Debug, Default)]
struct ChainState {
    purchases: Vec<StoredPurchase>,
    balances: HashMap<Address, B256>,
    next_block: u64,
    next_tx: u64,
}

impl ChainState {
    fn receipt(&mut self) -> TxReceipt {
        self.next_block += 1;
        self.next_tx += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"mock-tx");
        hasher.update(self.next_tx.to_be_bytes());
        TxReceipt {
            tx_hash: B256::from_slice(&hasher.finalize()),
            block_number: self.next_block,
            success: true,
        }
    }
}

/// Mock `PurchaseChain` bound to one calling account.
///
/// `connect` derives further instances over the same contract state, so
/// tests can act as several accounts against one ledger.
pub struct MockPurchaseChain {
    caller: Address,
    chain: Arc<Mutex<ChainState>>,
    fhe: Arc<Mutex<FheState>>,
    purchase_calls: Arc<AtomicU64>,
    purchase_fetches: Arc<AtomicU64>,
}

impl MockPurchaseChain {
    pub fn new(caller: Address, fhe: Arc<Mutex<FheState>>) -> Self {
        Self {
            caller,
            chain: Arc::new(Mutex::new(ChainState::default())),
            fhe,
            purchase_calls: Arc::new(AtomicU64::new(0)),
            purchase_fetches: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Another account connected to the same contract state.
    pub fn connect(&self, caller: Address) -> Self {
        Self {
            caller,
            chain: Arc::clone(&self.chain),
            fhe: Arc::clone(&self.fhe),
            purchase_calls: Arc::clone(&self.purchase_calls),
            purchase_fetches: Arc::clone(&self.purchase_fetches),
        }
    }

    /// How many purchase transactions reached the contract.
    pub fn purchase_calls(&self) -> u64 {
        self.purchase_calls.load(Ordering::SeqCst)
    }

    /// How many individual purchase records were fetched.
    pub fn purchase_fetches(&self) -> u64 {
        self.purchase_fetches.load(Ordering::SeqCst)
    }
}

impl PurchaseChain for MockPurchaseChain {
    async fn purchase(
        &self,
        enc_amount: B256,
        _amount_proof: Bytes,
        enc_recipient: B256,
        _recipient_proof: Bytes,
    ) -> Result<TxReceipt, ChainError> {
        self.purchase_calls.fetch_add(1, Ordering::SeqCst);

        let mut fhe = self.fhe.lock().await;
        let recipient_word = fhe
            .plaintext(enc_recipient)
            .ok_or_else(|| ChainError::TransactionReverted("purchase reverted".into()))?;
        if fhe.plaintext(enc_amount).is_none() {
            return Err(ChainError::TransactionReverted("purchase reverted".into()));
        }

        // The contract grants read access to the buyer and the recipient
        // when it stores the purchase.
        fhe.allow(enc_amount, self.caller);
        fhe.allow(enc_recipient, self.caller);
        if let Some(recipient) = normalize_recipient(recipient_word) {
            fhe.allow(enc_amount, recipient);
            fhe.allow(enc_recipient, recipient);
        }
        drop(fhe);

        let mut chain = self.chain.lock().await;
        chain.purchases.push(StoredPurchase {
            buyer: self.caller,
            remaining_handle: enc_amount,
            recipient_handle: enc_recipient,
        });
        Ok(chain.receipt())
    }

    async fn claim(&self, ids: &[u64]) -> Result<TxReceipt, ChainError> {
        let mut chain = self.chain.lock().await;
        let mut fhe = self.fhe.lock().await;

        // Stage the batch first; a revert on any id must leave no
        // effects behind, matching an on-chain transaction.
        let mut staged_remaining: HashMap<usize, U256> = HashMap::new();
        let mut credit = U256::ZERO;
        let mut claimed: Vec<usize> = Vec::new();

        for &id in ids {
            let index = usize::try_from(id)
                .ok()
                .filter(|i| *i < chain.purchases.len())
                .ok_or_else(|| ChainError::TransactionReverted("claim reverted".into()))?;
            let entry = &chain.purchases[index];

            let remaining = staged_remaining
                .get(&index)
                .copied()
                .or_else(|| fhe.plaintext(entry.remaining_handle))
                .ok_or_else(|| ChainError::TransactionReverted("claim reverted".into()))?;
            let recipient_word = fhe
                .plaintext(entry.recipient_handle)
                .ok_or_else(|| ChainError::TransactionReverted("claim reverted".into()))?;

            let is_recipient = normalize_recipient(recipient_word) == Some(self.caller);
            if !is_recipient || remaining.is_zero() {
                continue;
            }

            credit += remaining;
            staged_remaining.insert(index, U256::ZERO);
            claimed.push(index);
        }

        if !credit.is_zero() {
            let previous = chain
                .balances
                .get(&self.caller)
                .and_then(|h| fhe.plaintext(*h))
                .unwrap_or(U256::ZERO);
            let balance_handle = fhe.new_handle(previous + credit, &[self.caller]);
            chain.balances.insert(self.caller, balance_handle);
        }
        for index in claimed {
            // Claimed: the remaining amount is re-encrypted as zero.
            let buyer = chain.purchases[index].buyer;
            let zero_handle = fhe.new_handle(U256::ZERO, &[buyer, self.caller]);
            chain.purchases[index].remaining_handle = zero_handle;
        }

        Ok(chain.receipt())
    }

    async fn get_purchase_count(&self) -> Result<u64, ChainError> {
        let chain = self.chain.lock().await;
        Ok(chain.purchases.len() as u64)
    }

    async fn get_purchase(&self, id: u64) -> Result<PurchaseEntry, ChainError> {
        self.purchase_fetches.fetch_add(1, Ordering::SeqCst);

        // Stagger responses so concurrent fetches complete out of order.
        tokio::time::sleep(Duration::from_millis(5 - id % 5)).await;

        let chain = self.chain.lock().await;
        let entry = chain
            .purchases
            .get(usize::try_from(id).map_err(|_| ChainError::UnknownPurchase(id))?)
            .ok_or(ChainError::UnknownPurchase(id))?;
        Ok(PurchaseEntry {
            buyer: entry.buyer,
            remaining_handle: entry.remaining_handle,
            recipient_handle: entry.recipient_handle,
        })
    }

    async fn get_encrypted_balance(&self, user: Address) -> Result<B256, ChainError> {
        let chain = self.chain.lock().await;
        Ok(chain.balances.get(&user).copied().unwrap_or(B256::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (MockPurchaseChain, Arc<Mutex<FheState>>) {
        let fhe = Arc::new(Mutex::new(FheState::default()));
        let chain = MockPurchaseChain::new(Address::repeat_byte(0x11), Arc::clone(&fhe));
        (chain, fhe)
    }

    async fn encrypt(fhe: &Arc<Mutex<FheState>>, amount: u64, recipient: Address) -> (B256, B256) {
        let mut state = fhe.lock().await;
        let a = state.new_handle(U256::from(amount), &[]);
        let r = state.new_handle(U256::from_be_bytes::<32>(recipient.into_word().0), &[]);
        (a, r)
    }

    #[tokio::test]
    async fn purchase_grows_the_count() {
        let (chain, fhe) = fresh();
        assert_eq!(chain.get_purchase_count().await.unwrap(), 0);

        let (a, r) = encrypt(&fhe, 3, Address::repeat_byte(0x22)).await;
        let receipt = chain.purchase(a, Bytes::new(), r, Bytes::new()).await.unwrap();
        assert!(receipt.success);
        assert_eq!(chain.get_purchase_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_purchase_id_is_an_error() {
        let (chain, _fhe) = fresh();
        let err = chain.get_purchase(0).await.unwrap_err();
        assert!(matches!(err, ChainError::UnknownPurchase(0)));
    }

    #[tokio::test]
    async fn balance_defaults_to_zero_handle() {
        let (chain, _fhe) = fresh();
        let handle = chain
            .get_encrypted_balance(Address::repeat_byte(0x99))
            .await
            .unwrap();
        assert_eq!(handle, B256::ZERO);
    }

    #[tokio::test]
    async fn reverted_claim_batch_leaves_no_credit() {
        let (buyer_chain, fhe) = fresh();
        let recipient = Address::repeat_byte(0x22);
        let recipient_chain = buyer_chain.connect(recipient);

        let (a, r) = encrypt(&fhe, 7, recipient).await;
        buyer_chain.purchase(a, Bytes::new(), r, Bytes::new()).await.unwrap();

        let err = recipient_chain.claim(&[0, 99]).await.unwrap_err();
        assert!(matches!(err, ChainError::TransactionReverted(_)));

        // The valid id's effects roll back with the revert.
        let handle = recipient_chain.get_encrypted_balance(recipient).await.unwrap();
        assert_eq!(handle, B256::ZERO);
        let entry = recipient_chain.get_purchase(0).await.unwrap();
        assert_eq!(fhe.lock().await.plaintext(entry.remaining_handle), Some(U256::from(7u64)));
    }

    #[tokio::test]
    async fn duplicate_ids_in_one_batch_credit_once() {
        let (buyer_chain, fhe) = fresh();
        let recipient = Address::repeat_byte(0x22);
        let recipient_chain = buyer_chain.connect(recipient);

        let (a, r) = encrypt(&fhe, 7, recipient).await;
        buyer_chain.purchase(a, Bytes::new(), r, Bytes::new()).await.unwrap();

        recipient_chain.claim(&[0, 0]).await.unwrap();
        let handle = recipient_chain.get_encrypted_balance(recipient).await.unwrap();
        assert_eq!(fhe.lock().await.plaintext(handle), Some(U256::from(7u64)));
    }

    #[tokio::test]
    async fn claim_credits_the_recipient_once() {
        let (buyer_chain, fhe) = fresh();
        let recipient = Address::repeat_byte(0x22);
        let recipient_chain = buyer_chain.connect(recipient);

        let (a, r) = encrypt(&fhe, 7, recipient).await;
        buyer_chain.purchase(a, Bytes::new(), r, Bytes::new()).await.unwrap();

        recipient_chain.claim(&[0]).await.unwrap();
        recipient_chain.claim(&[0]).await.unwrap();

        let handle = recipient_chain.get_encrypted_balance(recipient).await.unwrap();
        let balance = fhe.lock().await.plaintext(handle).unwrap();
        assert_eq!(balance, U256::from(7u64));
    }
}
