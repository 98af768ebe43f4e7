//! In-memory stand-in for the FHE co-processor.
//!
//! The real co-processor never exposes plaintext; the mock tracks it,
//! together with a per-handle access list, so tests can exercise the
//! client workflow end to end. `FheState` is shared with
//! `MockPurchaseChain`, which plays the contract's role of granting
//! read access when purchases are created and claimed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::domain::decryption::{DecryptionAuthorization, DecryptionKeypair};
use crate::ports::fhe::{EncryptedInput, FheError, FheService};

/// Plaintext store and per-handle access list.
#[derive(Debug, Default)]
pub struct FheState {
    plaintexts: HashMap<B256, U256>,
    acl: HashMap<B256, HashSet<Address>>,
    next_handle: u64,
}

impl FheState {
    /// Mint a fresh handle for `value`, readable by `allowed`.
    pub fn new_handle(&mut self, value: U256, allowed: &[Address]) -> B256 {
        self.next_handle += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"mock-fhe-handle");
        hasher.update(self.next_handle.to_be_bytes());
        let handle = B256::from_slice(&hasher.finalize());

        self.plaintexts.insert(handle, value);
        self.acl.insert(handle, allowed.iter().copied().collect());
        handle
    }

    pub fn plaintext(&self, handle: B256) -> Option<U256> {
        self.plaintexts.get(&handle).copied()
    }

    /// Grant `account` read access to `handle`.
    pub fn allow(&mut self, handle: B256, account: Address) {
        self.acl.entry(handle).or_default().insert(account);
    }

    fn is_allowed(&self, handle: B256, account: Address) -> bool {
        self.acl.get(&handle).is_some_and(|s| s.contains(&account))
    }
}

/// Mock `FheService`: derives deterministic handles and performs the
/// authorization checks the relayer performs.
pub struct MockFheService {
    state: Arc<Mutex<FheState>>,
    chain_id: u64,
}

impl MockFheService {
    pub fn new(state: Arc<Mutex<FheState>>, chain_id: u64) -> Self {
        Self { state, chain_id }
    }
}

impl FheService for MockFheService {
    async fn encrypt_purchase_input(
        &self,
        _contract: Address,
        _user: Address,
        amount: u32,
        recipient: Address,
    ) -> Result<EncryptedInput, FheError> {
        let mut state = self.state.lock().await;

        // Input handles start with an empty access list; the contract
        // grants access when the purchase is stored.
        let amount_handle = state.new_handle(U256::from(amount), &[]);
        let recipient_handle =
            state.new_handle(U256::from_be_bytes::<32>(recipient.into_word().0), &[]);

        Ok(EncryptedInput {
            handles: vec![amount_handle, recipient_handle],
            proof: Bytes::from(amount_handle.to_vec()),
        })
    }

    async fn user_decrypt(
        &self,
        handles: &[B256],
        keypair: &DecryptionKeypair,
        auth: &DecryptionAuthorization,
    ) -> Result<HashMap<B256, U256>, FheError> {
        // The signed authorization covers the session public key; a
        // request carrying a different keypair is not authorized.
        if keypair.public_key != auth.public_key {
            return Err(FheError::Unauthorized(
                "session key does not match authorization".into(),
            ));
        }

        let digest = auth.digest(self.chain_id);
        let signer = auth
            .signature
            .recover_address_from_prehash(&digest)
            .map_err(|e| FheError::Unauthorized(e.to_string()))?;
        if signer != auth.account {
            return Err(FheError::Unauthorized(
                "signature does not match account".into(),
            ));
        }

        let now = chrono::Utc::now().timestamp() as u64;
        if !auth.is_valid_at(now) {
            return Err(FheError::Expired);
        }

        let state = self.state.lock().await;
        let mut plaintexts = HashMap::new();
        for &handle in handles {
            match state.plaintext(handle) {
                None => return Err(FheError::UnknownHandle(handle)),
                Some(value) if state.is_allowed(handle, signer) => {
                    plaintexts.insert(handle, value);
                }
                // Not permitted for this signer; omitted from the result.
                Some(_) => {}
            }
        }
        Ok(plaintexts)
    }
}
