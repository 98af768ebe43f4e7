//! Signed, time-bounded decryption requests.
//!
//! Ciphertext handles are opaque on-chain references; turning one back
//! into plaintext requires an EIP-712 authorization signed by the
//! connected account, which the relayer checks against the handle's
//! access list. The keypair below is ephemeral per decrypt session and
//! never persisted.

use alloy::primitives::{Address, Bytes, Signature, B256, U256};
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use rand::RngCore;
use thiserror::Error;

/// Default validity window for a signed decryption request, in days.
pub const DEFAULT_DURATION_DAYS: u64 = 10;

const SECONDS_PER_DAY: u64 = 86_400;

sol! {
    /// Payload the relayer verifies before returning plaintext.
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationDays;
    }
}

/// Ephemeral keypair for one decrypt session.
///
/// The relayer encrypts returned plaintexts to `public_key`; the pair is
/// otherwise opaque to this client and is dropped when the session ends.
#[derive(Debug, Clone)]
pub struct DecryptionKeypair {
    pub public_key: Bytes,
    pub secret_key: Bytes,
}

impl DecryptionKeypair {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut public_key = [0u8; 32];
        let mut secret_key = [0u8; 32];
        rng.fill_bytes(&mut public_key);
        rng.fill_bytes(&mut secret_key);
        Self {
            public_key: Bytes::from(public_key.to_vec()),
            secret_key: Bytes::from(secret_key.to_vec()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("signing failed: {0}")]
    Signing(#[from] alloy::signers::Error),
}

/// A signed authorization for one user-decrypt exchange.
///
/// Valid from `start_timestamp` for `duration_days`; the relayer rejects
/// requests outside that window or whose signature does not recover to
/// `account`.
#[derive(Debug, Clone)]
pub struct DecryptionAuthorization {
    pub account: Address,
    pub public_key: Bytes,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u64,
    pub signature: Signature,
}

impl DecryptionAuthorization {
    /// Build an authorization starting now and sign it with `signer`.
    pub fn sign(
        signer: &PrivateKeySigner,
        keypair: &DecryptionKeypair,
        contract_addresses: Vec<Address>,
        chain_id: u64,
        duration_days: u64,
    ) -> Result<Self, AuthorizationError> {
        let start_timestamp = chrono::Utc::now().timestamp() as u64;
        let digest = signing_hash(
            &keypair.public_key,
            &contract_addresses,
            start_timestamp,
            duration_days,
            chain_id,
        );
        let signature = signer.sign_hash_sync(&digest)?;
        Ok(Self {
            account: signer.address(),
            public_key: keypair.public_key.clone(),
            contract_addresses,
            start_timestamp,
            duration_days,
            signature,
        })
    }

    /// The EIP-712 digest this authorization covers.
    pub fn digest(&self, chain_id: u64) -> B256 {
        signing_hash(
            &self.public_key,
            &self.contract_addresses,
            self.start_timestamp,
            self.duration_days,
            chain_id,
        )
    }

    /// Whether `now` (unix seconds) falls inside the validity window.
    pub fn is_valid_at(&self, now: u64) -> bool {
        now >= self.start_timestamp
            && now < self.start_timestamp + self.duration_days * SECONDS_PER_DAY
    }
}

fn signing_hash(
    public_key: &Bytes,
    contract_addresses: &[Address],
    start_timestamp: u64,
    duration_days: u64,
    chain_id: u64,
) -> B256 {
    let payload = UserDecryptRequestVerification {
        publicKey: public_key.clone(),
        contractAddresses: contract_addresses.to_vec(),
        startTimestamp: U256::from(start_timestamp),
        durationDays: U256::from(duration_days),
    };
    let domain = Eip712Domain {
        name: Some("Decryption".into()),
        version: Some("1".into()),
        chain_id: Some(U256::from(chain_id)),
        verifying_contract: None,
        salt: None,
    };
    payload.eip712_signing_hash(&domain)
}

/// Normalize a decrypted amount to a decimal string.
pub fn normalize_amount(value: U256) -> String {
    value.to_string()
}

/// Normalize an address-shaped plaintext to a 20-byte address.
///
/// Values wider than 160 bits are not valid addresses and are rejected
/// rather than truncated.
pub fn normalize_recipient(value: U256) -> Option<Address> {
    let word = B256::from(value.to_be_bytes::<32>());
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_word(word))
}
