use std::collections::HashMap;
use std::future::Future;

use alloy::primitives::{Address, Bytes, B256, U256};
use thiserror::Error;

use crate::domain::decryption::{DecryptionAuthorization, DecryptionKeypair};

/// Ciphertext handles plus the zero-knowledge input proof for one
/// transaction. Built per submission and consumed immediately.
#[derive(Debug, Clone)]
pub struct EncryptedInput {
    pub handles: Vec<B256>,
    pub proof: Bytes,
}

/// Errors from the FHE co-processor client.
#[derive(Debug, Error)]
pub enum FheError {
    #[error("encryption service unavailable: {0}")]
    Unavailable(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("authorization rejected: {0}")]
    Unauthorized(String),

    #[error("authorization window expired")]
    Expired,

    #[error("unknown ciphertext handle: {0}")]
    UnknownHandle(B256),
}

/// Client of the FHE co-processor / relayer.
///
/// Implementations:
/// - `RelayerClient` (HTTP)
/// - `MockFheService` for tests
pub trait FheService: Send + Sync {
    /// Encrypt a purchase amount and recipient for `contract`, bound to
    /// the submitting `user`. Returns the amount handle, the recipient
    /// handle, and the shared input proof, in that order.
    fn encrypt_purchase_input(
        &self,
        contract: Address,
        user: Address,
        amount: u32,
        recipient: Address,
    ) -> impl Future<Output = Result<EncryptedInput, FheError>> + Send;

    /// Exchange a signed authorization for plaintexts keyed by handle.
    /// `keypair` is the decrypt session's keypair: the authorization
    /// covers its public half, and the secret half decrypts the
    /// responses the service encrypts to it.
    ///
    /// Handles the signer is not permitted to read are omitted from the
    /// result rather than failing the whole exchange; an invalid or
    /// expired authorization fails it outright.
    fn user_decrypt(
        &self,
        handles: &[B256],
        keypair: &DecryptionKeypair,
        auth: &DecryptionAuthorization,
    ) -> impl Future<Output = Result<HashMap<B256, U256>, FheError>> + Send;
}
