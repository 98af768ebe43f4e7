//! HTTP client for the FHE relayer.
//!
//! The relayer builds encrypted inputs (ciphertext handles plus a
//! zero-knowledge input proof) and serves authenticated user-decrypt
//! requests. The co-processor's key material never reaches this client;
//! only handles and, after a verified authorization, plaintexts do.

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::domain::decryption::{DecryptionAuthorization, DecryptionKeypair};
use crate::ports::fhe::{EncryptedInput, FheError, FheService};

#[derive(Serialize)]
struct EncryptRequest {
    contract_address: Address,
    user_address: Address,
    amount: u32,
    recipient: Address,
}

#[derive(Deserialize)]
struct EncryptResponse {
    handles: Vec<B256>,
    proof: Bytes,
}

#[derive(Serialize)]
struct UserDecryptRequest<'a> {
    handles: &'a [B256],
    public_key: &'a Bytes,
    private_key: &'a Bytes,
    signature: String,
    contract_addresses: &'a [Address],
    user_address: Address,
    start_timestamp: u64,
    duration_days: u64,
}

#[derive(Deserialize)]
struct UserDecryptResponse {
    plaintexts: HashMap<B256, U256>,
}

/// `FheService` over the relayer's REST API.
pub struct RelayerClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

impl FheService for RelayerClient {
    async fn encrypt_purchase_input(
        &self,
        contract: Address,
        user: Address,
        amount: u32,
        recipient: Address,
    ) -> Result<EncryptedInput, FheError> {
        let response = self
            .client
            .post(self.endpoint("v1/input"))
            .json(&EncryptRequest {
                contract_address: contract,
                user_address: user,
                amount,
                recipient,
            })
            .send()
            .await
            .map_err(|e| FheError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FheError::EncryptionFailed(format!(
                "relayer returned {}",
                response.status()
            )));
        }

        let body: EncryptResponse = response
            .json()
            .await
            .map_err(|e| FheError::EncryptionFailed(e.to_string()))?;

        Ok(EncryptedInput {
            handles: body.handles,
            proof: body.proof,
        })
    }

    async fn user_decrypt(
        &self,
        handles: &[B256],
        keypair: &DecryptionKeypair,
        auth: &DecryptionAuthorization,
    ) -> Result<HashMap<B256, U256>, FheError> {
        // The relayer expects the signature without a 0x prefix.
        let signature = hex::encode(auth.signature.as_bytes());

        let response = self
            .client
            .post(self.endpoint("v1/user-decrypt"))
            .json(&UserDecryptRequest {
                handles,
                public_key: &keypair.public_key,
                private_key: &keypair.secret_key,
                signature,
                contract_addresses: &auth.contract_addresses,
                user_address: auth.account,
                start_timestamp: auth.start_timestamp,
                duration_days: auth.duration_days,
            })
            .send()
            .await
            .map_err(|e| FheError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FheError::Unauthorized(format!("relayer returned {status}")));
        }
        if !status.is_success() {
            return Err(FheError::DecryptionFailed(format!(
                "relayer returned {status}"
            )));
        }

        let body: UserDecryptResponse = response
            .json()
            .await
            .map_err(|e| FheError::DecryptionFailed(e.to_string()))?;

        Ok(body.plaintexts)
    }
}
