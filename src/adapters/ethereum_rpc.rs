use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, B256, U256},
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};

use crate::ports::chain::{ChainError, PurchaseChain, PurchaseEntry, TxReceipt};

// Generate contract bindings using Alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IFHEPurchaseManager {
        function purchase(
            bytes32 encAmount,
            bytes calldata amountProof,
            bytes32 encRecipient,
            bytes calldata recipientProof
        ) external returns (uint256 id);

        function claim(uint256[] calldata ids) external;

        function getPurchaseCount() external view returns (uint256);

        function getPurchase(uint256 id)
            external
            view
            returns (address buyer, bytes32 remaining, bytes32 recipient);

        function getEncryptedBalance(address user) external view returns (bytes32);
    }
}

/// Ethereum RPC adapter for the purchase manager contract.
pub struct EthereumRpc {
    provider: DynProvider,
    contract: Address,
    signer_address: Address,
}

impl EthereumRpc {
    /// Create a new EthereumRpc instance.
    ///
    /// # Arguments
    /// * `rpc_url` - The HTTP RPC endpoint URL
    /// * `private_key` - The private key for signing transactions
    /// * `contract` - The FHEPurchaseManager contract address
    pub async fn new(
        rpc_url: &str,
        private_key: &str,
        contract: Address,
    ) -> Result<Self, ChainError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ChainError::SignerError(format!("Invalid private key: {}", e)))?;

        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = DynProvider::new(
            ProviderBuilder::new().wallet(wallet).connect_http(
                rpc_url
                    .parse()
                    .map_err(|e| ChainError::Rpc(format!("Invalid RPC URL: {}", e)))?,
            ),
        );

        Ok(Self {
            provider,
            contract,
            signer_address,
        })
    }

    /// Get the signer's address.
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// Get the FHEPurchaseManager contract address.
    pub fn contract_address(&self) -> Address {
        self.contract
    }

    /// Helper to convert alloy transaction receipt to our TxReceipt type.
    fn convert_receipt(receipt: &alloy::rpc::types::TransactionReceipt) -> TxReceipt {
        TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or(0),
            success: receipt.status(),
        }
    }
}

/// A count wider than u64 cannot be iterated; treat it as a broken
/// contract response rather than saturating.
fn convert_count(count: U256) -> Result<u64, ChainError> {
    count
        .try_into()
        .map_err(|_| ChainError::ContractError(format!("purchase count {count} exceeds u64")))
}

impl PurchaseChain for EthereumRpc {
    async fn purchase(
        &self,
        enc_amount: B256,
        amount_proof: Bytes,
        enc_recipient: B256,
        recipient_proof: Bytes,
    ) -> Result<TxReceipt, ChainError> {
        let manager = IFHEPurchaseManager::new(self.contract, &self.provider);

        let receipt = manager
            .purchase(enc_amount, amount_proof, enc_recipient, recipient_proof)
            .send()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(ChainError::TransactionReverted("purchase reverted".into()));
        }

        Ok(Self::convert_receipt(&receipt))
    }

    async fn claim(&self, ids: &[u64]) -> Result<TxReceipt, ChainError> {
        let manager = IFHEPurchaseManager::new(self.contract, &self.provider);
        let ids: Vec<U256> = ids.iter().copied().map(U256::from).collect();

        let receipt = manager
            .claim(ids)
            .send()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(ChainError::TransactionReverted("claim reverted".into()));
        }

        Ok(Self::convert_receipt(&receipt))
    }

    async fn get_purchase_count(&self) -> Result<u64, ChainError> {
        let manager = IFHEPurchaseManager::new(self.contract, &self.provider);
        let result = manager
            .getPurchaseCount()
            .call()
            .await
            .map_err(|e| ChainError::ContractError(e.to_string()))?;
        convert_count(result)
    }

    async fn get_purchase(&self, id: u64) -> Result<PurchaseEntry, ChainError> {
        let manager = IFHEPurchaseManager::new(self.contract, &self.provider);
        let result = manager
            .getPurchase(U256::from(id))
            .call()
            .await
            .map_err(|e| ChainError::ContractError(e.to_string()))?;
        Ok(PurchaseEntry {
            buyer: result.buyer,
            remaining_handle: result.remaining,
            recipient_handle: result.recipient,
        })
    }

    async fn get_encrypted_balance(&self, user: Address) -> Result<B256, ChainError> {
        let manager = IFHEPurchaseManager::new(self.contract, &self.provider);
        let result = manager
            .getEncryptedBalance(user)
            .call()
            .await
            .map_err(|e| ChainError::ContractError(e.to_string()))?;
        Ok(result)
    }
}
