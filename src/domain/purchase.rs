use alloy::primitives::{Address, B256};

/// A purchase record read from the contract.
///
/// The on-chain record holds only the buyer and two ciphertext handles.
/// `remaining_plain` and `recipient_plain` start empty and are attached
/// client-side once an authenticated user-decrypt has run; the list
/// itself is append-only on-chain and reloaded whole on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub id: u64,
    pub buyer: Address,
    pub remaining_handle: B256,
    pub recipient_handle: B256,
    /// Decrypted remaining amount, normalized to a decimal string.
    pub remaining_plain: Option<String>,
    /// Decrypted recipient, normalized to a 20-byte address.
    pub recipient_plain: Option<Address>,
}

impl Purchase {
    pub fn new(
        id: u64,
        buyer: Address,
        remaining_handle: B256,
        recipient_handle: B256,
    ) -> Self {
        Self {
            id,
            buyer,
            remaining_handle,
            recipient_handle,
            remaining_plain: None,
            recipient_plain: None,
        }
    }

    /// Both ciphertext handles of this record.
    pub fn handles(&self) -> [B256; 2] {
        [self.remaining_handle, self.recipient_handle]
    }

    /// Whether `account` submitted this purchase.
    pub fn is_sent_by(&self, account: Address) -> bool {
        self.buyer == account
    }

    /// Whether this purchase names `account` as recipient. Only knowable
    /// after the recipient handle has been decrypted.
    pub fn is_received_by(&self, account: Address) -> bool {
        self.recipient_plain == Some(account)
    }
}

/// Purchases submitted by `account`.
pub fn sent_by(purchases: &[Purchase], account: Address) -> Vec<&Purchase> {
    purchases.iter().filter(|p| p.is_sent_by(account)).collect()
}

/// Purchases whose decrypted recipient is `account`. Records whose
/// recipient handle is still encrypted are never included.
pub fn received_by(purchases: &[Purchase], account: Address) -> Vec<&Purchase> {
    purchases.iter().filter(|p| p.is_received_by(account)).collect()
}
