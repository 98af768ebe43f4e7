//! Client for the FHEPurchaseManager contract.
//!
//! The contract stores purchases whose amount and recipient are FHE
//! ciphertexts; only ciphertext handles ever appear on-chain. This crate
//! owns the client side of that system: input validation, encrypted-input
//! construction, transaction submission, the purchase listing, and the
//! signed user-decrypt exchange that turns handles back into plaintext
//! for the account that owns them.
//!
//! Layout follows a ports-and-adapters split:
//! - [`domain`] — records, validation, and decryption authorization.
//! - [`ports`] — traits for the contract ([`ports::chain::PurchaseChain`])
//!   and the FHE co-processor ([`ports::fhe::FheService`]).
//! - [`adapters`] — alloy RPC and relayer HTTP implementations, plus
//!   in-memory mocks for tests.
//! - [`workflow`] — the sequencing controller tying the ports together.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod workflow;
