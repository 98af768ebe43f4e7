//! End-to-end tests of the purchase client against the in-memory
//! contract and co-processor mocks.

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use tokio::sync::Mutex;

use fhe_purchase_client::adapters::mock_chain::MockPurchaseChain;
use fhe_purchase_client::adapters::mock_fhe::{FheState, MockFheService};
use fhe_purchase_client::domain::purchase::{received_by, sent_by};
use fhe_purchase_client::domain::request::ValidationError;
use fhe_purchase_client::ports::chain::ChainError;
use fhe_purchase_client::ports::fhe::FheError;
use fhe_purchase_client::workflow::{PurchaseWorkflow, WorkflowError};

const CHAIN_ID: u64 = 31337;

fn contract() -> Address {
    Address::repeat_byte(0x5f)
}

/// One contract deployment shared by any number of connected accounts.
struct Harness {
    fhe_state: Arc<Mutex<FheState>>,
    base: MockPurchaseChain,
}

impl Harness {
    fn new() -> Self {
        let fhe_state = Arc::new(Mutex::new(FheState::default()));
        let base = MockPurchaseChain::new(Address::ZERO, Arc::clone(&fhe_state));
        Self { fhe_state, base }
    }

    fn workflow(
        &self,
        signer: &PrivateKeySigner,
    ) -> PurchaseWorkflow<MockPurchaseChain, MockFheService> {
        PurchaseWorkflow::new(
            self.base.connect(signer.address()),
            MockFheService::new(Arc::clone(&self.fhe_state), CHAIN_ID),
            signer.clone(),
            contract(),
            CHAIN_ID,
        )
    }
}

#[tokio::test]
async fn invalid_amounts_fail_before_any_transaction() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let workflow = harness.workflow(&buyer);
    let recipient = format!("{}", Address::repeat_byte(0x22));

    for amount in ["0", "-4", "3.5", "abc", "", "5000000000"] {
        let err = workflow.submit_purchase(amount, &recipient).await.unwrap_err();
        assert!(
            matches!(err, WorkflowError::Validation(ValidationError::InvalidAmount(_))),
            "amount {amount:?} should fail validation"
        );
    }

    assert_eq!(harness.base.purchase_calls(), 0);
}

#[tokio::test]
async fn malformed_recipients_fail_before_any_transaction() {
    let harness = Harness::new();
    let workflow = harness.workflow(&PrivateKeySigner::random());

    for recipient in [
        "",
        "0x1234",
        "1111111111111111111111111111111111111111",
        "0x11111111111111111111111111111111111111zz",
        "0x111111111111111111111111111111111111111",
    ] {
        let err = workflow.submit_purchase("5", recipient).await.unwrap_err();
        assert!(
            matches!(err, WorkflowError::Validation(ValidationError::InvalidRecipient(_))),
            "recipient {recipient:?} should fail validation"
        );
    }

    assert_eq!(harness.base.purchase_calls(), 0);
}

#[tokio::test]
async fn empty_contract_lists_without_fetching_records() {
    let harness = Harness::new();
    let workflow = harness.workflow(&PrivateKeySigner::random());

    let purchases = workflow.list_purchases().await.unwrap();
    assert!(purchases.is_empty());
    assert_eq!(harness.base.purchase_fetches(), 0);
}

#[tokio::test]
async fn submission_refreshes_the_listing() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let workflow = harness.workflow(&buyer);
    let recipient = Address::repeat_byte(0x22);

    let outcome = workflow
        .submit_purchase("7", &format!("{recipient}"))
        .await
        .unwrap();

    assert!(outcome.receipt.success);
    assert_eq!(outcome.purchases.len(), 1);
    assert_eq!(outcome.purchases[0].id, 0);
    assert_eq!(outcome.purchases[0].buyer, buyer.address());
    assert!(outcome.purchases[0].remaining_plain.is_none());
}

#[tokio::test]
async fn listing_is_ordered_by_purchase_id() {
    let harness = Harness::new();
    let recipient = format!("{}", Address::repeat_byte(0x22));

    // Six buyers so each record carries a distinguishable buyer field;
    // the mock staggers fetch latency, so completion order differs from
    // id order.
    let mut buyers = Vec::new();
    for _ in 0..6 {
        let signer = PrivateKeySigner::random();
        harness
            .workflow(&signer)
            .submit_purchase("1", &recipient)
            .await
            .unwrap();
        buyers.push(signer.address());
    }

    let purchases = harness
        .workflow(&PrivateKeySigner::random())
        .list_purchases()
        .await
        .unwrap();

    assert_eq!(purchases.len(), 6);
    for (i, purchase) in purchases.iter().enumerate() {
        assert_eq!(purchase.id, i as u64);
        assert_eq!(purchase.buyer, buyers[i]);
    }
}

#[tokio::test]
async fn buyer_and_recipient_can_decrypt_their_purchase() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let recipient_signer = PrivateKeySigner::random();
    let recipient = recipient_signer.address();

    let buyer_flow = harness.workflow(&buyer);
    buyer_flow
        .submit_purchase("42", &format!("{recipient}"))
        .await
        .unwrap();

    let purchases = buyer_flow.list_purchases().await.unwrap();
    let purchases = buyer_flow.decrypt_purchases(purchases).await.unwrap();

    assert_eq!(purchases[0].remaining_plain.as_deref(), Some("42"));
    assert_eq!(purchases[0].recipient_plain, Some(recipient));
    assert_eq!(sent_by(&purchases, buyer.address()).len(), 1);
    assert_eq!(received_by(&purchases, recipient).len(), 1);

    // The recipient sees the same plaintexts through their own session.
    let recipient_flow = harness.workflow(&recipient_signer);
    let theirs = recipient_flow.list_purchases().await.unwrap();
    let theirs = recipient_flow.decrypt_purchases(theirs).await.unwrap();
    assert_eq!(theirs[0].remaining_plain.as_deref(), Some("42"));
    assert_eq!(received_by(&theirs, recipient).len(), 1);
}

#[tokio::test]
async fn third_parties_cannot_decrypt_foreign_purchases() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let recipient = Address::repeat_byte(0x22);

    harness
        .workflow(&buyer)
        .submit_purchase("42", &format!("{recipient}"))
        .await
        .unwrap();

    let outsider = harness.workflow(&PrivateKeySigner::random());
    let purchases = outsider.list_purchases().await.unwrap();
    let purchases = outsider.decrypt_purchases(purchases).await.unwrap();

    assert!(purchases[0].remaining_plain.is_none());
    assert!(purchases[0].recipient_plain.is_none());
    assert!(received_by(&purchases, recipient).is_empty());
}

#[tokio::test]
async fn failed_decryption_leaves_prior_plaintext_intact() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let recipient = Address::repeat_byte(0x22);

    let flow = harness.workflow(&buyer);
    flow.submit_purchase("42", &format!("{recipient}"))
        .await
        .unwrap();

    let purchases = flow.list_purchases().await.unwrap();
    let decrypted = flow.decrypt_purchases(purchases).await.unwrap();
    assert_eq!(decrypted[0].remaining_plain.as_deref(), Some("42"));

    // A corrupted handle fails the whole exchange; the caller keeps the
    // previously decrypted view.
    let mut corrupted = decrypted.clone();
    corrupted[0].remaining_handle = alloy::primitives::B256::repeat_byte(0xde);
    let err = flow.decrypt_purchases(corrupted).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Fhe(FheError::UnknownHandle(_))));

    assert_eq!(decrypted[0].remaining_plain.as_deref(), Some("42"));
    assert_eq!(decrypted[0].recipient_plain, Some(recipient));
}

#[tokio::test]
async fn unclaimed_balance_decrypts_to_zero() {
    let harness = Harness::new();
    let workflow = harness.workflow(&PrivateKeySigner::random());

    let handle = workflow.encrypted_balance().await.unwrap();
    assert_eq!(handle, alloy::primitives::B256::ZERO);
    assert_eq!(workflow.decrypt_balance().await.unwrap(), "0");
}

#[tokio::test]
async fn claiming_credits_the_recipient_exactly_once() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let recipient = PrivateKeySigner::random();

    harness
        .workflow(&buyer)
        .submit_purchase("7", &format!("{}", recipient.address()))
        .await
        .unwrap();

    let recipient_flow = harness.workflow(&recipient);
    recipient_flow.claim(&[0]).await.unwrap();
    assert_eq!(recipient_flow.decrypt_balance().await.unwrap(), "7");

    // Claiming the same purchase again adds nothing.
    recipient_flow.claim(&[0]).await.unwrap();
    assert_eq!(recipient_flow.decrypt_balance().await.unwrap(), "7");
}

#[tokio::test]
async fn claims_by_non_recipients_credit_nothing() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let recipient = Address::repeat_byte(0x22);
    let mallory = PrivateKeySigner::random();

    harness
        .workflow(&buyer)
        .submit_purchase("7", &format!("{recipient}"))
        .await
        .unwrap();

    let mallory_flow = harness.workflow(&mallory);
    mallory_flow.claim(&[0]).await.unwrap();
    assert_eq!(mallory_flow.decrypt_balance().await.unwrap(), "0");
}

#[tokio::test]
async fn claiming_an_unknown_id_reverts() {
    let harness = Harness::new();
    let workflow = harness.workflow(&PrivateKeySigner::random());

    let err = workflow.claim(&[99]).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Chain(ChainError::TransactionReverted(_))
    ));
}

#[tokio::test]
async fn reverted_claim_batch_credits_nothing() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let recipient = PrivateKeySigner::random();

    harness
        .workflow(&buyer)
        .submit_purchase("7", &format!("{}", recipient.address()))
        .await
        .unwrap();

    // One bad id reverts the whole transaction; the valid id in the
    // same batch must not be credited.
    let recipient_flow = harness.workflow(&recipient);
    let err = recipient_flow.claim(&[0, 99]).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Chain(ChainError::TransactionReverted(_))
    ));
    assert_eq!(recipient_flow.decrypt_balance().await.unwrap(), "0");

    // The purchase is still claimable afterwards.
    recipient_flow.claim(&[0]).await.unwrap();
    assert_eq!(recipient_flow.decrypt_balance().await.unwrap(), "7");
}

#[tokio::test]
async fn claimed_amounts_accumulate_across_purchases() {
    let harness = Harness::new();
    let buyer = PrivateKeySigner::random();
    let recipient = PrivateKeySigner::random();
    let recipient_str = format!("{}", recipient.address());

    let buyer_flow = harness.workflow(&buyer);
    buyer_flow.submit_purchase("3", &recipient_str).await.unwrap();
    buyer_flow.submit_purchase("4", &recipient_str).await.unwrap();

    let recipient_flow = harness.workflow(&recipient);
    recipient_flow.claim(&[0, 1]).await.unwrap();
    assert_eq!(recipient_flow.decrypt_balance().await.unwrap(), "7");
}
