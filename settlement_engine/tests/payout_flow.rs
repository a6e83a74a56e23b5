mod common;

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use common::{new_db, seed_seller, settle_single_item_order, test_config};
use lps_common::Reais;
use settlement_engine::{
    db_types::{LedgerEntryKind, LedgerEntryStatus, WithdrawalStatus},
    helpers::withdrawal_description,
    traits::{
        LedgerManagement,
        PayoutOutcome,
        PayoutProvider,
        PayoutProviderError,
        PayoutRequest,
        SettlementError,
        TransferDetails,
        TransferEvent,
        TransferEventType,
        WithdrawalResolution,
    },
    SqliteDatabase,
};

/// A payout provider that answers from a script of canned outcomes and records every request it saw.
#[derive(Clone, Default)]
struct ScriptedProvider {
    outcomes: Arc<Mutex<VecDeque<Result<PayoutOutcome, PayoutProviderError>>>>,
    requests: Arc<Mutex<Vec<PayoutRequest>>>,
}

impl ScriptedProvider {
    fn then(self, outcome: Result<PayoutOutcome, PayoutProviderError>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    fn requests(&self) -> Vec<PayoutRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PayoutProvider for ScriptedProvider {
    async fn send_payout(&self, request: &PayoutRequest) -> Result<PayoutOutcome, PayoutProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(PayoutOutcome::Succeeded { provider_id: Some("tr_default".to_string()) }))
    }
}

type Payouts = settlement_engine::api::PayoutApi<SqliteDatabase, ScriptedProvider>;

fn payout_api(db: &SqliteDatabase, provider: &ScriptedProvider) -> Payouts {
    Payouts::new(db.clone(), provider.clone(), test_config())
}

/// Seeds alice with R$80.00 available (one settled R$100.00 sale at the default commission).
async fn seeded_db() -> SqliteDatabase {
    let db = new_db().await;
    seed_seller(&db, "alice", Some("alice@pix")).await;
    settle_single_item_order(&db, "ord-1", "alice", Reais::from_cents(10_000), "pay-1").await;
    db
}

fn failure_event(withdrawal_id: &str, event: TransferEventType) -> TransferEvent {
    TransferEvent {
        event,
        transfer: TransferDetails {
            id: "tr_1".to_string(),
            description: Some(withdrawal_description(withdrawal_id)),
            fail_reason: Some("Destination account closed".to_string()),
        },
    }
}

#[tokio::test]
async fn successful_withdrawal_settles_immediately() {
    let db = seeded_db().await;
    let provider = ScriptedProvider::default().then(Ok(PayoutOutcome::Succeeded { provider_id: Some("tr_9".into()) }));
    let api = payout_api(&db, &provider);

    let request = api.request_withdrawal("alice", Reais::from_cents(5_000)).await.unwrap();
    assert_eq!(request.status, WithdrawalStatus::Processed);
    assert_eq!(request.note.as_deref(), Some("Transfer accepted by provider (tr_9)"));

    let balance = db.fetch_balance("alice").await.unwrap().unwrap();
    assert_eq!(balance.available, Reais::from_cents(3_000));
    assert_eq!(balance.blocked, Reais::zero());

    let ledger = db.fetch_ledger("alice").await.unwrap();
    let row = ledger.iter().find(|e| e.kind == LedgerEntryKind::Withdrawal).unwrap();
    assert_eq!(row.amount, -Reais::from_cents(5_000));
    assert_eq!(row.status, LedgerEntryStatus::Processed);
    assert_eq!(row.withdrawal_id.as_deref(), Some(request.id.as_str()));

    // The provider saw the withdrawal id in the transfer description.
    let sent = provider.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].description, withdrawal_description(&request.id));
    assert_eq!(sent[0].payout_key, "alice@pix");
}

#[tokio::test]
async fn withdrawals_below_the_minimum_are_refused() {
    let db = seeded_db().await;
    let provider = ScriptedProvider::default();
    let api = payout_api(&db, &provider);

    let err = api.request_withdrawal("alice", Reais::from_cents(1_999)).await.unwrap_err();
    let SettlementError::BelowMinimumWithdrawal { requested, minimum } = err else {
        panic!("expected a below-minimum refusal, got {err:?}");
    };
    assert_eq!(requested, Reais::from_cents(1_999));
    assert_eq!(minimum, Reais::from_cents(2_000));
    assert!(provider.requests().is_empty());
    assert_eq!(db.fetch_balance("alice").await.unwrap().unwrap().available, Reais::from_cents(8_000));
}

#[tokio::test]
async fn insufficient_funds_leave_no_trace() {
    let db = seeded_db().await;
    let provider = ScriptedProvider::default();
    let api = payout_api(&db, &provider);

    let err = api.request_withdrawal("alice", Reais::from_cents(8_001)).await.unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientFunds { available, .. } if available == Reais::from_cents(8_000)));
    assert!(provider.requests().is_empty());

    let balance = db.fetch_balance("alice").await.unwrap().unwrap();
    assert_eq!(balance.available, Reais::from_cents(8_000));
    assert_eq!(balance.blocked, Reais::zero());
    assert_eq!(db.pending_withdrawal_total("alice").await.unwrap(), Reais::zero());
}

#[tokio::test]
async fn missing_payout_destination_is_refused() {
    let db = new_db().await;
    seed_seller(&db, "bob", None).await;
    settle_single_item_order(&db, "ord-1", "bob", Reais::from_cents(10_000), "pay-1").await;
    let api = payout_api(&db, &ScriptedProvider::default());

    let err = api.request_withdrawal("bob", Reais::from_cents(2_000)).await.unwrap_err();
    assert!(matches!(err, SettlementError::PayoutKeyMissing(_)));
    let err = api.request_withdrawal("nobody", Reais::from_cents(2_000)).await.unwrap_err();
    assert!(matches!(err, SettlementError::SellerNotFound(_)));
}

#[tokio::test]
async fn rejected_payout_returns_the_funds() {
    let db = seeded_db().await;
    let provider =
        ScriptedProvider::default().then(Ok(PayoutOutcome::Rejected { reason: "Invalid payout key".to_string() }));
    let api = payout_api(&db, &provider);

    let request = api.request_withdrawal("alice", Reais::from_cents(5_000)).await.unwrap();
    assert_eq!(request.status, WithdrawalStatus::Failed);
    assert_eq!(request.note.as_deref(), Some("Invalid payout key"));

    let balance = db.fetch_balance("alice").await.unwrap().unwrap();
    assert_eq!(balance.available, Reais::from_cents(8_000));
    assert_eq!(balance.blocked, Reais::zero());

    let ledger = db.fetch_ledger("alice").await.unwrap();
    let row = ledger.iter().find(|e| e.kind == LedgerEntryKind::Withdrawal).unwrap();
    assert_eq!(row.status, LedgerEntryStatus::Failed);
}

#[tokio::test]
async fn manual_intervention_keeps_the_reservation() {
    let db = seeded_db().await;
    let provider = ScriptedProvider::default().then(Ok(PayoutOutcome::ManualInterventionRequired));
    let api = payout_api(&db, &provider);

    let request = api.request_withdrawal("alice", Reais::from_cents(5_000)).await.unwrap();
    assert_eq!(request.status, WithdrawalStatus::Pending);
    assert_eq!(request.note.as_deref(), Some("Manual intervention required at the payout provider"));

    let balance = db.fetch_balance("alice").await.unwrap().unwrap();
    assert_eq!(balance.available, Reais::from_cents(3_000));
    assert_eq!(balance.blocked, Reais::from_cents(5_000));
    assert_eq!(db.pending_withdrawal_total("alice").await.unwrap(), balance.blocked);
}

#[tokio::test]
async fn ambiguous_transport_error_keeps_the_reservation() {
    let db = seeded_db().await;
    let provider =
        ScriptedProvider::default().then(Err(PayoutProviderError::Transport("connection reset".to_string())));
    let api = payout_api(&db, &provider);

    let request = api.request_withdrawal("alice", Reais::from_cents(5_000)).await.unwrap();
    assert_eq!(request.status, WithdrawalStatus::Pending);

    let balance = db.fetch_balance("alice").await.unwrap().unwrap();
    assert_eq!(balance.available, Reais::from_cents(3_000));
    assert_eq!(balance.blocked, Reais::from_cents(5_000));
}

#[tokio::test]
async fn transfer_failure_event_reverts_once() {
    let db = seeded_db().await;
    let provider = ScriptedProvider::default().then(Err(PayoutProviderError::Transport("timeout".to_string())));
    let api = payout_api(&db, &provider);
    let request = api.request_withdrawal("alice", Reais::from_cents(5_000)).await.unwrap();
    assert_eq!(request.status, WithdrawalStatus::Pending);

    let event = failure_event(&request.id, TransferEventType::TransferFailed);
    let resolution = api.handle_transfer_event(&event).await.unwrap().unwrap();
    let reverted = match resolution {
        WithdrawalResolution::Resolved(r) => r,
        other => panic!("expected a fresh revert, got {other:?}"),
    };
    assert_eq!(reverted.status, WithdrawalStatus::Failed);
    assert_eq!(reverted.note.as_deref(), Some("Destination account closed"));

    let balance = db.fetch_balance("alice").await.unwrap().unwrap();
    assert_eq!(balance.available, Reais::from_cents(8_000));
    assert_eq!(balance.blocked, Reais::zero());

    // The provider retries its webhooks; the replay must not credit twice.
    let replay = api.handle_transfer_event(&event).await.unwrap().unwrap();
    assert!(matches!(replay, WithdrawalResolution::AlreadyResolved(_)));
    assert_eq!(db.fetch_balance("alice").await.unwrap().unwrap().available, Reais::from_cents(8_000));
}

#[tokio::test]
async fn informational_and_foreign_events_are_ignored() {
    let db = seeded_db().await;
    let api = payout_api(&db, &ScriptedProvider::default());

    let done = failure_event("wd_whatever", TransferEventType::TransferDone);
    assert!(api.handle_transfer_event(&done).await.unwrap().is_none());

    let foreign = TransferEvent {
        event: TransferEventType::TransferFailed,
        transfer: TransferDetails {
            id: "tr_2".to_string(),
            description: Some("Rent for March".to_string()),
            fail_reason: None,
        },
    };
    assert!(api.handle_transfer_event(&foreign).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_withdrawal_can_be_retried() {
    let db = seeded_db().await;
    let provider = ScriptedProvider::default()
        .then(Ok(PayoutOutcome::Rejected { reason: "Provider maintenance window".to_string() }))
        .then(Ok(PayoutOutcome::Succeeded { provider_id: Some("tr_retry".to_string()) }));
    let api = payout_api(&db, &provider);

    let request = api.request_withdrawal("alice", Reais::from_cents(5_000)).await.unwrap();
    assert_eq!(request.status, WithdrawalStatus::Failed);

    let retried = api.retry_withdrawal(&request.id).await.unwrap();
    assert_eq!(retried.id, request.id);
    assert_eq!(retried.status, WithdrawalStatus::Processed);

    let balance = db.fetch_balance("alice").await.unwrap().unwrap();
    assert_eq!(balance.available, Reais::from_cents(3_000));
    assert_eq!(balance.blocked, Reais::zero());

    // Only Failed withdrawals are retryable.
    let err = api.retry_withdrawal(&request.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::WithdrawalNotRetryable { .. }));
    let err = api.retry_withdrawal("wd_missing").await.unwrap_err();
    assert!(matches!(err, SettlementError::WithdrawalNotFound(_)));
}
