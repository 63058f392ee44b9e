//! Scenario: In-memory ledger commit semantics
//!
//! # Invariants under test
//!
//! 1. A commit at the current revision applies only the named fields, bumps
//!    the revision, and appends the trade document with its side flag.
//!
//! 2. A commit at a stale revision returns `Conflict` and changes nothing.
//!
//! 3. An injected backend failure changes nothing (no half-written state).
//!
//! 4. Concurrent commits at the same revision: exactly one wins.

use std::sync::Arc;

use pt_db::{LedgerStore, MemoryStore, StoreError};
use pt_schemas::{Account, AccountUpdate, NewAccount, SellContext, TradeRecord};
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn store_with_alice() -> MemoryStore {
    let s = MemoryStore::new();
    s.create_account(NewAccount {
        account_id: "alice".to_string(),
        name: "Alice".to_string(),
        email: None,
        starting_balance: dec!(10000),
    })
    .await
    .unwrap();
    s
}

fn sell_record() -> TradeRecord {
    TradeRecord::sell(
        "AAPL",
        dec!(2),
        dec!(155),
        SellContext {
            requested_quantity: dec!(2),
            ..SellContext::default()
        },
    )
}

// ---------------------------------------------------------------------------
// 1: Field-level update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn balance_only_update_leaves_profit_and_loss() {
    let s = MemoryStore::new();
    s.seed_account(Account {
        account_id: "bob".to_string(),
        name: Some("Bob".to_string()),
        email: None,
        balance: Some(dec!(100)),
        profit: Some(dec!(12.5)),
        loss: None,
        revision: 3,
    })
    .await;

    let stored = s
        .commit_trade("bob", 3, &AccountUpdate::balance_only(dec!(410)), &sell_record())
        .await
        .unwrap();
    assert_eq!(stored.doc["sell"], serde_json::json!(true));
    assert_eq!(stored.doc["side"], serde_json::json!("sell"));

    let bob = s.read_account("bob").await.unwrap().unwrap();
    assert_eq!(bob.balance, Some(dec!(410)));
    assert_eq!(bob.profit, Some(dec!(12.5)));
    assert_eq!(bob.loss, None);
    assert_eq!(bob.revision, 4);
}

// ---------------------------------------------------------------------------
// 2 + 3: Failed commits change nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_revision_is_conflict() {
    let s = store_with_alice().await;
    let err = s
        .commit_trade("alice", 1, &AccountUpdate::balance_only(dec!(0)), &sell_record())
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Conflict { expected: 1, actual: 0 });

    let a = s.read_account("alice").await.unwrap().unwrap();
    assert_eq!(a.balance, Some(dec!(10000)));
    assert_eq!(s.trade_count("alice").await, 0);
}

#[tokio::test]
async fn injected_failure_is_all_or_nothing() {
    let s = store_with_alice().await;
    s.fail_next_commits(1);

    let err = s
        .commit_trade("alice", 0, &AccountUpdate::balance_only(dec!(0)), &sell_record())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));

    let a = s.read_account("alice").await.unwrap().unwrap();
    assert_eq!(a.balance, Some(dec!(10000)));
    assert_eq!(a.revision, 0);
    assert_eq!(s.trade_count("alice").await, 0);

    // Next commit goes through.
    s.commit_trade("alice", 0, &AccountUpdate::balance_only(dec!(1)), &sell_record())
        .await
        .unwrap();
    assert_eq!(s.trade_count("alice").await, 1);
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let s = MemoryStore::new();
    let err = s
        .commit_trade("ghost", 0, &AccountUpdate::default(), &sell_record())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::NotFound {
            account_id: "ghost".to_string()
        }
    );
}

// ---------------------------------------------------------------------------
// 4: One winner per revision
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commits_at_same_revision_have_one_winner() {
    let s = Arc::new(store_with_alice().await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let s = Arc::clone(&s);
        handles.push(tokio::spawn(async move {
            s.commit_trade(
                "alice",
                0,
                &AccountUpdate::balance_only(rust_decimal::Decimal::from(i)),
                &sell_record(),
            )
            .await
        }));
    }

    let mut wins = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => wins += 1,
            Err(StoreError::Conflict { expected: 0, actual: 1 }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(s.trade_count("alice").await, 1);
    assert_eq!(s.read_account("alice").await.unwrap().unwrap().revision, 1);
}
