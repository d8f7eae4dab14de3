//! Till movement rules: the solvency gate, forced-cash expenses, cash
//! entries, deletions, and payment reversals.

mod common;

use caja_core::error::CoreError;
use caja_core::{Money, OrderStatus, TenderType};
use caja_ledger::{LedgerError, NewCashEntry, NewExpense};
use chrono::{Duration, Utc};

use common::{ledger, open_default_session, settle_order};

#[tokio::test]
async fn solvency_gate_refuses_expense_beyond_available_cash() {
    // Float 500 000 + cash sale 120 000 = 620 000 available.
    let (db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;
    settle_order(&db, "o-1", Some(&session.id), TenderType::Cash, 120_000).await;

    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(620_000)
    );

    let err = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(700_000),
            tender: None,
            paid_from_till: true,
            category: "insumos".to_string(),
            description: None,
        })
        .await
        .unwrap_err();

    match err {
        LedgerError::Core(CoreError::InsufficientFunds {
            available,
            requested,
        }) => {
            assert_eq!(available, Money::from_minor(620_000));
            assert_eq!(requested, Money::from_minor(700_000));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    // Nothing persisted, nothing changed
    assert!(db.expenses().find_by_session(&session.id).await.unwrap().is_empty());
    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(620_000)
    );
}

#[tokio::test]
async fn till_funded_expense_is_forced_to_cash_tender() {
    let (_db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    // Caller claims "transferencia", but money left the drawer
    let expense = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(50_000),
            tender: Some("transferencia".to_string()),
            paid_from_till: true,
            category: "insumos".to_string(),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(expense.tender, TenderType::Cash);
    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(450_000)
    );
}

#[tokio::test]
async fn external_expense_keeps_legacy_tender_and_cash_untouched() {
    let (_db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    let expense = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(80_000),
            tender: Some("Transferencia".to_string()),
            paid_from_till: false,
            category: "servicios".to_string(),
            description: Some("electricity bill".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(expense.tender, TenderType::Transfer);
    // Not till-funded: the drawer never moved
    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(500_000)
    );
}

#[tokio::test]
async fn expense_rejects_non_positive_amount_and_blank_category() {
    let (_db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    let err = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::zero(),
            tender: None,
            paid_from_till: true,
            category: "insumos".to_string(),
            description: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::Validation(_))));

    let err = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(1_000),
            tender: None,
            paid_from_till: false,
            category: "  ".to_string(),
            description: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn deleting_a_till_expense_restores_available_cash() {
    let (_db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    let expense = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(50_000),
            tender: None,
            paid_from_till: true,
            category: "insumos".to_string(),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(450_000)
    );

    ledger.expenses().delete_expense(&expense.id).await.unwrap();

    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(500_000)
    );
}

#[tokio::test]
async fn expense_mutations_refuse_closed_sessions() {
    let (_db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    let expense = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(20_000),
            tender: None,
            paid_from_till: true,
            category: "insumos".to_string(),
            description: None,
        })
        .await
        .unwrap();

    ledger
        .reconciler()
        .close_session(&session.id, Money::from_minor(480_000), None)
        .await
        .unwrap();

    let err = ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(5_000),
            tender: None,
            paid_from_till: true,
            category: "insumos".to_string(),
            description: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::InvalidState { .. })
    ));

    let err = ledger
        .expenses()
        .delete_expense(&expense.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn cash_entries_raise_the_expectation() {
    let (_db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    let entry = ledger
        .expenses()
        .register_cash_entry(NewCashEntry {
            session_id: session.id.clone(),
            amount: Money::from_minor(30_000),
            description: Some("owner top-up".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(entry.tender, TenderType::Cash);
    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(530_000)
    );

    ledger
        .expenses()
        .delete_cash_entry(&entry.id)
        .await
        .unwrap();
    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(500_000)
    );
}

#[tokio::test]
async fn reversal_corrects_totals_with_no_compensating_entry() {
    // Float 500 000, cash sale 120 000, till expense 50 000:
    // expected 570 000. Reversing the sale drops it to 450 000.
    let (db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    let order = settle_order(&db, "o-1", Some(&session.id), TenderType::Cash, 120_000).await;
    ledger
        .expenses()
        .register_expense(NewExpense {
            session_id: session.id.clone(),
            amount: Money::from_minor(50_000),
            tender: None,
            paid_from_till: true,
            category: "insumos".to_string(),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(570_000)
    );

    let reversed = ledger
        .reversal()
        .reverse_order(&order.id, "super")
        .await
        .unwrap();
    assert_eq!(reversed.status, OrderStatus::Reversed);
    assert_eq!(reversed.reversed_by.as_deref(), Some("super"));
    // Amount retained for audit
    assert_eq!(reversed.settled_amount, Money::from_minor(120_000));

    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(450_000)
    );

    let sales = ledger.sales().sales_report(&session.id).await.unwrap();
    assert_eq!(sales.total, Money::zero());
    assert_eq!(sales.count, 0);
}

#[tokio::test]
async fn second_reversal_is_refused_without_side_effects() {
    let (db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;
    let order = settle_order(&db, "o-1", Some(&session.id), TenderType::Cash, 120_000).await;

    let first = ledger
        .reversal()
        .reverse_order(&order.id, "super")
        .await
        .unwrap();
    assert_eq!(first.status, OrderStatus::Reversed);

    let err = ledger
        .reversal()
        .reverse_order(&order.id, "someone-else")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::InvalidState { .. })
    ));

    // The refusal left nothing behind: record and totals are unchanged
    let stored = db.orders().get_by_id(&order.id).await.unwrap();
    assert_eq!(stored.reversed_by, first.reversed_by);
    assert_eq!(stored.reversed_at, first.reversed_at);
    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(500_000)
    );
}

#[tokio::test]
async fn reversal_refused_once_session_is_closed() {
    let (db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;
    let order = settle_order(&db, "o-1", Some(&session.id), TenderType::Cash, 120_000).await;

    ledger
        .reconciler()
        .close_session(&session.id, Money::from_minor(620_000), None)
        .await
        .unwrap();

    let err = ledger
        .reversal()
        .reverse_order(&order.id, "super")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::InvalidState { .. })
    ));

    // The frozen snapshot still counts the order
    let summary = ledger.summary().session_summary(&session.id).await.unwrap();
    assert_eq!(summary.expected_cash, Money::from_minor(620_000));
}

#[tokio::test]
async fn unassigned_orders_reverse_freely_and_show_in_anomaly_report() {
    let (db, ledger) = ledger().await;
    let session = open_default_session(&ledger).await;

    settle_order(&db, "o-assigned", Some(&session.id), TenderType::Cash, 10_000).await;
    let stray = settle_order(&db, "o-stray", None, TenderType::Cash, 25_000).await;

    let start = Utc::now() - Duration::hours(1);
    let end = Utc::now() + Duration::hours(1);

    let anomalies = ledger
        .summary()
        .unassigned_settled(start, end)
        .await
        .unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].id, "o-stray");

    // Counts toward no session
    assert_eq!(
        ledger.expenses().available_cash(&session.id).await.unwrap(),
        Money::from_minor(510_000)
    );

    // No owning session, so no OPEN requirement applies
    let reversed = ledger
        .reversal()
        .reverse_order(&stray.id, "super")
        .await
        .unwrap();
    assert_eq!(reversed.status, OrderStatus::Reversed);

    let anomalies = ledger
        .summary()
        .unassigned_settled(start, end)
        .await
        .unwrap();
    assert!(anomalies.is_empty());
}
