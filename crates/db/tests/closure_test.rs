//! Two-phase closure tests against the ledger store.

mod common;

use rust_decimal_macros::dec;

use common::fixture;
use dealflow_core::reconcile::{ClosurePhase, Decision, LedgerError, LedgerEvent, ReviewSide, Track};
use dealflow_db::entities::sea_orm_active_enums::LedgerStatus;

#[tokio::test]
async fn test_payment_closure_scenario() {
    let f = fixture().await;
    let lead = f.open("Hotel refurbishment").await;
    let a = f.pay(lead.id, dec!(100000)).await;
    let b = f.pay(lead.id, dec!(50000)).await;
    f.approve_payment(a.id).await;

    let err = f
        .repo
        .request_closure(&f.sales, lead.id, Track::Payment, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::IncompleteApprovals { track: Track::Payment, outstanding: 1 }
    ));
    let unchanged = f.lead(lead.id).await;
    assert!(unchanged.payment_ledger_closed_by_sales_id.is_none());

    f.approve_payment(b.id).await;
    let requested = f
        .repo
        .request_closure(&f.sales, lead.id, Track::Payment, Some("  all received ".into()))
        .await
        .unwrap();
    assert_eq!(requested.payment_ledger_closed_by_sales_id, Some(f.sales.id));
    assert_eq!(requested.payment_ledger_closure_notes.as_deref(), Some("all received"));
    assert!(requested.payment_ledger_closed_at.is_none());

    let closed = f
        .repo
        .authorize_closure(&f.finance, lead.id, Track::Payment)
        .await
        .unwrap();
    assert_eq!(closed.payment_ledger_closed_by_finance_id, Some(f.finance.id));
    assert!(closed.payment_ledger_closed_at.is_some());
    assert_eq!(closed.ledger_status, LedgerStatus::Active);
    assert_eq!(closed.total_amount_to_credit, dec!(150000));
}

#[tokio::test]
async fn test_authorize_before_request_is_out_of_order() {
    let f = fixture().await;
    let lead = f.open("Gym equipment").await;

    let err = f
        .repo
        .authorize_closure(&f.finance, lead.id, Track::Document)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::OutOfOrder(Track::Document)));

    let lead = f.lead(lead.id).await;
    assert!(lead.document_ledger_closed_by_finance_id.is_none());
    assert!(lead.document_ledger_closed_at.is_none());
}

#[tokio::test]
async fn test_ledger_closes_when_both_tracks_close() {
    let f = fixture().await;
    let lead = f.open("Restaurant chain").await;
    let payment = f.pay(lead.id, dec!(900)).await;
    f.approve_payment(payment.id).await;
    let doc = f.document(lead.id).await;
    f.review(doc.id, ReviewSide::Sales, Decision::Approved, None)
        .await;
    f.review(doc.id, ReviewSide::Finance, Decision::Approved, None)
        .await;

    for track in [Track::Document, Track::Payment] {
        f.repo
            .request_closure(&f.sales, lead.id, track, None)
            .await
            .unwrap();
    }

    let after_document = f
        .repo
        .authorize_closure(&f.finance, lead.id, Track::Document)
        .await
        .unwrap();
    assert_eq!(after_document.ledger_status, LedgerStatus::Active);

    let after_payment = f
        .repo
        .authorize_closure(&f.finance, lead.id, Track::Payment)
        .await
        .unwrap();
    assert_eq!(after_payment.ledger_status, LedgerStatus::Closed);

    let view = f.repo.get_ledger(&f.sales, lead.id).await.unwrap();
    assert_eq!(view.summary.payment_closure, ClosurePhase::Closed);
    assert_eq!(view.summary.document_closure, ClosurePhase::Closed);

    let authorized: Vec<bool> = f
        .notifier
        .events()
        .into_iter()
        .filter_map(|e| match e {
            LedgerEvent::ClosureAuthorized { ledger_closed, .. } => Some(ledger_closed),
            _ => None,
        })
        .collect();
    assert_eq!(authorized, vec![false, true]);
}

#[tokio::test]
async fn test_document_guard_needs_both_flags() {
    let f = fixture().await;
    let lead = f.open("Museum audio guides").await;
    let doc = f.document(lead.id).await;

    // Only finance has approved so far.
    f.review(doc.id, ReviewSide::Finance, Decision::Approved, None)
        .await;
    let err = f
        .repo
        .request_closure(&f.sales, lead.id, Track::Document, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::IncompleteApprovals { track: Track::Document, outstanding: 1 }
    ));

    f.review(doc.id, ReviewSide::Sales, Decision::Approved, None)
        .await;
    f.repo
        .request_closure(&f.sales, lead.id, Track::Document, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_track_may_close() {
    let f = fixture().await;
    let lead = f.open("Consulting retainer").await;

    f.repo
        .request_closure(&f.sales, lead.id, Track::Document, None)
        .await
        .unwrap();
    let lead = f
        .repo
        .authorize_closure(&f.admin, lead.id, Track::Document)
        .await
        .unwrap();
    assert!(lead.document_ledger_closed_at.is_some());
}

#[tokio::test]
async fn test_regression_between_phases_blocks_authorization() {
    let f = fixture().await;
    let lead = f.open("Parking sensors").await;
    let entry = f.pay(lead.id, dec!(640)).await;
    f.approve_payment(entry.id).await;

    f.repo
        .request_closure(&f.sales, lead.id, Track::Payment, None)
        .await
        .unwrap();

    // Still allowed while Finance has not closed the track.
    f.reject_payment(entry.id, "chargeback").await;

    let err = f
        .repo
        .authorize_closure(&f.finance, lead.id, Track::Payment)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::IncompleteApprovals { .. }));
    assert!(f.lead(lead.id).await.payment_ledger_closed_at.is_none());
}

#[tokio::test]
async fn test_rerequest_and_closed_track() {
    let f = fixture().await;
    let lead = f.open("Boutique hotel").await;
    let other_sales = common::caller(&[dealflow_core::reconcile::Role::Sales]);

    f.repo
        .request_closure(&f.sales, lead.id, Track::Payment, Some("first".into()))
        .await
        .unwrap();
    let again = f
        .repo
        .request_closure(&other_sales, lead.id, Track::Payment, Some("second".into()))
        .await
        .unwrap();
    assert_eq!(again.payment_ledger_closed_by_sales_id, Some(other_sales.id));
    assert_eq!(again.payment_ledger_closure_notes.as_deref(), Some("second"));

    f.repo
        .authorize_closure(&f.finance, lead.id, Track::Payment)
        .await
        .unwrap();

    let err = f
        .repo
        .request_closure(&f.sales, lead.id, Track::Payment, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TrackClosed(Track::Payment)));

    let err = f
        .repo
        .authorize_closure(&f.finance, lead.id, Track::Payment)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TrackClosed(Track::Payment)));
}

#[tokio::test]
async fn test_closure_roles() {
    let f = fixture().await;
    let lead = f.open("Vending machines").await;

    let err = f
        .repo
        .request_closure(&f.finance, lead.id, Track::Payment, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden { .. }));

    f.repo
        .request_closure(&f.sales, lead.id, Track::Payment, None)
        .await
        .unwrap();
    let err = f
        .repo
        .authorize_closure(&f.sales, lead.id, Track::Payment)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden { .. }));

    assert!(f.notifier.events().iter().any(|e| matches!(
        e,
        LedgerEvent::ClosureRequested { track: Track::Payment, .. }
    )));
}
