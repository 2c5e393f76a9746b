//! Property-based tests for PaymentReconciler.
//!
//! Simulates a lead's payment entries under random verification sequences
//! and checks that the incrementally maintained accumulator never drifts
//! from the approved set.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::reconcile::payment::PaymentReconciler;
use crate::reconcile::types::{Decision, EntryStatus};

/// Strategy for generating random positive Decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for generating random decisions.
fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![Just(Decision::Approved), Just(Decision::Rejected)]
}

/// Strategy for generating random entry statuses.
fn arb_status() -> impl Strategy<Value = EntryStatus> {
    prop_oneof![
        Just(EntryStatus::Pending),
        Just(EntryStatus::Approved),
        Just(EntryStatus::Rejected),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// After any sequence of verifications, the accumulator equals the sum
    /// of approved amounts.
    #[test]
    fn prop_accumulator_matches_approved_set(
        amounts in prop::collection::vec(arb_amount(), 1..12),
        ops in prop::collection::vec((any::<prop::sample::Index>(), arb_decision()), 0..60),
    ) {
        let mut statuses = vec![EntryStatus::Pending; amounts.len()];
        let mut accumulator = Decimal::ZERO;

        for (index, decision) in ops {
            let i = index.index(amounts.len());
            let verification = PaymentReconciler::verify(
                statuses[i],
                amounts[i],
                decision,
                Some("reviewed".to_string()),
                Uuid::nil(),
            )
            .unwrap();

            // At most one entry's amount per call.
            prop_assert!(verification.accumulator_delta.abs() <= amounts[i]);

            accumulator += verification.accumulator_delta;
            statuses[i] = verification.new_status;

            let expected = PaymentReconciler::approved_total(
                statuses.iter().copied().zip(amounts.iter().copied()),
            );
            prop_assert_eq!(accumulator, expected);
        }
    }

    /// Re-approving an approved entry never changes the accumulator.
    #[test]
    fn prop_reapproval_is_idempotent(amount in arb_amount()) {
        let delta = PaymentReconciler::accumulator_delta(
            EntryStatus::Approved,
            Decision::Approved,
            amount,
        );
        prop_assert_eq!(delta, Decimal::ZERO);
    }

    /// Approve then reject nets to zero from any non-approved start.
    #[test]
    fn prop_correction_symmetry(
        amount in arb_amount(),
        start in prop_oneof![Just(EntryStatus::Pending), Just(EntryStatus::Rejected)],
    ) {
        let up = PaymentReconciler::accumulator_delta(start, Decision::Approved, amount);
        let down = PaymentReconciler::accumulator_delta(EntryStatus::Approved, Decision::Rejected, amount);
        prop_assert_eq!(up + down, Decimal::ZERO);
    }

    /// The new status always mirrors the decision and is independent of
    /// the previous status.
    #[test]
    fn prop_new_status_follows_decision(
        previous in arb_status(),
        decision in arb_decision(),
        amount in arb_amount(),
    ) {
        let verification = PaymentReconciler::verify(
            previous,
            amount,
            decision,
            Some("notes".to_string()),
            Uuid::nil(),
        )
        .unwrap();
        prop_assert_eq!(verification.new_status, decision.as_status());
        prop_assert_eq!(verification.previous_status, previous);
    }

    /// Non-positive amounts are always rejected at submission.
    #[test]
    fn prop_non_positive_amount_rejected(n in -1_000_000i64..=0i64) {
        prop_assert!(PaymentReconciler::validate_submission(Decimal::new(n, 2)).is_err());
    }
}
