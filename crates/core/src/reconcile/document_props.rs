//! Property-based tests for DocumentReconciler.

use proptest::prelude::*;
use uuid::Uuid;

use crate::reconcile::document::{DocumentApproval, DocumentReconciler};
use crate::reconcile::types::{Decision, EntryStatus, ReviewSide};

fn arb_side() -> impl Strategy<Value = ReviewSide> {
    prop_oneof![Just(ReviewSide::Sales), Just(ReviewSide::Finance)]
}

fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![Just(Decision::Approved), Just(Decision::Rejected)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// After every review: APPROVED implies both flags set, and an approval
    /// that leaves both flags set always yields APPROVED.
    #[test]
    fn prop_dual_approval(
        reviews in prop::collection::vec((arb_side(), arb_decision()), 1..30),
    ) {
        let mut state = DocumentApproval::pending();

        for (side, decision) in reviews {
            state = DocumentReconciler::review(
                &state,
                side,
                decision,
                Some("checked".to_string()),
                Uuid::nil(),
            )
            .unwrap();

            if state.status == EntryStatus::Approved {
                prop_assert!(state.is_fully_approved());
            }
            if decision == Decision::Approved && state.is_fully_approved() {
                prop_assert_eq!(state.status, EntryStatus::Approved);
            }
            if decision == Decision::Rejected {
                prop_assert_eq!(state.status, EntryStatus::Rejected);
                prop_assert!(!state.side(side).approved);
            }
        }
    }

    /// A review never touches the other side's record.
    #[test]
    fn prop_review_isolates_sides(
        setup in prop::collection::vec((arb_side(), arb_decision()), 0..10),
        side in arb_side(),
        decision in arb_decision(),
    ) {
        let mut state = DocumentApproval::pending();
        for (s, d) in setup {
            state = DocumentReconciler::review(&state, s, d, Some("x".into()), Uuid::nil()).unwrap();
        }

        let other = match side {
            ReviewSide::Sales => ReviewSide::Finance,
            ReviewSide::Finance => ReviewSide::Sales,
        };
        let before = state.side(other).clone();
        let after = DocumentReconciler::review(&state, side, decision, Some("y".into()), Uuid::new_v4())
            .unwrap();
        prop_assert_eq!(after.side(other), &before);
    }
}
