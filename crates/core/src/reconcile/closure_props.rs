//! Property-based tests for ClosureCoordinator.

use proptest::prelude::*;
use uuid::Uuid;

use crate::reconcile::closure::{ClosureCoordinator, ClosureState};
use crate::reconcile::error::LedgerError;
use crate::reconcile::types::{LedgerStatus, Track};

#[derive(Debug, Clone, Copy)]
enum Step {
    Request(u64),
    Authorize(u64),
}

fn arb_track() -> impl Strategy<Value = Track> {
    prop_oneof![Just(Track::Payment), Just(Track::Document)]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u64..3).prop_map(Step::Request),
        (0u64..3).prop_map(Step::Authorize),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A track only reaches Closed through a committed request followed by
    /// an authorization, and failed steps leave the state untouched.
    #[test]
    fn prop_two_phase_order(
        track in arb_track(),
        steps in prop::collection::vec(arb_step(), 1..20),
    ) {
        let mut state = ClosureState::Open;
        let mut requested = false;

        for step in steps {
            let result = match step {
                Step::Request(outstanding) => ClosureCoordinator::request(
                    track, &state, outstanding, Uuid::new_v4(), None,
                ),
                Step::Authorize(outstanding) => ClosureCoordinator::authorize(
                    track, &state, outstanding, Uuid::new_v4(),
                ),
            };

            match (step, result) {
                (Step::Request(_), Ok(next)) => {
                    requested = true;
                    state = next;
                }
                (Step::Authorize(_), Ok(next)) => {
                    prop_assert!(requested, "authorized without a committed request");
                    prop_assert!(next.is_closed());
                    state = next;
                }
                (Step::Authorize(_), Err(LedgerError::OutOfOrder(_))) => {
                    prop_assert!(!requested);
                    prop_assert_eq!(&state, &ClosureState::Open);
                }
                (_, Err(LedgerError::IncompleteApprovals { .. } | LedgerError::TrackClosed(_))) => {}
                (_, Err(other)) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }

    /// Ledger status is CLOSED iff both tracks are closed.
    #[test]
    fn prop_ledger_status_derivation(payment_closed in any::<bool>(), document_closed in any::<bool>()) {
        let make = |closed: bool| {
            let pending = ClosureCoordinator::request(Track::Payment, &ClosureState::Open, 0, Uuid::nil(), None)
                .unwrap();
            if closed {
                ClosureCoordinator::authorize(Track::Payment, &pending, 0, Uuid::nil()).unwrap()
            } else {
                pending
            }
        };
        let status = ClosureCoordinator::ledger_status(&make(payment_closed), &make(document_closed));
        prop_assert_eq!(
            status == LedgerStatus::Closed,
            payment_closed && document_closed
        );
    }
}
