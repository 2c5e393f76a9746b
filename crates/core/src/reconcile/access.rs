//! Authorization gate for ledger actions.
//!
//! The whole permission matrix lives in [`AuthorizationGate::allowed`];
//! handlers never inspect role membership themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::reconcile::error::LedgerError;
use crate::reconcile::types::ReviewSide;

/// A role flag supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sales team member; owns submission and closure requests.
    Sales,
    /// Finance team member; owns verification and closure authorization.
    Finance,
    /// Administrator; permitted for every action.
    Admin,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sales" => Some(Self::Sales),
            "finance" => Some(Self::Finance),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Finance => "finance",
            Self::Admin => "admin",
        }
    }
}

/// The set of roles a caller holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Creates a role set from known roles.
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// Builds a role set from role names, ignoring names this subsystem
    /// does not know about.
    #[must_use]
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self(names.iter().filter_map(|n| Role::parse(n.as_ref())).collect())
    }

    /// Returns true if the set holds `role`.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Returns true if the set holds no known role.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the held roles in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

/// An operation a caller asks the ledger engine to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create the ledger for a converted lead.
    OpenLedger,
    /// Read a ledger or list ledgers.
    ViewLedger,
    /// Edit the free-form payment timeline.
    UpdateLedgerInfo,
    /// Submit a payment entry.
    SubmitPayment,
    /// Approve or reject a payment entry.
    VerifyPayment,
    /// Submit a document entry.
    SubmitDocument,
    /// Review a document entry acting for one side.
    ReviewDocument(ReviewSide),
    /// Phase 1 of track closure.
    RequestClosure,
    /// Phase 2 of track closure.
    AuthorizeClosure,
    /// Recompute the accumulator and report drift.
    AuditAccumulator,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenLedger => write!(f, "open_ledger"),
            Self::ViewLedger => write!(f, "view_ledger"),
            Self::UpdateLedgerInfo => write!(f, "update_ledger_info"),
            Self::SubmitPayment => write!(f, "submit_payment"),
            Self::VerifyPayment => write!(f, "verify_payment"),
            Self::SubmitDocument => write!(f, "submit_document"),
            Self::ReviewDocument(side) => write!(f, "review_document_as_{side}"),
            Self::RequestClosure => write!(f, "request_closure"),
            Self::AuthorizeClosure => write!(f, "authorize_closure"),
            Self::AuditAccumulator => write!(f, "audit_accumulator"),
        }
    }
}

/// Stateless permission check for ledger actions.
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Returns true if a caller holding `roles` may perform `action`.
    ///
    /// ADMIN is permitted for every action. SALES and FINANCE are permitted
    /// only for the actions their team owns.
    #[must_use]
    pub fn allowed(roles: &RoleSet, action: Action) -> bool {
        if roles.contains(Role::Admin) {
            return true;
        }

        match action {
            Action::OpenLedger
            | Action::UpdateLedgerInfo
            | Action::SubmitPayment
            | Action::RequestClosure
            | Action::ReviewDocument(ReviewSide::Sales) => roles.contains(Role::Sales),
            Action::VerifyPayment
            | Action::AuthorizeClosure
            | Action::AuditAccumulator
            | Action::ReviewDocument(ReviewSide::Finance) => roles.contains(Role::Finance),
            Action::ViewLedger | Action::SubmitDocument => {
                roles.contains(Role::Sales) || roles.contains(Role::Finance)
            }
        }
    }

    /// Like [`allowed`](Self::allowed) but returns `LedgerError::Forbidden`
    /// on denial.
    pub fn require(roles: &RoleSet, action: Action) -> Result<(), LedgerError> {
        if Self::allowed(roles, action) {
            Ok(())
        } else {
            Err(LedgerError::Forbidden { action })
        }
    }
}

/// An authenticated caller: stable identity plus role flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Caller id, recorded as uploader, reviewer or closer.
    pub id: Uuid,
    /// Roles the identity provider vouched for.
    pub roles: RoleSet,
}

impl Caller {
    /// Creates a caller.
    #[must_use]
    pub const fn new(id: Uuid, roles: RoleSet) -> Self {
        Self { id, roles }
    }

    /// Checks the gate for this caller.
    pub fn require(&self, action: Action) -> Result<(), LedgerError> {
        AuthorizationGate::require(&self.roles, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ALL_ACTIONS: [Action; 11] = [
        Action::OpenLedger,
        Action::ViewLedger,
        Action::UpdateLedgerInfo,
        Action::SubmitPayment,
        Action::VerifyPayment,
        Action::SubmitDocument,
        Action::ReviewDocument(ReviewSide::Sales),
        Action::ReviewDocument(ReviewSide::Finance),
        Action::RequestClosure,
        Action::AuthorizeClosure,
        Action::AuditAccumulator,
    ];

    #[test]
    fn test_admin_allowed_everything() {
        let roles = RoleSet::new([Role::Admin]);
        for action in ALL_ACTIONS {
            assert!(AuthorizationGate::allowed(&roles, action), "{action}");
        }
    }

    #[test]
    fn test_no_roles_denied_everything() {
        let roles = RoleSet::default();
        for action in ALL_ACTIONS {
            assert!(!AuthorizationGate::allowed(&roles, action), "{action}");
        }
    }

    #[rstest]
    #[case(Action::OpenLedger, true, false)]
    #[case(Action::ViewLedger, true, true)]
    #[case(Action::UpdateLedgerInfo, true, false)]
    #[case(Action::SubmitPayment, true, false)]
    #[case(Action::VerifyPayment, false, true)]
    #[case(Action::SubmitDocument, true, true)]
    #[case(Action::ReviewDocument(ReviewSide::Sales), true, false)]
    #[case(Action::ReviewDocument(ReviewSide::Finance), false, true)]
    #[case(Action::RequestClosure, true, false)]
    #[case(Action::AuthorizeClosure, false, true)]
    #[case(Action::AuditAccumulator, false, true)]
    fn test_permission_matrix(
        #[case] action: Action,
        #[case] sales_allowed: bool,
        #[case] finance_allowed: bool,
    ) {
        let sales = RoleSet::new([Role::Sales]);
        let finance = RoleSet::new([Role::Finance]);
        assert_eq!(AuthorizationGate::allowed(&sales, action), sales_allowed);
        assert_eq!(AuthorizationGate::allowed(&finance, action), finance_allowed);
    }

    #[test]
    fn test_dual_role_caller_may_review_as_either_side() {
        let roles = RoleSet::new([Role::Sales, Role::Finance]);
        assert!(AuthorizationGate::allowed(
            &roles,
            Action::ReviewDocument(ReviewSide::Sales)
        ));
        assert!(AuthorizationGate::allowed(
            &roles,
            Action::ReviewDocument(ReviewSide::Finance)
        ));
    }

    #[test]
    fn test_from_names_ignores_unknown_roles() {
        let roles = RoleSet::from_names(&["SALES", "hr", " finance "]);
        assert!(roles.contains(Role::Sales));
        assert!(roles.contains(Role::Finance));
        assert!(!roles.contains(Role::Admin));
        assert_eq!(roles.iter().count(), 2);

        assert!(RoleSet::from_names(&["hr", "manager"]).is_empty());
    }

    #[test]
    fn test_require_returns_forbidden() {
        let roles = RoleSet::new([Role::Sales]);
        let err = AuthorizationGate::require(&roles, Action::VerifyPayment).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Forbidden {
                action: Action::VerifyPayment
            }
        ));
        assert!(AuthorizationGate::require(&roles, Action::SubmitPayment).is_ok());
    }

    #[test]
    fn test_caller_require() {
        let caller = Caller::new(Uuid::new_v4(), RoleSet::new([Role::Finance]));
        assert!(caller.require(Action::VerifyPayment).is_ok());
        assert!(matches!(
            caller.require(Action::SubmitPayment),
            Err(LedgerError::Forbidden { action: Action::SubmitPayment })
        ));
    }
}
