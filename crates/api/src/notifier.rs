//! Email delivery of ledger events.
//!
//! Each event becomes one plain-text email to the team that has to act on
//! it. Sending happens on a spawned task; the ledger operation that raised
//! the event has already committed and never sees the outcome.

use std::sync::Arc;

use tracing::{debug, warn};

use dealflow_core::reconcile::{LedgerEvent, LedgerNotifier, ReviewSide};
use dealflow_shared::{EmailService, NotificationConfig};

/// Team mailbox an event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The sales team.
    Sales,
    /// The finance team.
    Finance,
}

/// A rendered event, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Who should read it.
    pub audience: Audience,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl Notice {
    /// Renders an event.
    #[must_use]
    pub fn render(event: &LedgerEvent) -> Self {
        match event {
            LedgerEvent::LedgerOpened {
                lead_id,
                title,
                opened_by,
            } => Self {
                audience: Audience::Finance,
                subject: format!("New ledger opened: {title}"),
                body: format!(
                    "A ledger was opened for lead {lead_id} ({title}) by {opened_by}.\n\
                     Payment and document entries will appear as sales submits them."
                ),
            },
            LedgerEvent::ClosureRequested {
                lead_id,
                track,
                requested_by,
            } => Self {
                audience: Audience::Finance,
                subject: format!("Closure requested for the {track} ledger of lead {lead_id}"),
                body: format!(
                    "{requested_by} asked to close the {track} ledger of lead {lead_id}.\n\
                     Review the entries and authorize the closure."
                ),
            },
            LedgerEvent::ClosureAuthorized {
                lead_id,
                track,
                authorized_by,
                ledger_closed,
            } => {
                let tail = if *ledger_closed {
                    "Both tracks are now closed and the ledger is CLOSED."
                } else {
                    "The other track is still open."
                };
                Self {
                    audience: Audience::Sales,
                    subject: format!("The {track} ledger of lead {lead_id} is closed"),
                    body: format!(
                        "{authorized_by} authorized closure of the {track} ledger of lead {lead_id}.\n{tail}"
                    ),
                }
            }
            LedgerEvent::PaymentRejected {
                lead_id,
                entry_id,
                amount,
                notes,
            } => Self {
                audience: Audience::Sales,
                subject: format!("Payment entry rejected on lead {lead_id}"),
                body: format!(
                    "Finance rejected payment entry {entry_id} for {amount}.\n\nNotes: {notes}"
                ),
            },
            LedgerEvent::DocumentRejected {
                lead_id,
                entry_id,
                side,
                notes,
            } => Self {
                audience: match side {
                    ReviewSide::Sales => Audience::Finance,
                    ReviewSide::Finance => Audience::Sales,
                },
                subject: format!("Document entry rejected on lead {lead_id}"),
                body: format!(
                    "The {side} team rejected document entry {entry_id}.\n\nNotes: {notes}"
                ),
            },
        }
    }
}

/// [`LedgerNotifier`] that emails the responsible team.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    email: Arc<EmailService>,
    recipients: NotificationConfig,
}

impl EmailNotifier {
    /// Creates a notifier sending through `email` to the configured
    /// mailboxes.
    #[must_use]
    pub const fn new(email: Arc<EmailService>, recipients: NotificationConfig) -> Self {
        Self { email, recipients }
    }

    fn mailbox(&self, audience: Audience) -> Option<&str> {
        match audience {
            Audience::Sales => self.recipients.sales_email.as_deref(),
            Audience::Finance => self.recipients.finance_email.as_deref(),
        }
    }
}

impl LedgerNotifier for EmailNotifier {
    fn notify(&self, event: LedgerEvent) {
        if !self.email.is_enabled() {
            debug!(lead_id = %event.lead_id(), "email disabled, dropping ledger event");
            return;
        }

        let notice = Notice::render(&event);
        let Some(to) = self.mailbox(notice.audience).map(str::to_string) else {
            debug!(audience = ?notice.audience, "no mailbox configured for ledger event");
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(lead_id = %event.lead_id(), "no async runtime, ledger event not emailed");
            return;
        };

        let email = Arc::clone(&self.email);
        let lead_id = event.lead_id();
        runtime.spawn(async move {
            if let Err(e) = email.send_email(&to, &notice.subject, &notice.body).await {
                warn!(error = %e, %lead_id, to = %to, "failed to email ledger event");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow_core::reconcile::Track;
    use dealflow_shared::EmailConfig;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_rejections_go_to_the_other_team() {
        let by_finance = Notice::render(&LedgerEvent::DocumentRejected {
            lead_id: Uuid::nil(),
            entry_id: Uuid::nil(),
            side: ReviewSide::Finance,
            notes: "unsigned".into(),
        });
        assert_eq!(by_finance.audience, Audience::Sales);
        assert!(by_finance.body.contains("unsigned"));

        let by_sales = Notice::render(&LedgerEvent::DocumentRejected {
            lead_id: Uuid::nil(),
            entry_id: Uuid::nil(),
            side: ReviewSide::Sales,
            notes: "wrong customer".into(),
        });
        assert_eq!(by_sales.audience, Audience::Finance);
    }

    #[test]
    fn test_payment_rejection_mentions_amount() {
        let notice = Notice::render(&LedgerEvent::PaymentRejected {
            lead_id: Uuid::nil(),
            entry_id: Uuid::nil(),
            amount: dec!(1250.50),
            notes: "bounced".into(),
        });
        assert_eq!(notice.audience, Audience::Sales);
        assert!(notice.body.contains("1250.50"));
        assert!(notice.body.contains("bounced"));
    }

    #[test]
    fn test_closure_authorized_reports_ledger_state() {
        let notice = Notice::render(&LedgerEvent::ClosureAuthorized {
            lead_id: Uuid::nil(),
            track: Track::Document,
            authorized_by: Uuid::nil(),
            ledger_closed: true,
        });
        assert!(notice.subject.contains("document"));
        assert!(notice.body.contains("CLOSED"));
    }

    #[test]
    fn test_disabled_email_drops_events_outside_runtime() {
        let notifier = EmailNotifier::new(
            Arc::new(EmailService::new(EmailConfig::default())),
            NotificationConfig {
                sales_email: Some("sales@example.com".into()),
                finance_email: None,
            },
        );
        notifier.notify(LedgerEvent::ClosureRequested {
            lead_id: Uuid::nil(),
            track: Track::Payment,
            requested_by: Uuid::nil(),
        });
    }
}
