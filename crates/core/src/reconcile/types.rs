//! Domain types shared by the payment, document and closure rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Approval state of a payment or document entry.
///
/// Payments move between these states only through Finance verification.
/// Documents derive `Approved` from their two approval sides, except when a
/// side explicitly rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Waiting for review.
    Pending,
    /// Accepted.
    Approved,
    /// Rejected with notes.
    Rejected,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reviewer's verdict on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Accept the entry.
    Approved,
    /// Reject the entry (notes mandatory).
    Rejected,
}

impl Decision {
    /// Parses a decision from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approved" | "approve" => Some(Self::Approved),
            "rejected" | "reject" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// The entry status a payment takes when this decision is applied.
    #[must_use]
    pub const fn as_status(self) -> EntryStatus {
        match self {
            Self::Approved => EntryStatus::Approved,
            Self::Rejected => EntryStatus::Rejected,
        }
    }
}

/// One of the two independent ledger lanes on a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Payment entries and the credited-amount accumulator.
    Payment,
    /// Supporting documents with dual approval.
    Document,
}

impl Track {
    /// Returns the string representation of the track.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Document => "document",
        }
    }

    /// Parses a track from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "payment" => Some(Self::Payment),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    /// The other track.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Payment => Self::Document,
            Self::Document => Self::Payment,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The side of a document's dual approval a reviewer acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSide {
    /// Sales-side approval.
    Sales,
    /// Finance-side approval.
    Finance,
}

impl ReviewSide {
    /// Returns the string representation of the side.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Finance => "finance",
        }
    }

    /// Parses a side from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sales" => Some(Self::Sales),
            "finance" => Some(Self::Finance),
            _ => None,
        }
    }
}

impl fmt::Display for ReviewSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall ledger status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    /// At least one track is not closed.
    Active,
    /// Both tracks are closed.
    Closed,
}

impl LedgerStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    /// Parses a ledger status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// True once both tracks are closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trims reviewer notes, mapping blank input to `None`.
#[must_use]
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// An uploaded file recorded against an entry. Only the public URL and
/// media type are kept; bytes live in the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Public URL returned by the attachment store.
    pub url: String,
    /// Media type, e.g. `application/pdf`.
    pub media_type: String,
}
