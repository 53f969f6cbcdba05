use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a quote sits in its lifecycle. Statuses only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Pending,
    Approved,
    Invoice,
}

impl QuoteStatus {
    pub fn all() -> &'static [QuoteStatus] {
        &[
            QuoteStatus::Draft,
            QuoteStatus::Pending,
            QuoteStatus::Approved,
            QuoteStatus::Invoice,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Invoice => "invoice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "invoice" => Some(Self::Invoice),
            _ => None,
        }
    }

    /// Whether a quote in this status may move to `next`.
    ///
    /// | from       | allowed targets       |
    /// |------------|-----------------------|
    /// | `draft`    | `pending`, `invoice`  |
    /// | `pending`  | `approved`, `invoice` |
    /// | `approved` | `invoice`             |
    /// | `invoice`  | none                  |
    pub fn can_transition_to(
        &self,
        next: QuoteStatus,
    ) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Pending)
                | (Self::Pending, Self::Approved)
                | (Self::Draft | Self::Pending | Self::Approved, Self::Invoice)
        )
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
