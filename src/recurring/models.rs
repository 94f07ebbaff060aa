//! Core data models for recurring rules.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{CategoryId, RuleId},
    owner::OwnerId,
    transaction::TransactionKind,
};

/// How often a recurring rule falls due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Once a calendar month, clamping to the last day of shorter months.
    Monthly,
    /// Once a year, clamping February 29 to the 28th in common years.
    Yearly,
}

impl Frequency {
    /// The frequency as stored in the database and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    /// Parse a frequency string. Unknown frequencies are rejected rather than
    /// mapped to a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(Error::InvalidFrequency(s.to_string())),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A template for transactions that happen on a fixed cadence, like rent or a
/// salary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRule {
    /// The ID of the rule.
    pub id: RuleId,
    /// The owner the rule belongs to.
    pub owner_id: OwnerId,
    /// The amount each materialized transaction will carry. Always positive.
    pub amount: f64,
    /// Whether materialized transactions record income or an expense.
    pub kind: TransactionKind,
    /// The ID of the category materialized transactions belong to.
    pub category_id: CategoryId,
    /// A text description copied verbatim onto each materialized transaction.
    pub description: String,
    /// How often the rule falls due.
    pub frequency: Frequency,
    /// The rule's schedule cursor: the earliest occurrence date that has not
    /// been materialized yet.
    pub next_due_date: Date,
    /// Whether the rule currently materializes transactions.
    ///
    /// Inactive rules keep their cursor where it is, so reactivating a rule
    /// makes it catch up on everything it missed.
    pub is_active: bool,
    /// When the rule was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the rule was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A recurring rule that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecurringRule {
    /// The amount each materialized transaction will carry. Must be positive.
    pub amount: f64,
    /// Whether materialized transactions record income or an expense.
    pub kind: TransactionKind,
    /// The ID of the category materialized transactions belong to.
    pub category_id: CategoryId,
    /// A text description copied onto each materialized transaction.
    #[serde(default)]
    pub description: String,
    /// How often the rule falls due.
    pub frequency: Frequency,
    /// The first date the rule is due on. May be in the past, in which case
    /// the first materialization pass catches up from there.
    pub next_due_date: Date,
    /// Whether the rule starts active. Defaults to active.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// A partial update to a recurring rule. Fields left as `None` keep their
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurringRulePatch {
    /// Replacement amount. Must be positive.
    #[serde(default)]
    pub amount: Option<f64>,
    /// Replacement kind.
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    /// Replacement category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Replacement description.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement frequency. Takes effect from the current cursor; already
    /// materialized occurrences are not revisited.
    #[serde(default)]
    pub frequency: Option<Frequency>,
    /// Move the schedule cursor. Moving it backwards re-walks old occurrence
    /// dates, but occurrences that were already materialized are skipped, not
    /// duplicated.
    #[serde(default)]
    pub next_due_date: Option<Date>,
    /// Pause or resume the rule.
    #[serde(default)]
    pub is_active: Option<bool>,
}
