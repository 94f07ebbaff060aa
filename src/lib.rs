//! Penny is a personal finance tracker: income and expense transactions,
//! organized into categories, with recurring rules that materialize into
//! concrete transactions as they fall due.
//!
//! This library is the storage, scheduling, and analytics core. Hosts own the
//! SQLite connection and the authenticated owner identifier and pass both
//! into the functions here; nothing in this crate reads ambient global state.

#![warn(missing_docs)]

mod calendar;
mod category;
mod clock;
mod database_id;
mod db;
mod owner;
mod recurring;
mod stats;
mod transaction;

pub use calendar::{DateRange, is_leap_year, last_day_of_month, month_bounds, previous_month};
pub use category::{
    Category, CategoryIcon, CategoryName, CategoryPatch, NewCategory,
    count_transactions_for_category, create_category, delete_category, get_categories,
    get_category, update_category,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use database_id::{CategoryId, DatabaseId, RuleId, TransactionId};
pub use db::initialize as initialize_db;
pub use owner::OwnerId;
pub use recurring::{
    DueSchedule, Frequency, MaterializationOutcome, NewRecurringRule, RecurringRule,
    RecurringRulePatch, advance, create_rule, delete_rule, get_due_rules, get_rule, get_rules,
    materialize_due_rules, resolve, update_rule,
};
pub use stats::{
    CategorySpending, MonthlyStats, TrendPoint, category_breakdown, monthly_stats, monthly_trend,
};
pub use transaction::{
    NewTransaction, SortOrder, Transaction, TransactionKind, TransactionPatch, TransactionQuery,
    create_transaction, delete_transaction, get_transaction, get_transactions, update_transaction,
};

/// The errors that may occur in the library.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A zero or negative amount was used to create or update a transaction
    /// or recurring rule. Amounts record how much money moved; the direction
    /// is carried by the kind.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The category ID used to create or update a transaction or recurring
    /// rule did not match a category belonging to the same owner.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// A frequency string from storage or the wire was not one of `daily`,
    /// `weekly`, `monthly`, or `yearly`.
    #[error("unknown frequency \"{0}\"")]
    InvalidFrequency(String),

    /// A transaction kind string was not `income` or `expense`.
    #[error("unknown transaction kind \"{0}\"")]
    InvalidKind(String),

    /// A timezone string could not be resolved to a canonical timezone.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Tried to update a transaction that does not exist or is not owned by
    /// the caller.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist or is not owned by
    /// the caller.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist or is not owned by the
    /// caller.
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist or is not owned by the
    /// caller.
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a recurring rule that does not exist or is not owned
    /// by the caller.
    #[error("tried to update a recurring rule that is not in the database")]
    UpdateMissingRule,

    /// Tried to delete a recurring rule that does not exist or is not owned
    /// by the caller.
    #[error("tried to delete a recurring rule that is not in the database")]
    DeleteMissingRule,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
