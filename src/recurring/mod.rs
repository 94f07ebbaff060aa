//! Recurring transactions: rules that describe money moving on a fixed
//! cadence, the schedule arithmetic that walks their due dates, and the
//! materializer that turns missed occurrences into stored transactions.

mod db;
mod due;
mod materialize;
mod models;
mod schedule;

pub(crate) use db::create_recurring_rule_table;
pub use db::{create_rule, delete_rule, get_due_rules, get_rule, get_rules, update_rule};
pub use due::{DueSchedule, resolve};
pub use materialize::{MaterializationOutcome, materialize_due_rules};
pub use models::{Frequency, NewRecurringRule, RecurringRule, RecurringRulePatch};
pub use schedule::advance;
