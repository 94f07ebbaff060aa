//! Resolving which occurrence dates of a rule are due.

use time::Date;

use super::{models::RecurringRule, schedule::advance};

/// The due occurrence dates of a rule and where its schedule cursor lands
/// once they are all materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueSchedule {
    /// Every occurrence dated on or before today, oldest first.
    pub occurrences: Vec<Date>,
    /// The first occurrence date after today. This is what the rule's cursor
    /// is set to after materialization.
    pub next_due_date: Date,
}

/// Collect every occurrence of `rule` dated on or before `today`.
///
/// A rule that has fallen behind yields one occurrence per missed period, not
/// just the oldest; a tracker that was not opened for three months gets all
/// three rent payments. Inactive rules and rules scheduled in the future
/// yield nothing and leave the cursor where it is.
pub fn resolve(rule: &RecurringRule, today: Date) -> DueSchedule {
    if !rule.is_active || rule.next_due_date > today {
        return DueSchedule {
            occurrences: Vec::new(),
            next_due_date: rule.next_due_date,
        };
    }

    let mut occurrences = Vec::new();
    let mut cursor = rule.next_due_date;

    while cursor <= today {
        occurrences.push(cursor);
        cursor = advance(cursor, rule.frequency);
    }

    DueSchedule {
        occurrences,
        next_due_date: cursor,
    }
}
