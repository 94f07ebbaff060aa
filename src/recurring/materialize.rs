//! Turning due recurring rules into stored transactions.

use rusqlite::Connection;
use time::Date;

use crate::{Error, clock::Clock, owner::OwnerId};

use super::{
    db::{advance_next_due_date, get_due_rules},
    due::resolve,
    models::RecurringRule,
};

/// What one materialization pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializationOutcome {
    /// How many rules were due when the pass started.
    pub rules_due: usize,
    /// How many transactions the pass inserted.
    pub transactions_created: usize,
    /// How many rules were skipped because another pass got to them first.
    pub rules_stale: usize,
    /// How many rules failed and were rolled back.
    pub rules_failed: usize,
}

/// Materialize every missed occurrence of `owner_id`'s due rules into
/// transactions.
///
/// Safe to run on every read path: occurrences that already exist are skipped
/// via the provenance index rather than duplicated, and a pass with nothing
/// due does no writes at all.
///
/// Each rule is processed in its own write transaction so its occurrence rows
/// and its schedule cursor move together or not at all. A failure in one rule
/// is logged and counted without touching the others; a poison rule cannot
/// block the rest of the schedule.
///
/// # Errors
/// Returns an [Error::SqlError] if the due rules cannot be listed. Per-rule
/// failures are reported through [MaterializationOutcome::rules_failed]
/// instead.
pub fn materialize_due_rules(
    owner_id: &OwnerId,
    clock: &dyn Clock,
    connection: &Connection,
) -> Result<MaterializationOutcome, Error> {
    let today = clock.today();
    let due_rules = get_due_rules(owner_id, today, connection)?;

    let mut outcome = MaterializationOutcome {
        rules_due: due_rules.len(),
        ..Default::default()
    };

    for rule in due_rules {
        match materialize_rule(&rule, today, clock, connection) {
            Ok(RuleOutcome::Materialized(count)) => outcome.transactions_created += count,
            Ok(RuleOutcome::Stale) => outcome.rules_stale += 1,
            Err(error) => {
                tracing::error!("could not materialize rule {}: {error}", rule.id);
                outcome.rules_failed += 1;
            }
        }
    }

    if outcome.transactions_created > 0 {
        tracing::info!(
            "materialized {} transactions for owner {owner_id}",
            outcome.transactions_created
        );
    }

    Ok(outcome)
}

enum RuleOutcome {
    Materialized(usize),
    Stale,
}

/// Materialize one rule's due occurrences and advance its cursor, atomically.
fn materialize_rule(
    rule: &RecurringRule,
    today: Date,
    clock: &dyn Clock,
    connection: &Connection,
) -> Result<RuleOutcome, Error> {
    let schedule = resolve(rule, today);
    let now = clock.now_utc();

    let transaction = connection.unchecked_transaction()?;

    let mut statement = transaction.prepare(
        "INSERT INTO \"transaction\"
            (owner_id, amount, kind, category_id, date, description, receipt_url, rule_id,
             created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?8)
            ON CONFLICT (rule_id, date) DO NOTHING",
    )?;

    // The row is stamped with the occurrence date, not the day the pass ran.
    // Rows that already exist for (rule, date) count zero changes.
    let mut created = 0;
    for occurrence in &schedule.occurrences {
        created += statement.execute((
            rule.owner_id.as_ref(),
            rule.amount,
            rule.kind.as_str(),
            rule.category_id,
            occurrence,
            &rule.description,
            rule.id,
            now,
        ))?;
    }

    drop(statement);

    let advanced = advance_next_due_date(
        rule.id,
        &rule.owner_id,
        rule.next_due_date,
        schedule.next_due_date,
        &transaction,
    )?;

    if !advanced {
        // The cursor moved underneath us: a racing pass already owns these
        // occurrences. Drop ours.
        transaction.rollback()?;
        return Ok(RuleOutcome::Stale);
    }

    transaction.commit()?;

    Ok(RuleOutcome::Materialized(created))
}
