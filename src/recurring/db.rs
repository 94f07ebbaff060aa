//! Create, read, update and delete recurring rules in the database.

use rusqlite::{Connection, Row, named_params, types::Type};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::validate_category_owner,
    database_id::RuleId,
    owner::OwnerId,
    recurring::models::{Frequency, NewRecurringRule, RecurringRule, RecurringRulePatch},
    transaction::TransactionKind,
};

/// Create the recurring rule table.
pub(crate) fn create_recurring_rule_table(connection: &Connection) -> Result<(), Error> {
    // AUTOINCREMENT so a deleted rule's id is never handed to a new rule;
    // materialized transactions keep referencing rules by id after deletion.
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_rule (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                frequency TEXT NOT NULL,
                next_due_date TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        (),
    )?;

    // Ensure the table's row ids start at one.
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('recurring_rule', 0)",
        (),
    )?;

    // The materializer scans one owner's active rules by due date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_recurring_rule_owner_due
            ON recurring_rule (owner_id, is_active, next_due_date)",
        (),
    )?;

    Ok(())
}

/// Create a recurring rule for `owner_id` and store it in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::InvalidCategory] if the category does not exist or belongs to
///   another owner,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn create_rule(
    owner_id: &OwnerId,
    new_rule: NewRecurringRule,
    connection: &Connection,
) -> Result<RecurringRule, Error> {
    if new_rule.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(new_rule.amount));
    }

    validate_category_owner(new_rule.category_id, owner_id, connection)?;

    connection
        .prepare(
            "INSERT INTO recurring_rule
                (owner_id, amount, kind, category_id, description, frequency, next_due_date,
                 is_active, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                RETURNING *",
        )?
        .query_row(
            (
                owner_id.as_ref(),
                new_rule.amount,
                new_rule.kind.as_str(),
                new_rule.category_id,
                &new_rule.description,
                new_rule.frequency.as_str(),
                new_rule.next_due_date,
                new_rule.is_active,
                OffsetDateTime::now_utc(),
            ),
            map_rule_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve one of `owner_id`'s recurring rules from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no rule with `id` belonging to `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn get_rule(
    id: RuleId,
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<RecurringRule, Error> {
    let rule = connection
        .prepare("SELECT * FROM recurring_rule WHERE id = :id AND owner_id = :owner_id")?
        .query_one(
            named_params! {":id": id, ":owner_id": owner_id.as_ref()},
            map_rule_row,
        )?;

    Ok(rule)
}

/// Retrieve all of `owner_id`'s recurring rules, soonest due first.
///
/// # Errors
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn get_rules(owner_id: &OwnerId, connection: &Connection) -> Result<Vec<RecurringRule>, Error> {
    connection
        .prepare(
            "SELECT * FROM recurring_rule WHERE owner_id = ?1
                ORDER BY next_due_date ASC, id ASC",
        )?
        .query_map((owner_id.as_ref(),), map_rule_row)?
        .map(|result| result.map_err(|error| error.into()))
        .collect()
}

/// Retrieve `owner_id`'s active rules whose next due date is on or before
/// `today`, soonest due first.
///
/// # Errors
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn get_due_rules(
    owner_id: &OwnerId,
    today: Date,
    connection: &Connection,
) -> Result<Vec<RecurringRule>, Error> {
    connection
        .prepare(
            "SELECT * FROM recurring_rule
                WHERE owner_id = ?1 AND is_active = 1 AND next_due_date <= ?2
                ORDER BY next_due_date ASC, id ASC",
        )?
        .query_map((owner_id.as_ref(), today), map_rule_row)?
        .map(|result| result.map_err(|error| error.into()))
        .collect()
}

/// Apply a partial update to one of `owner_id`'s recurring rules and return
/// the updated rule. Patch fields left as `None` keep their stored value.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the patch contains a zero or negative
///   amount,
/// - [Error::InvalidCategory] if the patch moves the rule to a category that
///   does not exist or belongs to another owner,
/// - [Error::UpdateMissingRule] if there is no rule with `id` belonging to
///   `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn update_rule(
    id: RuleId,
    owner_id: &OwnerId,
    patch: RecurringRulePatch,
    connection: &Connection,
) -> Result<RecurringRule, Error> {
    if let Some(amount) = patch.amount {
        if amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }
    }

    if let Some(category_id) = patch.category_id {
        validate_category_owner(category_id, owner_id, connection)?;
    }

    let rows_affected = connection.execute(
        "UPDATE recurring_rule
            SET amount = COALESCE(?1, amount),
                kind = COALESCE(?2, kind),
                category_id = COALESCE(?3, category_id),
                description = COALESCE(?4, description),
                frequency = COALESCE(?5, frequency),
                next_due_date = COALESCE(?6, next_due_date),
                is_active = COALESCE(?7, is_active),
                updated_at = ?8
            WHERE id = ?9 AND owner_id = ?10",
        (
            patch.amount,
            patch.kind.map(|kind| kind.as_str()),
            patch.category_id,
            &patch.description,
            patch.frequency.map(|frequency| frequency.as_str()),
            patch.next_due_date,
            patch.is_active,
            OffsetDateTime::now_utc(),
            id,
            owner_id.as_ref(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingRule);
    }

    get_rule(id, owner_id, connection)
}

/// Delete one of `owner_id`'s recurring rules from the database.
///
/// Transactions the rule materialized are left in place; only the template is
/// removed.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingRule] if there is no rule with `id` belonging to
///   `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn delete_rule(id: RuleId, owner_id: &OwnerId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM recurring_rule WHERE id = ?1 AND owner_id = ?2",
        (id, owner_id.as_ref()),
    )?;

    if rows_affected == 0 {
        Err(Error::DeleteMissingRule)
    } else {
        Ok(())
    }
}

/// Move a rule's schedule cursor from `from` to `to`, but only if it is still
/// at `from`.
///
/// Returns false when the cursor has moved underneath the caller, which
/// happens when two materialization passes race over the same rule.
pub(crate) fn advance_next_due_date(
    id: RuleId,
    owner_id: &OwnerId,
    from: Date,
    to: Date,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "UPDATE recurring_rule
            SET next_due_date = ?1, updated_at = ?2
            WHERE id = ?3 AND owner_id = ?4 AND next_due_date = ?5",
        (to, OffsetDateTime::now_utc(), id, owner_id.as_ref(), from),
    )?;

    Ok(rows_affected == 1)
}

fn map_rule_row(row: &Row) -> Result<RecurringRule, rusqlite::Error> {
    let kind: TransactionKind = row.get::<_, String>(3)?.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
    })?;
    let frequency: Frequency = row.get::<_, String>(6)?.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(error))
    })?;

    Ok(RecurringRule {
        id: row.get(0)?,
        owner_id: OwnerId::new(&row.get::<_, String>(1)?),
        amount: row.get(2)?,
        kind,
        category_id: row.get(4)?,
        description: row.get(5)?,
        frequency,
        next_due_date: row.get(7)?,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod rule_database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        category::{Category, CategoryIcon, CategoryName, NewCategory, create_category},
        db::initialize,
        owner::OwnerId,
        recurring::models::{Frequency, NewRecurringRule, RecurringRulePatch},
        transaction::TransactionKind,
    };

    use super::{
        advance_next_due_date, create_rule, delete_rule, get_due_rules, get_rule, get_rules,
        update_rule,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().expect("Could not open database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    fn expense_category(owner: &OwnerId, connection: &Connection) -> Category {
        create_category(
            owner,
            NewCategory {
                name: CategoryName::new_unchecked("Housing"),
                kind: TransactionKind::Expense,
                color: "#0ea5e9".to_string(),
                icon: CategoryIcon::Home,
            },
            connection,
        )
        .expect("Could not create category")
    }

    fn sample_rule(category_id: i64, next_due_date: time::Date) -> NewRecurringRule {
        NewRecurringRule {
            amount: 1200.0,
            kind: TransactionKind::Expense,
            category_id,
            description: "rent".to_string(),
            frequency: Frequency::Monthly,
            next_due_date,
            is_active: true,
        }
    }

    #[test]
    fn create_and_get_round_trip() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);

        let rule = create_rule(
            &owner,
            sample_rule(category.id, date!(2024 - 05 - 01)),
            &connection,
        )
        .expect("Could not create rule");

        assert_eq!(rule.owner_id, owner);
        assert_eq!(rule.amount, 1200.0);
        assert_eq!(rule.kind, TransactionKind::Expense);
        assert_eq!(rule.category_id, category.id);
        assert_eq!(rule.description, "rent");
        assert_eq!(rule.frequency, Frequency::Monthly);
        assert_eq!(rule.next_due_date, date!(2024 - 05 - 01));
        assert!(rule.is_active);
        assert_eq!(rule.created_at, rule.updated_at);

        let retrieved = get_rule(rule.id, &owner, &connection).expect("Could not retrieve rule");

        assert_eq!(retrieved, rule);
    }

    #[test]
    fn create_rejects_non_positive_amount() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);

        let mut new_rule = sample_rule(category.id, date!(2024 - 05 - 01));
        new_rule.amount = 0.0;

        let result = create_rule(&owner, new_rule, &connection);

        assert_eq!(result, Err(Error::NonPositiveAmount(0.0)));
    }

    #[test]
    fn create_rejects_unknown_category() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");

        let result = create_rule(&owner, sample_rule(42, date!(2024 - 05 - 01)), &connection);

        assert_eq!(result, Err(Error::InvalidCategory(42)));
    }

    #[test]
    fn get_rule_is_scoped_to_owner() {
        let connection = get_test_connection();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");
        let category = expense_category(&alice, &connection);

        let rule = create_rule(
            &alice,
            sample_rule(category.id, date!(2024 - 05 - 01)),
            &connection,
        )
        .expect("Could not create rule");

        assert_eq!(get_rule(rule.id, &bob, &connection), Err(Error::NotFound));
    }

    #[test]
    fn get_rules_sorts_by_next_due_date() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);

        for date in [
            date!(2024 - 05 - 20),
            date!(2024 - 05 - 01),
            date!(2024 - 05 - 10),
        ] {
            create_rule(&owner, sample_rule(category.id, date), &connection)
                .expect("Could not create rule");
        }

        let rules = get_rules(&owner, &connection).expect("Could not list rules");

        let dates: Vec<_> = rules.iter().map(|rule| rule.next_due_date).collect();
        assert_eq!(
            dates,
            vec![
                date!(2024 - 05 - 01),
                date!(2024 - 05 - 10),
                date!(2024 - 05 - 20)
            ]
        );
    }

    #[test]
    fn get_due_rules_returns_only_active_due_rules() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);
        let today = date!(2024 - 04 - 15);

        let overdue = create_rule(
            &owner,
            sample_rule(category.id, date!(2024 - 01 - 31)),
            &connection,
        )
        .expect("Could not create rule");
        let due_today = create_rule(&owner, sample_rule(category.id, today), &connection)
            .expect("Could not create rule");
        create_rule(
            &owner,
            sample_rule(category.id, date!(2024 - 04 - 16)),
            &connection,
        )
        .expect("Could not create rule");

        let mut paused = sample_rule(category.id, date!(2024 - 02 - 01));
        paused.is_active = false;
        create_rule(&owner, paused, &connection).expect("Could not create rule");

        let due = get_due_rules(&owner, today, &connection).expect("Could not list due rules");

        let ids: Vec<_> = due.iter().map(|rule| rule.id).collect();
        assert_eq!(ids, vec![overdue.id, due_today.id]);
    }

    #[test]
    fn get_due_rules_is_scoped_to_owner() {
        let connection = get_test_connection();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");
        let category = expense_category(&alice, &connection);

        create_rule(
            &alice,
            sample_rule(category.id, date!(2024 - 01 - 31)),
            &connection,
        )
        .expect("Could not create rule");

        let due = get_due_rules(&bob, date!(2024 - 04 - 15), &connection)
            .expect("Could not list due rules");

        assert!(due.is_empty());
    }

    #[test]
    fn update_rule_applies_partial_patch() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);

        let rule = create_rule(
            &owner,
            sample_rule(category.id, date!(2024 - 05 - 01)),
            &connection,
        )
        .expect("Could not create rule");

        let patch = RecurringRulePatch {
            amount: Some(1300.0),
            is_active: Some(false),
            ..Default::default()
        };
        let updated =
            update_rule(rule.id, &owner, patch, &connection).expect("Could not update rule");

        assert_eq!(updated.amount, 1300.0);
        assert!(!updated.is_active);
        assert_eq!(updated.frequency, rule.frequency);
        assert_eq!(updated.next_due_date, rule.next_due_date);
        assert_eq!(updated.description, rule.description);
        assert!(updated.updated_at >= rule.updated_at);
    }

    #[test]
    fn update_rule_returns_error_for_missing_rule() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");

        let result = update_rule(42, &owner, RecurringRulePatch::default(), &connection);

        assert_eq!(result, Err(Error::UpdateMissingRule));
    }

    #[test]
    fn delete_rule_removes_rule() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);

        let rule = create_rule(
            &owner,
            sample_rule(category.id, date!(2024 - 05 - 01)),
            &connection,
        )
        .expect("Could not create rule");

        delete_rule(rule.id, &owner, &connection).expect("Could not delete rule");

        assert_eq!(get_rule(rule.id, &owner, &connection), Err(Error::NotFound));
        assert_eq!(
            delete_rule(rule.id, &owner, &connection),
            Err(Error::DeleteMissingRule)
        );
    }

    #[test]
    fn advance_next_due_date_moves_matching_cursor() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);

        let rule = create_rule(
            &owner,
            sample_rule(category.id, date!(2024 - 01 - 31)),
            &connection,
        )
        .expect("Could not create rule");

        let advanced = advance_next_due_date(
            rule.id,
            &owner,
            date!(2024 - 01 - 31),
            date!(2024 - 04 - 30),
            &connection,
        )
        .expect("Could not advance cursor");

        assert!(advanced);
        let stored = get_rule(rule.id, &owner, &connection).expect("Could not retrieve rule");
        assert_eq!(stored.next_due_date, date!(2024 - 04 - 30));
    }

    #[test]
    fn advance_next_due_date_detects_moved_cursor() {
        let connection = get_test_connection();
        let owner = OwnerId::new("alice");
        let category = expense_category(&owner, &connection);

        let rule = create_rule(
            &owner,
            sample_rule(category.id, date!(2024 - 02 - 29)),
            &connection,
        )
        .expect("Could not create rule");

        let advanced = advance_next_due_date(
            rule.id,
            &owner,
            date!(2024 - 01 - 31),
            date!(2024 - 04 - 30),
            &connection,
        )
        .expect("Could not attempt advance");

        assert!(!advanced);
        let stored = get_rule(rule.id, &owner, &connection).expect("Could not retrieve rule");
        assert_eq!(stored.next_due_date, date!(2024 - 02 - 29));
    }
}
