//! Create, read, update and delete categories in the database.

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, named_params, types::Type,
};
use time::OffsetDateTime;

use crate::{
    Error,
    category::domain::{Category, CategoryIcon, CategoryName, CategoryPatch, NewCategory},
    database_id::CategoryId,
    owner::OwnerId,
    transaction::TransactionKind,
};

/// The starter categories seeded the first time an owner lists their
/// categories. Name, kind, color and icon, in seed order.
pub(crate) const DEFAULT_CATEGORIES: [(&str, TransactionKind, &str, CategoryIcon); 10] = [
    ("Salary", TransactionKind::Income, "#22c55e", CategoryIcon::Briefcase),
    ("Freelance", TransactionKind::Income, "#3b82f6", CategoryIcon::Code),
    ("Investments", TransactionKind::Income, "#8b5cf6", CategoryIcon::TrendingUp),
    ("Food & Dining", TransactionKind::Expense, "#f97316", CategoryIcon::Utensils),
    ("Transport", TransactionKind::Expense, "#06b6d4", CategoryIcon::Car),
    ("Housing", TransactionKind::Expense, "#0ea5e9", CategoryIcon::Home),
    ("Utilities", TransactionKind::Expense, "#eab308", CategoryIcon::Zap),
    ("Healthcare", TransactionKind::Expense, "#ec4899", CategoryIcon::Heart),
    ("Entertainment", TransactionKind::Expense, "#a855f7", CategoryIcon::Film),
    ("Shopping", TransactionKind::Expense, "#f43f5e", CategoryIcon::ShoppingBag),
];

/// Create the category table.
pub(crate) fn create_category_table(connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                color TEXT NOT NULL,
                icon TEXT NOT NULL,
                is_default INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )",
        (),
    )?;

    // Ensure the table's row ids start at one.
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('category', 0)",
        (),
    )?;

    // Every read is scoped to a single owner.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_category_owner ON category (owner_id)",
        (),
    )?;

    Ok(())
}

/// Create a category for `owner_id` and store it in the database.
///
/// Categories created through this function are never part of the default
/// set, even when they share a name with one.
///
/// # Errors
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn create_category(
    owner_id: &OwnerId,
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "INSERT INTO category (owner_id, name, kind, color, icon, is_default, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING *",
        )?
        .query_row(
            (
                owner_id.as_ref(),
                new_category.name.as_ref(),
                new_category.kind.as_str(),
                &new_category.color,
                new_category.icon.name(),
                false,
                OffsetDateTime::now_utc(),
            ),
            map_category_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve one of `owner_id`'s categories from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no category with `id` belonging to
///   `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn get_category(
    id: CategoryId,
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare("SELECT * FROM category WHERE id = :id AND owner_id = :owner_id")?
        .query_row(
            named_params! {":id": id, ":owner_id": owner_id.as_ref()},
            map_category_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of `owner_id`'s categories, most recently created first.
///
/// An owner with no categories at all gets the default set seeded before the
/// list is read, so a first call never returns an empty list.
///
/// # Errors
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn get_categories(owner_id: &OwnerId, connection: &Connection) -> Result<Vec<Category>, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE owner_id = ?1",
        (owner_id.as_ref(),),
        |row| row.get(0),
    )?;

    if count == 0 {
        seed_default_categories(owner_id, connection)?;
    }

    list_categories(owner_id, connection)
}

/// Retrieve all of `owner_id`'s categories without seeding defaults.
///
/// The analytics paths read categories through this so that looking at a
/// report never writes anything.
pub(crate) fn list_categories(
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT * FROM category WHERE owner_id = ?1 ORDER BY created_at DESC, id ASC")?
        .query_map((owner_id.as_ref(),), map_category_row)?
        .map(|result| result.map_err(|error| error.into()))
        .collect()
}

/// Seed the default category set for `owner_id`.
///
/// Runs in its own write transaction and re-checks inside it, so two
/// concurrent first reads seed the set once.
fn seed_default_categories(owner_id: &OwnerId, connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    // Another writer may have seeded between the caller's check and this
    // transaction taking the write lock.
    let count: i64 = transaction.query_row(
        "SELECT COUNT(id) FROM category WHERE owner_id = ?1",
        (owner_id.as_ref(),),
        |row| row.get(0),
    )?;

    if count > 0 {
        return Ok(());
    }

    let created_at = OffsetDateTime::now_utc();

    {
        let mut statement = transaction.prepare(
            "INSERT INTO category (owner_id, name, kind, color, icon, is_default, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for (name, kind, color, icon) in DEFAULT_CATEGORIES {
            statement.execute((
                owner_id.as_ref(),
                name,
                kind.as_str(),
                color,
                icon.name(),
                true,
                created_at,
            ))?;
        }
    }

    transaction.commit()?;

    tracing::info!("seeded default categories for owner {owner_id}");

    Ok(())
}

/// Apply a partial update to one of `owner_id`'s categories and return the
/// updated category. Patch fields left as `None` keep their stored value.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingCategory] if there is no category with `id`
///   belonging to `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn update_category(
    id: CategoryId,
    owner_id: &OwnerId,
    patch: CategoryPatch,
    connection: &Connection,
) -> Result<Category, Error> {
    let rows_affected = connection.execute(
        "UPDATE category
            SET name = COALESCE(?1, name),
                kind = COALESCE(?2, kind),
                color = COALESCE(?3, color),
                icon = COALESCE(?4, icon)
            WHERE id = ?5 AND owner_id = ?6",
        (
            patch.name.as_ref().map(|name| name.as_ref()),
            patch.kind.map(|kind| kind.as_str()),
            &patch.color,
            patch.icon.map(|icon| icon.name()),
            id,
            owner_id.as_ref(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    get_category(id, owner_id, connection)
}

/// Delete one of `owner_id`'s categories from the database.
///
/// Transactions and recurring rules that reference the category are left in
/// place; callers that want to warn first can check
/// [count_transactions_for_category].
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingCategory] if there is no category with `id`
///   belonging to `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn delete_category(
    id: CategoryId,
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND owner_id = ?2",
        (id, owner_id.as_ref()),
    )?;

    if rows_affected == 0 {
        Err(Error::DeleteMissingCategory)
    } else {
        Ok(())
    }
}

/// Count the transactions of `owner_id` that reference the category `id`.
///
/// # Errors
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn count_transactions_for_category(
    id: CategoryId,
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE category_id = ?1 AND owner_id = ?2",
            (id, owner_id.as_ref()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Check that the category `id` exists and belongs to `owner_id`.
pub(crate) fn validate_category_owner(
    id: CategoryId,
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<(), Error> {
    get_category(id, owner_id, connection)
        .map(|_| ())
        .map_err(|error| match error {
            Error::NotFound => Error::InvalidCategory(id),
            other => other,
        })
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let kind: TransactionKind = row.get::<_, String>(3)?.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
    })?;
    let icon: String = row.get(5)?;

    Ok(Category {
        id: row.get(0)?,
        owner_id: OwnerId::new(&row.get::<_, String>(1)?),
        name: CategoryName::new_unchecked(&row.get::<_, String>(2)?),
        kind,
        color: row.get(4)?,
        icon: CategoryIcon::from_name(&icon),
        is_default: row.get(6)?,
        created_at: row.get(7)?,
    })
}
