//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, named_params, params_from_iter,
    types::{Type, Value},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    calendar::DateRange,
    category::validate_category_owner,
    database_id::{CategoryId, RuleId, TransactionId},
    owner::OwnerId,
};

/// Whether a transaction records money coming in or going out.
///
/// Amounts are always positive; the kind carries the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The kind as stored in the database and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(Error::InvalidKind(s.to_string())),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The owner the transaction belongs to.
    pub owner_id: OwnerId,
    /// The amount of money that moved. Always positive.
    pub amount: f64,
    /// Whether the money came in or went out.
    pub kind: TransactionKind,
    /// The ID of the category the transaction belongs to.
    ///
    /// Categories can be deleted without touching their transactions, so this
    /// may point at a category that no longer exists.
    pub category_id: CategoryId,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// A link to a receipt image, if one was attached.
    pub receipt_url: Option<String>,
    /// The recurring rule this transaction was materialized from.
    ///
    /// `None` for transactions entered by hand. Together with [Transaction::date]
    /// this identifies one occurrence of a rule, which is what keeps
    /// materialization from creating the same occurrence twice.
    pub rule_id: Option<RuleId>,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// The amount of money that moved. Must be positive.
    pub amount: f64,
    /// Whether the money came in or went out.
    pub kind: TransactionKind,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
    /// A link to a receipt image.
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// A partial update to a transaction. Fields left as `None` keep their stored
/// value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    /// Replacement amount. Must be positive.
    #[serde(default)]
    pub amount: Option<f64>,
    /// Replacement kind.
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    /// Replacement category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Replacement date.
    #[serde(default)]
    pub date: Option<Date>,
    /// Replacement description.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement receipt link. A stored link can be replaced but not
    /// cleared through a patch.
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// The direction transactions are sorted in by date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

/// Filters for listing transactions.
///
/// The default query matches all of an owner's transactions, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    /// Only include transactions dated within this range, boundaries
    /// included.
    pub date_range: Option<DateRange>,
    /// Only include transactions of this kind.
    pub kind: Option<TransactionKind>,
    /// Only include transactions in this category.
    pub category_id: Option<CategoryId>,
    /// The date sort direction.
    pub order: SortOrder,
    /// Return at most this many transactions.
    pub limit: Option<u32>,
}

/// Create a transaction for `owner_id` and store it in the database.
///
/// Transactions created through this function are manual entries and carry no
/// rule provenance; materialized occurrences are written by the
/// recurring-rule machinery instead.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::InvalidCategory] if the category does not exist or belongs to
///   another owner,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn create_transaction(
    owner_id: &OwnerId,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(new_transaction.amount));
    }

    validate_category_owner(new_transaction.category_id, owner_id, connection)?;

    connection
        .prepare(
            "INSERT INTO \"transaction\"
                (owner_id, amount, kind, category_id, date, description, receipt_url, rule_id,
                 created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?8)
                RETURNING *",
        )?
        .query_row(
            (
                owner_id.as_ref(),
                new_transaction.amount,
                new_transaction.kind.as_str(),
                new_transaction.category_id,
                new_transaction.date,
                &new_transaction.description,
                &new_transaction.receipt_url,
                OffsetDateTime::now_utc(),
            ),
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve one of `owner_id`'s transactions from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no transaction with `id` belonging to
///   `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn get_transaction(
    id: TransactionId,
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare("SELECT * FROM \"transaction\" WHERE id = :id AND owner_id = :owner_id")?
        .query_one(
            named_params! {":id": id, ":owner_id": owner_id.as_ref()},
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Query for `owner_id`'s transactions in the database.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is a SQL error.
pub fn get_transactions(
    owner_id: &OwnerId,
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut query_string_parts = vec!["SELECT * FROM \"transaction\"".to_string()];
    let mut where_clause_parts = vec!["owner_id = ?1".to_string()];
    let mut query_parameters = vec![Value::Text(owner_id.as_ref().to_string())];

    if let Some(date_range) = &query.date_range {
        where_clause_parts.push(format!(
            "date BETWEEN ?{} AND ?{}",
            query_parameters.len() + 1,
            query_parameters.len() + 2,
        ));
        query_parameters.push(Value::Text(date_range.start.to_string()));
        query_parameters.push(Value::Text(date_range.end.to_string()));
    }

    if let Some(kind) = query.kind {
        where_clause_parts.push(format!("kind = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Text(kind.as_str().to_string()));
    }

    if let Some(category_id) = query.category_id {
        where_clause_parts.push(format!("category_id = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Integer(category_id));
    }

    query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));

    // Ties on the same date keep a stable order.
    match query.order {
        SortOrder::Ascending => query_string_parts.push("ORDER BY date ASC, id ASC".to_string()),
        SortOrder::Descending => query_string_parts.push("ORDER BY date DESC, id ASC".to_string()),
    }

    if let Some(limit) = query.limit {
        query_string_parts.push(format!("LIMIT {limit}"));
    }

    let query_string = query_string_parts.join(" ");
    let params = params_from_iter(query_parameters.iter());

    connection
        .prepare(&query_string)?
        .query_map(params, map_transaction_row)?
        .map(|result| result.map_err(|error| error.into()))
        .collect()
}

/// Apply a partial update to one of `owner_id`'s transactions and return the
/// updated transaction. Patch fields left as `None` keep their stored value.
///
/// The modification timestamp is bumped whenever the row matches, even for an
/// empty patch.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the patch contains a zero or negative
///   amount,
/// - [Error::InvalidCategory] if the patch moves the transaction to a
///   category that does not exist or belongs to another owner,
/// - [Error::UpdateMissingTransaction] if there is no transaction with `id`
///   belonging to `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn update_transaction(
    id: TransactionId,
    owner_id: &OwnerId,
    patch: TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if let Some(amount) = patch.amount {
        if amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }
    }

    if let Some(category_id) = patch.category_id {
        validate_category_owner(category_id, owner_id, connection)?;
    }

    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
            SET amount = COALESCE(?1, amount),
                kind = COALESCE(?2, kind),
                category_id = COALESCE(?3, category_id),
                date = COALESCE(?4, date),
                description = COALESCE(?5, description),
                receipt_url = COALESCE(?6, receipt_url),
                updated_at = ?7
            WHERE id = ?8 AND owner_id = ?9",
        (
            patch.amount,
            patch.kind.map(|kind| kind.as_str()),
            patch.category_id,
            patch.date,
            &patch.description,
            &patch.receipt_url,
            OffsetDateTime::now_utc(),
            id,
            owner_id.as_ref(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    get_transaction(id, owner_id, connection)
}

/// Delete one of `owner_id`'s transactions from the database.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if there is no transaction with `id`
///   belonging to `owner_id`,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn delete_transaction(
    id: TransactionId,
    owner_id: &OwnerId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND owner_id = ?2",
        (id, owner_id.as_ref()),
    )?;

    if rows_affected == 0 {
        Err(Error::DeleteMissingTransaction)
    } else {
        Ok(())
    }
}

/// Create the transaction table in the database.
pub(crate) fn create_transaction_table(connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                receipt_url TEXT,
                rule_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        (),
    )?;

    // Ensure the table's row ids start at one.
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // One occurrence of a rule lands at most once. Manual transactions carry
    // a NULL rule_id, which SQLite treats as distinct, so they are not
    // constrained.
    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_transaction_provenance
            ON \"transaction\" (rule_id, date)",
        (),
    )?;

    // List and summary queries scan one owner's rows by date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_owner_date
            ON \"transaction\" (owner_id, date)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let kind: TransactionKind = row.get::<_, String>(3)?.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        owner_id: OwnerId::new(&row.get::<_, String>(1)?),
        amount: row.get(2)?,
        kind,
        category_id: row.get(4)?,
        date: row.get(5)?,
        description: row.get(6)?,
        receipt_url: row.get(7)?,
        rule_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
