//! Monthly summaries, category breakdowns and income/expense trends.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;
use time::Month;

use crate::{
    Error,
    calendar::{month_bounds, previous_month},
    category::{Category, list_categories},
    database_id::CategoryId,
    owner::OwnerId,
    transaction::{TransactionKind, TransactionQuery, get_transactions},
};

/// Totals and month-over-month changes for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    /// Sum of the month's income amounts.
    pub total_income: f64,
    /// Sum of the month's expense amounts.
    pub total_expense: f64,
    /// Income minus expenses.
    pub balance: f64,
    /// Relative change in income versus the previous month, in percent.
    /// Zero when the previous month had no income.
    pub income_change: f64,
    /// Relative change in expenses versus the previous month, in percent.
    /// Zero when the previous month had no expenses.
    pub expense_change: f64,
    /// How many transactions the month had, both kinds counted.
    pub transaction_count: usize,
}

/// One category's share of a month's income or spending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    /// The category the transactions belong to.
    pub category: Category,
    /// Sum of the category's transaction amounts in the month.
    pub total_amount: f64,
    /// How many of the month's transactions fell in the category.
    pub transaction_count: usize,
    /// The category's share of the month's same-kind total, in percent.
    pub percentage: f64,
}

/// Income and expense totals for one month of a trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Three-letter month label, e.g. "Mar".
    pub month: String,
    /// Sum of the month's income amounts.
    pub income: f64,
    /// Sum of the month's expense amounts.
    pub expense: f64,
}

/// Summarize one calendar month of `owner_id`'s transactions.
///
/// # Errors
/// Returns an [Error::SqlError] if the month's transactions cannot be read.
pub fn monthly_stats(
    owner_id: &OwnerId,
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<MonthlyStats, Error> {
    let current = sum_window(owner_id, year, month, connection)?;
    let (last_year, last_month) = previous_month(year, month);
    let previous = sum_window(owner_id, last_year, last_month, connection)?;

    Ok(MonthlyStats {
        total_income: current.income,
        total_expense: current.expense,
        balance: current.income - current.expense,
        income_change: percent_change(current.income, previous.income),
        expense_change: percent_change(current.expense, previous.expense),
        transaction_count: current.count,
    })
}

/// Break one month of `owner_id`'s income or spending down by category,
/// largest share first.
///
/// Transactions whose category has since been deleted get no entry of their
/// own, but their amounts still count towards the total the shares are
/// measured against.
///
/// # Errors
/// Returns an [Error::SqlError] if the transactions or categories cannot be
/// read.
pub fn category_breakdown(
    owner_id: &OwnerId,
    year: i32,
    month: Month,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Vec<CategorySpending>, Error> {
    let transactions = get_transactions(
        owner_id,
        &TransactionQuery {
            date_range: Some(month_bounds(year, month)),
            kind: Some(kind),
            ..Default::default()
        },
        connection,
    )?;
    let categories = list_categories(owner_id, connection)?;

    let mut totals: HashMap<CategoryId, (f64, usize)> = HashMap::new();
    for transaction in &transactions {
        let entry = totals.entry(transaction.category_id).or_insert((0.0, 0));
        entry.0 += transaction.amount;
        entry.1 += 1;
    }

    let kind_total: f64 = totals.values().map(|(amount, _)| *amount).sum();

    let mut breakdown: Vec<CategorySpending> = categories
        .into_iter()
        .filter_map(|category| {
            let (total_amount, transaction_count) = totals.get(&category.id).copied()?;

            Some(CategorySpending {
                percentage: if kind_total > 0.0 {
                    (total_amount / kind_total) * 100.0
                } else {
                    0.0
                },
                category,
                total_amount,
                transaction_count,
            })
        })
        .collect();

    // Largest share first; ties keep category id order.
    breakdown.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then(a.category.id.cmp(&b.category.id))
    });

    Ok(breakdown)
}

/// Income and expense totals for the `months_back` calendar months ending at
/// the given month, oldest first. Months with no transactions report zero.
///
/// # Errors
/// Returns an [Error::SqlError] if a month's transactions cannot be read.
pub fn monthly_trend(
    owner_id: &OwnerId,
    year: i32,
    month: Month,
    months_back: usize,
    connection: &Connection,
) -> Result<Vec<TrendPoint>, Error> {
    let mut points = Vec::with_capacity(months_back);
    let (mut cursor_year, mut cursor_month) = (year, month);

    for _ in 0..months_back {
        let totals = sum_window(owner_id, cursor_year, cursor_month, connection)?;

        points.push(TrendPoint {
            month: month_abbrev(cursor_month).to_string(),
            income: totals.income,
            expense: totals.expense,
        });

        (cursor_year, cursor_month) = previous_month(cursor_year, cursor_month);
    }

    points.reverse();

    Ok(points)
}

#[derive(Debug, Default)]
struct WindowTotals {
    income: f64,
    expense: f64,
    count: usize,
}

fn sum_window(
    owner_id: &OwnerId,
    year: i32,
    month: Month,
    connection: &Connection,
) -> Result<WindowTotals, Error> {
    let transactions = get_transactions(
        owner_id,
        &TransactionQuery {
            date_range: Some(month_bounds(year, month)),
            ..Default::default()
        },
        connection,
    )?;

    let mut totals = WindowTotals {
        count: transactions.len(),
        ..Default::default()
    };

    for transaction in &transactions {
        match transaction.kind {
            TransactionKind::Income => totals.income += transaction.amount,
            TransactionKind::Expense => totals.expense += transaction.amount,
        }
    }

    Ok(totals)
}

/// The relative change from `previous` to `current` as a percentage.
///
/// A month with nothing to compare against reports zero change rather than an
/// undefined one.
fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        ((current - previous) / previous) * 100.0
    } else {
        0.0
    }
}

fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}
