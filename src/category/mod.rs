//! Category management for organizing transactions and recurring rules.

mod db;
mod domain;

pub(crate) use db::{create_category_table, list_categories, validate_category_owner};
pub use db::{
    count_transactions_for_category, create_category, delete_category, get_categories,
    get_category, update_category,
};
pub use domain::{Category, CategoryIcon, CategoryName, CategoryPatch, NewCategory};
