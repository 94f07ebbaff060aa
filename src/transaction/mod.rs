//! Transaction management: the ledger rows that record money moving in or
//! out, whether entered by hand or materialized from a recurring rule.

mod core;

pub(crate) use core::create_transaction_table;
pub use core::{
    NewTransaction, SortOrder, Transaction, TransactionKind, TransactionPatch, TransactionQuery,
    create_transaction, delete_transaction, get_transaction, get_transactions, update_transaction,
};
