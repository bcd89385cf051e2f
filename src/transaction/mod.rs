//! Transactions: the model, its table, bulk insertion, and paginated search.

mod core;
mod search;

#[cfg(test)]
pub use core::create_transaction;
pub use core::{
    Transaction, TransactionBuilder, count_transactions, create_transaction_table,
    create_transactions,
};
pub(crate) use core::to_storage_timestamp;
pub use search::{search_transactions, search_transactions_endpoint};
