//! Core domain entities
//!
//! Plain data records as they are persisted in the cache. No I/O here.

mod account;
mod balance;
mod transaction;
mod user;
pub mod result;

pub use account::Account;
pub use balance::Balance;
pub use transaction::Transaction;
pub use user::User;
