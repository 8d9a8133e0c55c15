#![forbid(unsafe_code)]

//! SQLite persistence for motions: the version ledger, the commit protocol,
//! supporter and submitter sets, numbered polls, categories and comments.

mod store;

pub use store::*;
