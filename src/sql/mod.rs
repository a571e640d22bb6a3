//! SQL text generation for user databases.
//!
//! - [`ident`] - identifier validation; the only gate between user input and
//!   SQL text
//! - [`select`] - single-table SELECT / COUNT builder

pub mod ident;
pub mod select;

#[cfg(test)]
pub mod test_utils;

pub use ident::{validate_identifier, Ident};
pub use select::{OrderBy, Select, SortDir};
