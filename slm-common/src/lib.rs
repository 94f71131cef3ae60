//! # Shopping List Manager Common Library
//!
//! Shared code for the shopping list manager crates:
//! - Product data model (scan codes, product records, placeholders)
//! - Fixed product category ordering
//! - Bootstrap configuration loading
//! - Common error type

pub mod categories;
pub mod config;
pub mod error;
pub mod model;

pub use categories::{CategoryOrdering, ProductCategory};
pub use error::{Error, Result};
pub use model::{ProductRecord, ScanCode};
