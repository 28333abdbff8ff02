//! Roster Core - record extraction from model-written markdown
//!
//! This crate provides the engine every role agent shares:
//! - Field and list extractors for `Label: value` lines
//! - Declarative record schemas with a default per field
//! - The section scanner that assembles `### Heading` records
//! - Scalar/section helpers and a markdown builder
//! - The command context and response contract

pub mod error;
pub mod fields;
pub mod markdown;
pub mod record;
pub mod response;
pub mod scanner;
pub mod schema;
pub mod sections;

pub use error::*;
pub use fields::*;
pub use markdown::*;
pub use record::{FieldValue, Record};
pub use response::*;
pub use scanner::*;
pub use schema::*;
pub use sections::*;

/// Token a record heading starts with
pub const HEADING_TOKEN: &str = "###";

/// Default for low/medium/high style choices
pub const DEFAULT_CHOICE: &str = "medium";
