//! Fee receipts for the households of a school roster.
//!
//! The price workbook gives the school fee per child rank and the membership fee, the
//! roster lists one child per row. Rows are grouped by household and every household
//! gets a `.docx` receipt filled from a template.

pub mod config;
pub mod error;
pub mod fees;
pub mod generator;
pub mod money;
pub mod prices;
pub mod receipt;
pub mod roster;
pub mod template;
pub mod words;
pub mod workbook;

pub use config::Config;
pub use error::LoadError;
pub use generator::{ErrorRecord, Outcome, Report, generate};
