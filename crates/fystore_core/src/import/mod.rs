//! Bulk import of externally sourced spreadsheet rows.
//!
//! # Responsibility
//! - Map loosely typed source rows onto `TableRow` (`normalizer`).
//! - Save normalized batches through the table collection (`bulk`).

pub mod bulk;
pub mod normalizer;
