//! Collection services consumed by request handlers.
//!
//! # Responsibility
//! - Expose collection-level operations (get/save/backups/restore/purge).
//! - Keep callers decoupled from storage details.

pub mod entry_collection;
pub mod record_collection;
