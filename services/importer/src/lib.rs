//! Protest export importer
//!
//! Loads a semicolon-delimited export of protest records into four tables
//! (clients, contracts, protests, guarantors). Clients and contracts are
//! found-or-created by business key; protests and guarantors are always
//! inserted. A bad row is skipped and reported, never fatal to the run.

pub mod amount;
pub mod config;
pub mod dates;
pub mod error;
pub mod import;
pub mod recorder;
pub mod resolver;
pub mod row;
pub mod source;
pub mod store;

pub use config::{DbConfig, ImportOptions};
pub use error::{ImportError, RowError};
pub use import::{run, ImportSummary, Importer, RowFailure};
pub use resolver::EntityResolver;
pub use store::Store;
