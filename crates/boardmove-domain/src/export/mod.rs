//! Board import/export envelope.
//!
//! The envelope is the JSON document handed from extraction to migration:
//! `{version, exportDate, board}` plus optional bookkeeping fields.

pub mod exporter;
pub mod importer;
pub mod models;

pub use exporter::BoardExporter;
pub use importer::BoardImporter;
pub use models::BoardExport;
