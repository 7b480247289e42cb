//! Input helpers: CSV ingest, time parsing and column selection.

pub mod ingest;

pub use ingest::*;
