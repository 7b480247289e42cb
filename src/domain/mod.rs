//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fit selection enums (`Metric`, `FitForm`)
//! - raw and normalized observations (`ObservationRow`, `Observation`)
//! - fit outputs (`FitResult`, `ExtrapolationLine`, `Prediction`)
//! - the resolved run configuration (`FitConfig`)

pub mod types;

pub use types::*;
