//! Post-graduation outcomes dataset builder.
//!
//! Merges yearly graduation, ready-graduate, ACT and college-going feeds
//! into one record per high school, then derives the Flight Score, county
//! rankings, top improvers and statewide averages.

pub mod aggregate;
pub mod assemble;
pub mod county;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod registry;
pub mod score;
pub mod source;

pub use assemble::OutputDocument;
pub use error::{PipelineError, Result};
pub use models::Config;
pub use pipeline::{Pipeline, PipelineRun, PipelineSources, YearlySource};
pub use registry::SchoolRegistry;
pub use source::{CsvSource, Table, TabularSource};
