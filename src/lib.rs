pub mod accumulator;
pub mod job;
pub mod models;
pub mod processing;
pub mod utils;
pub mod validation;

pub use job::{CancelHandle, ExtractionJob, JobSummary, PageSource, TextDirSource};
