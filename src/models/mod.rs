pub mod config;
pub mod data;

pub use config::{FieldLayout, JobConfig, MatcherConfig};
pub use data::{
    Gender, IdentifierMatch, JobState, JobStatus, PageProgress, PageStats, RawFieldSet,
    RawPageText, RejectReason, Rejection, SkippedPage, VoterRecord,
};
