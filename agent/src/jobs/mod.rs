//! Job tracking and single-flight scheduling

pub mod job;
pub mod registry;

pub use job::{Job, JobKind, JobState, JobView};
pub use registry::{Busy, JobRegistry};
