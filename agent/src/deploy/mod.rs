//! Branch deployment

pub mod compose;
pub mod git;
pub mod procedure;

pub use procedure::run;
