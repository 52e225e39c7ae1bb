//! Beta environment admin agent
//!
//! A small internal HTTP service exposing two destructive operations for the
//! Beta deployment environment: redeploying the application from a git
//! branch, and resetting the e2e database to its baseline. Both run
//! asynchronously under a single shared lock and are polled by job id.

pub mod config;
pub mod database;
pub mod deploy;
pub mod errors;
pub mod jobs;
pub mod logs;
pub mod runner;
pub mod server;
