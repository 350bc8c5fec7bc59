//! squash-backup library exports.
//!
//! Every module is public so integration tests can drive the workflow
//! without the binary.

pub mod backup;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod excludes;
pub mod preflight;
pub mod process;
pub mod runner;
pub mod targets;
pub mod timing;
pub mod verify;
