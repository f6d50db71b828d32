//! Side-effecting pieces of the grader: config, subprocesses, question files.

pub mod config;
pub mod loader;
pub mod process;
pub mod question;
