//! Stable exit codes for grader CLI commands.

/// Candidate passed, or the command (validate, sample, format, init) succeeded.
pub const OK: i32 = 0;
/// Invalid input: unreadable or malformed question, config, type or text.
pub const INVALID: i32 = 1;
/// Candidate ran but produced a wrong answer.
pub const FAIL: i32 = 2;
/// Candidate could not be evaluated: compile, resolution or runtime error.
pub const ERROR: i32 = 3;
