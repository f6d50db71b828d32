//! Deterministic, pure logic shared by the grader.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod listy;
pub mod signature;
pub mod validation;
pub mod value;
pub mod verdict;
