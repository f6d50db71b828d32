//! Code-grading harness core.
//!
//! A candidate's source is compiled into a unit, the callable named by a
//! question's function config is resolved by signature, and every stored
//! test case is decoded, run and compared structurally. The crate keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (type descriptors, structural
//!   values, codec, listy text, verdicts). No I/O.
//! - **[`io`]**: Side-effecting operations (config files, question files,
//!   subprocess compiler/loader).
//!
//! [`engine`] ties the two together behind the [`engine::Loader`] and
//! [`engine::Unit`] traits.

pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
