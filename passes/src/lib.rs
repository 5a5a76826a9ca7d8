//! Rewrite passes over tessera modules.
//!
//! Passes implement [`ModulePass`] and are driven by a host pipeline. Each
//! pass reports whether it changed the module; ordinary "nothing to do"
//! outcomes are never errors.
//!
//! # Module Organization
//!
//! - [`pass`] - The [`ModulePass`] seam
//! - [`reduce_scatter`] - Fuses an all-reduce followed by a per-participant
//!   dynamic-slice into a single reduce-scatter
//! - [`error`] - Error types and result handling

pub mod error;
pub mod pass;
pub mod reduce_scatter;


pub use error::{PassError, Result};
pub use pass::ModulePass;
pub use reduce_scatter::{MatchOptions, ReduceScatterCreator, ReduceScatterMatch, match_reduce_scatter};
