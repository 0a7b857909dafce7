//! Provides input/output functionality for the text formats used by a session.
//!
//! Monomer lists are whitespace-delimited two-column files; screening results and
//! failures are tab-separated logs that are appended to while workers run.

pub mod monomers;
pub mod report;
