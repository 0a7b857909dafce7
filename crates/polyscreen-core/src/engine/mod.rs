//! # Engine Module
//!
//! The machinery behind a screening session: everything between "here is a
//! monomer catalog" and "here is a property record for one composition".
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Session parameters, solvent allow-list, selection mode
//! - **Enumeration** ([`enumerate`]) - Exhaustive and sampled walks over the composition space
//! - **Work-Log** ([`worklog`]) - Shared, persisted deduplication ledger with an atomic claim
//! - **Execution** ([`executor`]) - The seam through which every external engine is invoked
//! - **Transcripts** ([`transcript`]) - Marker and tail-window extraction of numeric results
//! - **Working Directories** ([`workdir`]) - Per-composition artifact scope with guaranteed cleanup
//! - **Runner** ([`runner`]) - Strictly ordered pipeline stages for one composition
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Stage, pipeline and session-level error types

pub mod config;
pub mod enumerate;
pub mod error;
pub mod executor;
pub mod progress;
pub mod runner;
pub(crate) mod tasks;
pub mod transcript;
pub mod workdir;
pub mod worklog;
