//! # Polyscreen Core Library
//!
//! A high-throughput screening engine for co-polymer compositions. Candidate
//! compositions are enumerated from a monomer catalog, deduplicated under sequence
//! reversal, and pushed through a pipeline of external structure and
//! electronic-structure calculations, one isolated working directory per composition.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Foundation.** Plain data models (`Composition`, `MonomerCatalog`,
//!   `PropertyRecord`) and the text formats they are read from and written to.
//!
//! - **[`engine`]: The Logic Core.** Enumeration of the composition space, the shared
//!   work-log used for deduplication, working-directory handles, external process
//!   execution, transcript parsing, and the individual pipeline stages.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together into complete
//!   procedures: evaluating a single composition and screening a whole catalog in
//!   parallel with deterministic result aggregation.

pub mod core;
pub mod engine;
pub mod workflows;
