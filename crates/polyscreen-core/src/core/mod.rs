//! # Core Module
//!
//! Stateless data models and file formats shared by the engine and workflows.
//!
//! - **Data Model** ([`models`]) - Compositions, the monomer catalog, and property records
//! - **File I/O** ([`io`]) - Monomer list input, the screening report, and the error log

pub mod io;
pub mod models;
