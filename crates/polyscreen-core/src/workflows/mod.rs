//! # Workflows Module
//!
//! Top-level entry points of the library. A [`session::Session`] owns the
//! validated configuration and the engine executor; the workflows drive the
//! engine components to either evaluate one composition or screen a whole
//! composition space.
//!
//! - **Session** ([`session`]) - Session directory, output locations, engine access
//! - **Evaluation** ([`evaluate`]) - Full pipeline for one hand-picked composition
//! - **Screening** ([`screen`]) - Enumeration, deduplicated parallel dispatch, aggregation and sorting

pub mod evaluate;
pub mod screen;
pub mod session;
