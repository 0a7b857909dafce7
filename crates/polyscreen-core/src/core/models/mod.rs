//! Data structures describing what is screened and what a screen produces.

pub mod catalog;
pub mod composition;
pub mod record;
