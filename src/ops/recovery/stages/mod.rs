//! The three stages of a recovery run.

pub mod collection;
pub mod metadata;
pub mod processing;
