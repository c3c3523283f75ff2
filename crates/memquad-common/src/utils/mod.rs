//! Utility functions and helpers.

pub mod error;
pub mod hash;
