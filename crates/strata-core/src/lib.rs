//! # Strata Core
//!
//! Core types and error definitions for the Strata framework.
//! This crate provides the foundational abstractions shared by all
//! framework subsystems: the unified error type, the UTC clock value
//! type, and the application context.

pub mod clock;
pub mod context;
pub mod error;
pub mod result;

pub use clock::*;
pub use context::*;
pub use error::*;
pub use result::*;
