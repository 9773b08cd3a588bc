//! # Pulse Core
//!
//! Canonical data structures and pure analytics for Uni Pulse.
//!
//! Provider records of different shapes are normalized into one [`Position`]
//! model, reduced into a [`PortfolioSummary`], and annotated with the
//! degradation state decided by the [`fallback`] policy. Nothing in this crate
//! performs I/O.

pub mod address;
pub mod aggregate;
pub mod error;
pub mod fallback;
pub mod models;
pub mod normalize;

pub use address::*;
pub use aggregate::*;
pub use error::*;
pub use fallback::*;
pub use models::*;
pub use normalize::*;
