//! Tax calculation modules.
//!
//! Everything here is a pure function of the bracket rows passed in; data
//! access and request validation live in [`crate::service`].

pub mod aggregate;
pub mod common;
pub mod progressive;

pub use aggregate::{mean_rate, metric_value, summarize};
pub use progressive::{ProgressiveCalculator, ProgressiveTaxError};
