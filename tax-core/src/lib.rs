pub mod calculations;
pub mod config;
pub mod db;
pub mod models;
pub mod parse;
pub mod service;

pub use config::YearRange;
pub use db::repository::{RepositoryError, TaxRepository};
pub use models::*;
pub use service::{TaxService, TaxServiceError};
