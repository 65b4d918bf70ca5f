pub mod importer;
pub mod normalizer;

pub use importer::{ImportCoordinator, ImportError, ImportReport};
pub use normalizer::{CsvNormalizer, NormalizeError, infer_range_ends};
