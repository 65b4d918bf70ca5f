use chrono::{Datelike, Utc};

/// First year covered by the historical dataset.
pub const EARLIEST_SUPPORTED_YEAR: i32 = 1862;

/// Inclusive span of years that queries may ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(
        min: i32,
        max: i32,
    ) -> Self {
        Self { min, max }
    }

    /// From [`EARLIEST_SUPPORTED_YEAR`] through the last fully elapsed year.
    pub fn current() -> Self {
        Self::new(EARLIEST_SUPPORTED_YEAR, Utc::now().year() - 1)
    }

    pub fn contains(
        &self,
        year: i32,
    ) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_excludes_this_year() {
        let range = YearRange::current();

        assert_eq!(range.min, EARLIEST_SUPPORTED_YEAR);
        assert!(!range.contains(Utc::now().year()));
        assert!(range.contains(Utc::now().year() - 1));
    }

    #[test]
    fn contains_is_inclusive() {
        let range = YearRange::new(1862, 2024);

        assert!(range.contains(1862));
        assert!(range.contains(2024));
        assert!(!range.contains(1861));
        assert!(!range.contains(2025));
    }
}
