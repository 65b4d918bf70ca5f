use serde::{Deserialize, Serialize};

/// Explanation recorded for years in which no filing status owed income tax.
pub const DEFAULT_NO_INCOME_TAX_MESSAGE: &str = "No income tax for this year. Tax rates were made \
unconstitutional by the Supreme Court in 1895. The income tax was reinstated in 1913 with the \
ratification of the 16th Amendment to the Constitution. However, this entity is used to represent \
years where no income tax was applicable due to historical legal rulings.";

/// Marker for a year with no applicable bracket data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoIncomeTaxYear {
    pub year: i32,
    pub message: String,
}

impl NoIncomeTaxYear {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            message: DEFAULT_NO_INCOME_TAX_MESSAGE.to_string(),
        }
    }

    /// Message used when a marker exists but could not be read back.
    pub fn fallback_message(year: i32) -> String {
        format!("No income tax for year {year}")
    }
}
