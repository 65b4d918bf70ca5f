mod filing_status;
mod no_income_tax_year;
mod results;
mod tax_input;
mod tax_rate;

pub use filing_status::{FILING_STATUS_LABELS, FilingStatus};
pub use no_income_tax_year::{DEFAULT_NO_INCOME_TAX_MESSAGE, NoIncomeTaxYear};
pub use results::{
    BracketTax, HistoryPoint, Metric, MetricValue, RateTable, TaxBreakdown, TaxSummary,
    UnknownMetric,
};
pub use tax_input::{TaxInput, TaxInputError, parse_income};
pub use tax_rate::{BracketEntry, TaxRate, YearStatus};
