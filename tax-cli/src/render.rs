//! Plain-text rendering of service results for the terminal.
//!
//! Currency is shown as `$1,234.56` and rates as percentages with at most
//! two decimal places (`13.5%`). Calculated amounts arrive exact and are
//! rounded to cents only here.
use rust_decimal::Decimal;
use tax_core::calculations::common::round_half_up;
use tax_core::{
    FilingStatus, HistoryPoint, RateTable, TaxBreakdown, TaxInput, TaxSummary,
};

pub fn format_currency(amount: Decimal) -> String {
    let rounded = round_half_up(amount);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

pub fn format_percent(rate: Decimal) -> String {
    let percent = (rate * Decimal::ONE_HUNDRED).round_dp(2).normalize();
    format!("{percent}%")
}

fn format_range_end(end: Option<Decimal>) -> String {
    end.map(format_currency).unwrap_or_else(|| "and up".to_string())
}

pub fn render_breakdown(
    input: &TaxInput,
    breakdown: &TaxBreakdown,
) -> String {
    let status = input.status.map(|s| s.label()).unwrap_or("-");
    let mut out = format!(
        "{} {} on {}\n",
        input.year,
        status,
        format_currency(input.income)
    );

    if let Some(message) = &breakdown.message {
        out.push_str(message);
        out.push('\n');
        return out;
    }

    for bracket in &breakdown.brackets {
        out.push_str(&format!(
            "  {:>8}  {:>16} - {:<16} {:>14}\n",
            format_percent(bracket.rate),
            format_currency(bracket.range_start),
            format_currency(bracket.range_end),
            format_currency(bracket.tax_paid),
        ));
    }
    out.push_str(&format!(
        "Total tax:    {}\n",
        format_currency(breakdown.total_tax_paid)
    ));
    out.push_str(&format!(
        "Average rate: {}\n",
        format_percent(breakdown.average_rate)
    ));
    out
}

pub fn render_bulk(
    inputs: &[TaxInput],
    breakdowns: &[TaxBreakdown],
) -> String {
    inputs
        .iter()
        .zip(breakdowns)
        .map(|(input, breakdown)| render_breakdown(input, breakdown))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_summary(summary: &TaxSummary) -> String {
    let mut out = format!("{} {}\n", summary.year, summary.status.label());
    if let Some(message) = &summary.message {
        out.push_str(message);
        out.push('\n');
    }
    out.push_str(&format!(
        "Brackets:      {}\nMin threshold: {}\nMax threshold: {}\nAverage rate:  {}\n",
        summary.bracket_count,
        format_currency(summary.min_threshold),
        format_currency(summary.max_threshold),
        summary.average_rate,
    ));
    out
}

pub fn render_history(points: &[HistoryPoint]) -> String {
    if points.is_empty() {
        return "No data in the requested range\n".to_string();
    }
    points
        .iter()
        .map(|point| {
            let value = point.value.to_string();
            match &point.message {
                Some(message) => format!("{}  {value:>14}  {message}\n", point.year),
                None => format!("{}  {value:>14}\n", point.year),
            }
        })
        .collect()
}

pub fn render_rates(table: &RateTable) -> String {
    if let Some(message) = &table.message {
        return format!("{}: {message}\n", table.year);
    }
    if table.rates.is_empty() {
        return format!("No rates stored for {}\n", table.year);
    }
    table
        .rates
        .iter()
        .map(|rate| {
            format!(
                "{} {:<4} {:>8}  {:>16} - {}\n",
                rate.year,
                rate.status.as_str(),
                format_percent(rate.rate),
                format_currency(rate.range_start),
                format_range_end(rate.range_end),
            )
        })
        .collect()
}

pub fn render_years(years: &[i32]) -> String {
    years.iter().map(|year| format!("{year}\n")).collect()
}

pub fn render_statuses(statuses: &[(FilingStatus, &str, &str)]) -> String {
    statuses
        .iter()
        .map(|(_, code, label)| format!("{code:<4} {label}\n"))
        .collect()
}
