use chrono::{Months, NaiveDate};

/// Same calendar date one year earlier, clamped to the end of the month
/// (2024-02-29 -> 2023-02-28).
pub fn one_year_before(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(12))
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// ISO `YYYY-MM-DD` rendering used for pivot column labels.
pub fn format_period(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn max_date<I>(dates: I) -> Option<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    dates.into_iter().max()
}
