//! Date-range validation shared by the pageview clients
//!
//! Both clients accept an optional first/last pair with the same rules:
//! a first date without a last date collapses to a single day, a last
//! date without a first date is rejected, and an empty range defaults
//! to today.

use crate::errors::{Result, WikinowError};
use chrono::{Local, NaiveDate};

/// Input formats accepted for first/last dates, tried in order
const INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse one date in any of the accepted input formats
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    for format in INPUT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }

    Err(WikinowError::invalid_argument(format!(
        "date '{}' could not be parsed",
        value
    )))
}

/// Resolve an optional first/last pair into a concrete date range
pub fn resolve_range(first: Option<&str>, last: Option<&str>) -> Result<(NaiveDate, NaiveDate)> {
    match (first, last) {
        (Some(first), last) => {
            let start = parse_date(first)?;
            // No end date collapses the range to the start day
            let end = match last {
                Some(last) => parse_date(last)?,
                None => start,
            };

            if start > end {
                return Err(WikinowError::invalid_argument(
                    "the start date is more recent than the last date",
                ));
            }

            Ok((start, end))
        }
        (None, Some(_)) => Err(WikinowError::invalid_argument(
            "an end date requires a start date",
        )),
        (None, None) => {
            let today = Local::now().date_naive();
            Ok((today, today))
        }
    }
}
