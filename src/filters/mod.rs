pub mod employee;

use chrono::NaiveDate;

use crate::errors::FieldErrors;

pub const INVALID_DATE: &str = "Enter a valid date.";

/// Parses an optional ISO date query value. Empty values count as absent; a
/// malformed value is recorded against `param` in `errors`.
pub fn parse_date_param(
    param: &str,
    value: Option<&str>,
    errors: &mut FieldErrors,
) -> Option<NaiveDate> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(param, INVALID_DATE);
            None
        }
    }
}

/// Non-empty text query value.
pub fn text_param(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
