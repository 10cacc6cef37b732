// file: src/scan/date.rs
// description: parsing of the --after-date cutoff in absolute and relative forms
// reference: https://docs.rs/chrono

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RELATIVE_DATE: Regex =
        Regex::new(r"^(\d+)\s+(minute|hour|day|week|month|year)s?\s+ago$")
            .expect("RELATIVE_DATE regex is valid");
}

/// Parses a date description relative to `now`. Accepted forms:
/// `2024-05-01`, `2024-05-01 13:45`, `2024-05-01 13:45:10`, RFC 3339,
/// `today`, `yesterday` and `N <unit>s ago`.
pub fn parse_after_date(input: &str, now: DateTime<Local>) -> Result<DateTime<Local>, String> {
    let text = input.trim().to_lowercase();

    match text.as_str() {
        "today" => return start_of_day(now.date_naive()),
        "yesterday" => {
            let day = now
                .date_naive()
                .pred_opt()
                .ok_or_else(|| format!("date out of range: \"{}\"", input))?;
            return start_of_day(day);
        }
        _ => {}
    }

    if let Some(captures) = RELATIVE_DATE.captures(&text) {
        let amount: i64 = captures[1]
            .parse()
            .map_err(|_| format!("number too large in \"{}\"", input))?;
        let delta = match &captures[2] {
            "minute" => TimeDelta::try_minutes(amount),
            "hour" => TimeDelta::try_hours(amount),
            "day" => TimeDelta::try_days(amount),
            "week" => TimeDelta::try_weeks(amount),
            "month" => amount.checked_mul(30).and_then(TimeDelta::try_days),
            _ => amount.checked_mul(365).and_then(TimeDelta::try_days),
        };
        return delta
            .and_then(|d| now.checked_sub_signed(d))
            .ok_or_else(|| format!("date out of range: \"{}\"", input));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input.trim()) {
        return Ok(parsed.with_timezone(&Local));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, format) {
            return local(naive, input);
        }
    }

    if let Ok(day) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return start_of_day(day);
    }

    Err(format!("unrecognized date \"{}\"", input))
}

fn start_of_day(day: NaiveDate) -> Result<DateTime<Local>, String> {
    let naive = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid day {}", day))?;
    local(naive, &day.to_string())
}

fn local(naive: NaiveDateTime, input: &str) -> Result<DateTime<Local>, String> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("time does not exist in the local time zone: \"{}\"", input))
}
