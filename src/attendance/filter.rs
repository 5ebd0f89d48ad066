use chrono::{Datelike, NaiveDate};

use crate::error::AppError;

/// Which attendance records a history, export or stats query covers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HistoryFilter {
    All,
    /// Exactly one calendar date.
    Date(NaiveDate),
    /// A month of any year, e.g. every March on record.
    Month(u32),
    MonthOfYear { year: i32, month: u32 },
    /// ISO-8601 week, Monday first.
    IsoWeek { year: i32, week: u32 },
}

impl HistoryFilter {
    /// Builds a filter from the raw `date`, `month` and `year` query values.
    pub fn from_query(
        date: Option<&str>,
        month: Option<&str>,
        year: Option<&str>,
    ) -> Result<Self, AppError> {
        if let Some(date) = date {
            return parse_date(date).map(HistoryFilter::Date);
        }

        let month = month
            .map(|m| {
                m.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| AppError::Validation("month must be between 1 and 12".into()))
            })
            .transpose()?;

        let year = year
            .map(|y| {
                y.trim()
                    .parse::<i32>()
                    .map_err(|_| AppError::Validation("year must be a number".into()))
            })
            .transpose()?;

        match (month, year) {
            (None, None) => Ok(HistoryFilter::All),
            (Some(month), None) => Ok(HistoryFilter::Month(month)),
            (Some(month), Some(year)) => Ok(HistoryFilter::MonthOfYear { year, month }),
            (None, Some(_)) => Err(AppError::Validation("year requires month".into())),
        }
    }

    pub fn week_of(date: NaiveDate) -> Self {
        let week = date.iso_week();
        HistoryFilter::IsoWeek {
            year: week.year(),
            week: week.week(),
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            HistoryFilter::All => true,
            HistoryFilter::Date(d) => date == d,
            HistoryFilter::Month(month) => date.month() == month,
            HistoryFilter::MonthOfYear { year, month } => {
                date.year() == year && date.month() == month
            }
            HistoryFilter::IsoWeek { year, week } => {
                let iso = date.iso_week();
                iso.year() == year && iso.week() == week
            }
        }
    }
}

/// Strict `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let well_formed = raw.len() == 10
        && raw
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });

    if !well_formed {
        return Err(AppError::Validation(
            "Invalid date format. Use YYYY-MM-DD".into(),
        ));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format. Use YYYY-MM-DD".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn month_alone_ignores_year() {
        let filter = HistoryFilter::from_query(None, Some("03"), None).unwrap();
        assert_eq!(filter, HistoryFilter::Month(3));
        assert!(filter.matches(d("2024-03-15")));
        assert!(filter.matches(d("2026-03-01")));
        assert!(!filter.matches(d("2026-04-01")));
    }

    #[test]
    fn month_and_year_pin_both() {
        let filter = HistoryFilter::from_query(None, Some("3"), Some("2026")).unwrap();
        assert!(filter.matches(d("2026-03-15")));
        assert!(!filter.matches(d("2025-03-15")));
    }

    #[test]
    fn date_wins_over_month() {
        let filter = HistoryFilter::from_query(Some("2026-03-02"), Some("4"), None).unwrap();
        assert_eq!(filter, HistoryFilter::Date(d("2026-03-02")));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(HistoryFilter::from_query(None, Some("13"), None).is_err());
        assert!(HistoryFilter::from_query(None, Some("x"), None).is_err());
        assert!(HistoryFilter::from_query(None, None, Some("2026")).is_err());
        assert!(HistoryFilter::from_query(Some("2026-3-2"), None, None).is_err());
        assert!(HistoryFilter::from_query(Some("2026-02-30"), None, None).is_err());
    }

    #[test]
    fn no_params_is_everything() {
        assert_eq!(
            HistoryFilter::from_query(None, None, None).unwrap(),
            HistoryFilter::All
        );
    }

    #[test]
    fn iso_week_spans_year_boundary() {
        // 2026-01-01 is a Thursday, so it belongs to 2026-W01 along with 2025-12-29.
        let filter = HistoryFilter::week_of(d("2026-01-01"));
        assert!(filter.matches(d("2025-12-29")));
        assert!(!filter.matches(d("2025-12-28")));
    }
}
