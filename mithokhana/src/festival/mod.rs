//! Festival calendar

use crate::error::{Error, Result};
use crate::store::{Festival, Store};
use chrono::{Datelike, Month};
use serde::{Deserialize, Serialize};

/// Festivals for the selected month (or all of them)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub festivals: Vec<Festival>,
    /// "January" through "December"
    pub months: Vec<String>,
    pub selected_month: Option<String>,
}

/// Parse a full English month name, case-insensitively. Abbreviations
/// such as "Oct" are rejected.
pub fn parse_month(name: &str) -> Result<Month> {
    let wanted = name.trim();
    months()
        .find(|m| m.name().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| Error::Validation(format!("Unknown month: {}", name)))
}

/// Month names in calendar order
pub fn month_names() -> Vec<String> {
    months().map(|m| m.name().to_string()).collect()
}

fn months() -> impl Iterator<Item = Month> {
    (1..=12u8).filter_map(|n| Month::try_from(n).ok())
}

/// Build the calendar view; `month` keeps only festivals dated in that month
pub fn festival_calendar(store: &Store, month: Option<&str>) -> Result<Calendar> {
    let mut festivals = store.list_festivals()?;

    let selected = match month.map(str::trim).filter(|m| !m.is_empty()) {
        Some(name) => {
            let month = parse_month(name)?;
            festivals.retain(|f| {
                f.date
                    .map(|d| d.month() == month.number_from_month())
                    .unwrap_or(false)
            });
            Some(month.name().to_string())
        }
        None => None,
    };

    Ok(Calendar {
        festivals,
        months: month_names(),
        selected_month: selected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn store() -> Store {
        let store = Store::open_memory().unwrap();
        store
            .add_festival("Dashain", NaiveDate::from_ymd_opt(2025, 10, 2), "")
            .unwrap();
        store
            .add_festival("Tihar", NaiveDate::from_ymd_opt(2025, 10, 20), "")
            .unwrap();
        store
            .add_festival("Maghe Sankranti", NaiveDate::from_ymd_opt(2026, 1, 14), "")
            .unwrap();
        store.add_festival("Local fair", None, "").unwrap();
        store
    }

    #[test]
    fn test_month_names() {
        let months = month_names();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], "January");
        assert_eq!(months[11], "December");
    }

    #[test]
    fn test_all_festivals_without_month() {
        let calendar = festival_calendar(&store(), None).unwrap();
        assert_eq!(calendar.festivals.len(), 4);
        assert_eq!(calendar.selected_month, None);

        let calendar = festival_calendar(&store(), Some("")).unwrap();
        assert_eq!(calendar.festivals.len(), 4);
    }

    #[test]
    fn test_filter_by_month() {
        let calendar = festival_calendar(&store(), Some("october")).unwrap();
        let names: Vec<&str> = calendar.festivals.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Dashain", "Tihar"]);
        assert_eq!(calendar.selected_month.as_deref(), Some("October"));

        let calendar = festival_calendar(&store(), Some("March")).unwrap();
        assert!(calendar.festivals.is_empty());
    }

    #[test]
    fn test_unknown_month() {
        assert!(matches!(
            festival_calendar(&store(), Some("Smarch")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_parse_month_needs_full_name() {
        assert_eq!(parse_month(" OCTOBER ").unwrap(), Month::October);
        assert_eq!(parse_month("january").unwrap(), Month::January);
        for short in ["oct", "Jan", "sept"] {
            assert!(matches!(parse_month(short), Err(Error::Validation(_))));
        }
    }
}
