use chrono::{Datelike, NaiveDate};

/// UK Tax Year (runs 6 April to 5 April)
/// The year value represents the end year (e.g., 2025 = 2024/25 tax year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Parse a tax year key such as "24/25" or "2024/25"
    ///
    /// The two components must name consecutive years. Returns `None` for
    /// anything else.
    pub fn parse(s: &str) -> Option<TaxYear> {
        let (start, end) = s.split_once('/')?;
        let start: i32 = start.parse().ok()?;
        let end: i32 = end.parse().ok()?;
        // Short keys are anchored to the 2000s, matching rulesets keyed "YY/YY"
        let start = if start < 100 { start + 2000 } else { start };
        if end == start + 1 || end == (start + 1) % 100 {
            Some(TaxYear(start + 1))
        } else {
            None
        }
    }

    /// Create a tax year from a date
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        // Tax year starts 6 April
        // If date is 6 April or later, it's in the tax year ending next April
        // If date is before 6 April, it's in the current tax year ending this April
        if date >= NaiveDate::from_ymd_opt(year, 4, 6).unwrap() {
            TaxYear(year + 1)
        } else {
            TaxYear(year)
        }
    }

    /// Start date of the tax year (6 April of previous year)
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 - 1, 4, 6).unwrap()
    }

    /// End date of the tax year (5 April)
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 4, 5).unwrap()
    }

    /// Display as "2024/25" format
    pub fn display(&self) -> String {
        format!("{}/{:02}", self.0 - 1, self.0 % 100)
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_short_key() {
        assert_eq!(TaxYear::parse("24/25"), Some(TaxYear(2025)));
        assert_eq!(TaxYear::parse("23/24"), Some(TaxYear(2024)));
    }

    #[test]
    fn parse_full_key() {
        assert_eq!(TaxYear::parse("2024/25"), Some(TaxYear(2025)));
        assert_eq!(TaxYear::parse("2024/2025"), Some(TaxYear(2025)));
    }

    #[test]
    fn parse_century_wrap() {
        assert_eq!(TaxYear::parse("99/00"), Some(TaxYear(2100)));
    }

    #[test]
    fn parse_rejects_non_consecutive_years() {
        assert_eq!(TaxYear::parse("24/26"), None);
        assert_eq!(TaxYear::parse("24/24"), None);
        assert_eq!(TaxYear::parse("25/24"), None);
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert_eq!(TaxYear::parse(""), None);
        assert_eq!(TaxYear::parse("2425"), None);
        assert_eq!(TaxYear::parse("24-25"), None);
        assert_eq!(TaxYear::parse("twenty/four"), None);
    }

    #[test]
    fn tax_year_from_date_before_april_6() {
        // 5 April 2024 is in 2023/24 tax year
        let date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        assert_eq!(TaxYear::from_date(date), TaxYear(2024));
    }

    #[test]
    fn tax_year_from_date_on_april_6() {
        // 6 April 2024 is in 2024/25 tax year
        let date = NaiveDate::from_ymd_opt(2024, 4, 6).unwrap();
        assert_eq!(TaxYear::from_date(date), TaxYear(2025));
    }

    #[test]
    fn tax_year_from_date_january() {
        // 15 January 2024 is in 2023/24 tax year
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(TaxYear::from_date(date), TaxYear(2024));
    }

    #[test]
    fn tax_year_display() {
        assert_eq!(TaxYear(2024).display(), "2023/24");
        assert_eq!(TaxYear(2025).display(), "2024/25");
        assert_eq!(TaxYear(2031).display(), "2030/31");
    }

    #[test]
    fn tax_year_start_end_dates() {
        let ty = TaxYear(2025);
        assert_eq!(ty.start_date(), NaiveDate::from_ymd_opt(2024, 4, 6).unwrap());
        assert_eq!(ty.end_date(), NaiveDate::from_ymd_opt(2025, 4, 5).unwrap());
    }

    #[test]
    fn parse_and_display_agree() {
        let ty = TaxYear::parse("24/25").unwrap();
        assert_eq!(ty.display(), "2024/25");
    }
}
