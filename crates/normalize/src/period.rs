//! Provider-native period codes → canonical [`PeriodRange`] (spec.md
//! §4.9, §3 "Period Range").

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
    Daily,
}

/// A canonical period: a calendar year plus an inclusive, day-precision
/// date range and dual-language labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub kind: PeriodKind,
    pub calendar_year: i32,
    pub quarter: Option<u8>,
    pub month: Option<u8>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label_en: String,
    pub label_ko: String,
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar month");
    first_of_next.pred_opt().expect("day before a valid date is valid")
}

fn quarter_range(year: i32, quarter: u8) -> (NaiveDate, NaiveDate) {
    let start_month = (quarter - 1) * 3 + 1;
    let start = NaiveDate::from_ymd_opt(year, u32::from(start_month), 1).expect("valid quarter start");
    let end = last_day_of_month(year, u32::from(start_month) + 2);
    (start, end)
}

/// Maps a DART reprt code (e.g. `"11011"`) to a [`PeriodRange`]. Note the
/// source only defines annual/H1/Q1/Q3 codes — no Q2 or Q4 reprt code
/// exists in this provider's API (spec.md §4.9).
#[must_use]
pub fn filings_period(report_code: &str, year: i32) -> Option<PeriodRange> {
    match report_code {
        "11011" => Some(PeriodRange {
            kind: PeriodKind::Annual,
            calendar_year: year,
            quarter: None,
            month: None,
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
            label_en: format!("FY{year}"),
            label_ko: format!("{year}년 사업연도"),
        }),
        "11012" => Some(PeriodRange {
            kind: PeriodKind::SemiAnnual,
            calendar_year: year,
            quarter: None,
            month: None,
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: last_day_of_month(year, 6),
            label_en: format!("{year} H1"),
            label_ko: format!("{year}년 상반기"),
        }),
        "11013" => {
            let (start, end) = quarter_range(year, 1);
            Some(PeriodRange {
                kind: PeriodKind::Quarterly,
                calendar_year: year,
                quarter: Some(1),
                month: None,
                start,
                end,
                label_en: format!("{year} Q1"),
                label_ko: format!("{year}년 1분기"),
            })
        }
        "11014" => {
            let (start, end) = quarter_range(year, 3);
            Some(PeriodRange {
                kind: PeriodKind::Quarterly,
                calendar_year: year,
                quarter: Some(3),
                month: None,
                start,
                end,
                label_en: format!("{year} Q3"),
                label_ko: format!("{year}년 3분기"),
            })
        }
        _ => None,
    }
}

/// Maps an 8-digit `YYYYMMDD` quotes date string to a daily
/// [`PeriodRange`].
#[must_use]
pub fn quotes_period(yyyymmdd: &str) -> Option<PeriodRange> {
    if yyyymmdd.len() != 8 || !yyyymmdd.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = yyyymmdd[0..4].parse().ok()?;
    let month: u32 = yyyymmdd[4..6].parse().ok()?;
    let day: u32 = yyyymmdd[6..8].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(PeriodRange {
        kind: PeriodKind::Daily,
        calendar_year: date.year(),
        quarter: None,
        month: Some(month as u8),
        start: date,
        end: date,
        label_en: date.format("%Y-%m-%d").to_string(),
        label_ko: date.format("%Y년 %m월 %d일").to_string(),
    })
}

/// Maps an ECOS period code (`YYYY`, `YYYYQn`, or `YYYYMM`) to a
/// [`PeriodRange`].
#[must_use]
pub fn centralbank_period(code: &str) -> Option<PeriodRange> {
    match code.len() {
        4 => {
            let year: i32 = code.parse().ok()?;
            Some(PeriodRange {
                kind: PeriodKind::Annual,
                calendar_year: year,
                quarter: None,
                month: None,
                start: NaiveDate::from_ymd_opt(year, 1, 1)?,
                end: NaiveDate::from_ymd_opt(year, 12, 31)?,
                label_en: format!("{year}"),
                label_ko: format!("{year}년"),
            })
        }
        6 if code.as_bytes()[4] == b'Q' => {
            let year: i32 = code[0..4].parse().ok()?;
            let quarter: u8 = code[5..6].parse().ok()?;
            if !(1..=4).contains(&quarter) {
                return None;
            }
            let (start, end) = quarter_range(year, quarter);
            Some(PeriodRange {
                kind: PeriodKind::Quarterly,
                calendar_year: year,
                quarter: Some(quarter),
                month: None,
                start,
                end,
                label_en: format!("{year} Q{quarter}"),
                label_ko: format!("{year}년 {quarter}분기"),
            })
        }
        6 => {
            let year: i32 = code[0..4].parse().ok()?;
            let month: u32 = code[4..6].parse().ok()?;
            let start = NaiveDate::from_ymd_opt(year, month, 1)?;
            let end = last_day_of_month(year, month);
            Some(PeriodRange {
                kind: PeriodKind::Monthly,
                calendar_year: year,
                quarter: None,
                month: Some(month as u8),
                start,
                end,
                label_en: format!("{year}-{month:02}"),
                label_ko: format!("{year}년 {month}월"),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_quarterly_is_three_consecutive_months() {
        let q1 = filings_period("11013", 2026).unwrap();
        assert_eq!(q1.start, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(q1.end, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());

        let q3 = filings_period("11014", 2026).unwrap();
        assert_eq!(q3.start, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(q3.end, NaiveDate::from_ymd_opt(2026, 9, 30).unwrap());
    }

    #[rstest]
    fn test_no_q2_or_q4_filings_code() {
        assert!(filings_period("11015", 2026).is_none());
    }

    #[rstest]
    fn test_semi_annual_h1() {
        let h1 = filings_period("11012", 2026).unwrap();
        assert_eq!(h1.end, NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }

    #[rstest]
    fn test_quotes_daily_period() {
        let p = quotes_period("20260728").unwrap();
        assert_eq!(p.kind, PeriodKind::Daily);
        assert_eq!(p.start, p.end);
    }

    #[rstest]
    fn test_monthly_respects_leap_year() {
        let p = centralbank_period("202402").unwrap();
        assert_eq!(p.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let p2 = centralbank_period("202302").unwrap();
        assert_eq!(p2.end, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[rstest]
    fn test_centralbank_quarterly() {
        let p = centralbank_period("2026Q2").unwrap();
        assert_eq!(p.start, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
        assert_eq!(p.end, NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }

    #[rstest]
    fn test_centralbank_annual() {
        let p = centralbank_period("2026").unwrap();
        assert_eq!(p.kind, PeriodKind::Annual);
        assert_eq!(p.calendar_year, 2026);
    }
}
