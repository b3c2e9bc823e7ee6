//! Calendar date extraction for the secondary date index.
//!
//! The indexer asks a [`DateExtractor`] for the dates referenced in each
//! newly stored entry's raw text and writes one date index row per date.
//! Text without dates yields nothing; malformed dates are skipped.

use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;

/// Pure text → dates function used by the indexer.
pub trait DateExtractor: Send + Sync {
    /// Dates referenced in `text`, as `YYYY-MM-DD`, in first-seen order
    /// without duplicates.
    fn extract_dates(&self, text: &str) -> Vec<String>;
}

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

#[derive(Debug, Clone, Copy)]
enum Layout {
    YearMonthDay,
    DayMonthYear,
    DayNameYear,
    NameDayYear,
}

/// Regex-based extractor for the common numeric and written date forms.
///
/// Recognized: `2024-03-05`, `2024/03/05`, `05-03-2024`, `05/03/2024`,
/// `05.03.2024`, `5 March 2024`, `March 5, 2024` (month names in full or
/// abbreviated, any case).
pub struct DateFilter {
    patterns: Vec<(Regex, Layout)>,
}

impl DateFilter {
    pub fn new() -> Result<Self> {
        let patterns = vec![
            (
                Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b")?,
                Layout::YearMonthDay,
            ),
            (
                Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})\b")?,
                Layout::DayMonthYear,
            ),
            (
                Regex::new(&format!(
                    r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+{}\s+(\d{{4}})\b",
                    MONTH
                ))?,
                Layout::DayNameYear,
            ),
            (
                Regex::new(&format!(
                    r"(?i)\b{}\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b",
                    MONTH
                ))?,
                Layout::NameDayYear,
            ),
        ];
        Ok(Self { patterns })
    }
}

impl DateExtractor for DateFilter {
    fn extract_dates(&self, text: &str) -> Vec<String> {
        let mut found: Vec<(usize, NaiveDate)> = Vec::new();
        for (re, layout) in &self.patterns {
            for caps in re.captures_iter(text) {
                let (Some(whole), Some(a), Some(b), Some(c)) =
                    (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
                else {
                    continue;
                };
                let (a, b, c) = (a.as_str(), b.as_str(), c.as_str());
                let date = match layout {
                    Layout::YearMonthDay => ymd(a, b, c),
                    Layout::DayMonthYear => ymd(c, b, a),
                    Layout::DayNameYear => month_number(b).and_then(|m| ymd_parts(c, m, a)),
                    Layout::NameDayYear => month_number(a).and_then(|m| ymd_parts(c, m, b)),
                };
                if let Some(date) = date {
                    found.push((whole.start(), date));
                }
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        let mut dates: Vec<String> = Vec::with_capacity(found.len());
        for (_, date) in found {
            let formatted = date.format("%Y-%m-%d").to_string();
            if !dates.contains(&formatted) {
                dates.push(formatted);
            }
        }
        dates
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    ymd_parts(year, month.parse().ok()?, day)
}

fn ymd_parts(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
