//! Conversion of a structured summary into timeline events.
//!
//! One event per section, in [`SectionName::ALL`] order. Each event needs a
//! calendar date; sections without one inherit the last date seen earlier in
//! the pass, and leading undated sections fall back to
//! [`TimelineOptions::default_date`].

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::summary::{Section, StructuredSummary};

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());
static LABELED_TIMEFRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Timeframe\*\*:\s*(\d{4}-\d{2}-\d{2})").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

const SUBTITLE: &str = "Chronological view of customer issues and resolutions";

#[derive(Debug, Clone)]
pub struct TimelineOptions {
    /// Date given to sections before the first dated one.
    pub default_date: NaiveDate,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            default_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<NaiveDate> for TimelineDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineText {
    pub headline: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineTitle {
    pub text: TimelineText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub start_date: TimelineDate,
    pub text: TimelineText,
}

/// Document consumed by the timeline widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDocument {
    pub title: TimelineTitle,
    pub events: Vec<TimelineEvent>,
}

/// Default headline for a cohort's timeline.
pub fn default_headline(customer: &str, product: &str) -> String {
    format!("Customer {customer} - {product} Timeline")
}

pub fn to_timeline(
    summary: &StructuredSummary,
    headline: &str,
    options: &TimelineOptions,
) -> TimelineDocument {
    let mut last_date: Option<NaiveDate> = None;
    let mut events = Vec::with_capacity(5);

    for (name, section) in summary.sections() {
        let date = match extract_date(section) {
            Some(found) => {
                last_date = Some(found);
                found
            }
            None => last_date.unwrap_or(options.default_date),
        };
        events.push(TimelineEvent {
            start_date: date.into(),
            text: TimelineText {
                headline: name.as_str().to_string(),
                text: section_text(section),
            },
        });
    }

    TimelineDocument {
        title: TimelineTitle {
            text: TimelineText {
                headline: headline.to_string(),
                text: SUBTITLE.to_string(),
            },
        },
        events,
    }
}

/// Date for a section: the first `YYYY-MM-DD` in the timeframe, or for a
/// free-text section a `**Timeframe**: YYYY-MM-DD` label in its text.
pub fn extract_date(section: &Section) -> Option<NaiveDate> {
    let captured = if section.free_text {
        LABELED_TIMEFRAME.captures(&section.narrative)
    } else {
        ISO_DATE.captures(&section.timeframe)
    }?;
    NaiveDate::parse_from_str(&captured[1], "%Y-%m-%d").ok()
}

/// Convert `**bold**` to `<b>bold</b>` and newlines to `<br>`.
pub fn format_text(text: &str) -> String {
    BOLD.replace_all(text, "<b>$1</b>").replace('\n', "<br>")
}

fn section_text(section: &Section) -> String {
    format!(
        "<b>Timeframe</b>: {}<hr><b>Ticket Numbers</b>: {}<hr><b>Narrative</b>: {}",
        section.timeframe,
        section.ticket_numbers.join(", "),
        format_text(&section.narrative),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SectionName;

    fn section(timeframe: &str, narrative: &str) -> Section {
        Section {
            timeframe: timeframe.into(),
            ticket_numbers: vec![],
            narrative: narrative.into(),
            free_text: false,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> TimelineDate {
        TimelineDate {
            year: y,
            month: m,
            day: d,
        }
    }

    #[test]
    fn forward_fills_from_only_dated_section() {
        let summary = StructuredSummary::from_sections(|name| match name {
            SectionName::FollowUps => section("2023-06-15 to 2023-06-20", "follow-up"),
            _ => section("N/A", "no date here"),
        });
        let doc = to_timeline(&summary, "t", &TimelineOptions::default());
        let dates: Vec<_> = doc.events.iter().map(|e| e.start_date).collect();
        assert_eq!(
            dates,
            [
                ymd(2024, 1, 1),
                ymd(2023, 6, 15),
                ymd(2023, 6, 15),
                ymd(2023, 6, 15),
                ymd(2023, 6, 15),
            ]
        );
    }

    #[test]
    fn later_dates_replace_carried_date() {
        let summary = StructuredSummary::from_sections(|name| match name {
            SectionName::InitialIssue => section("2024-02-01", ""),
            SectionName::Developments => section("around 2024-03-10", ""),
            _ => section("ongoing", ""),
        });
        let doc = to_timeline(&summary, "t", &TimelineOptions::default());
        let dates: Vec<_> = doc.events.iter().map(|e| e.start_date).collect();
        assert_eq!(
            dates,
            [
                ymd(2024, 2, 1),
                ymd(2024, 2, 1),
                ymd(2024, 3, 10),
                ymd(2024, 3, 10),
                ymd(2024, 3, 10),
            ]
        );
    }

    #[test]
    fn default_date_is_configurable() {
        let summary = StructuredSummary::error_fallback("boom");
        let options = TimelineOptions {
            default_date: NaiveDate::from_ymd_opt(2019, 5, 4).unwrap(),
        };
        let doc = to_timeline(&summary, "t", &options);
        assert!(doc.events.iter().all(|e| e.start_date == ymd(2019, 5, 4)));
    }

    #[test]
    fn labeled_timeframe_in_free_text() {
        let s = Section::free_text("**Timeframe**: 2022-11-30\nCustomer reported drops");
        assert_eq!(extract_date(&s), NaiveDate::from_ymd_opt(2022, 11, 30));
    }

    #[test]
    fn structured_section_ignores_narrative_label() {
        let s = section("N/A", "**Timeframe**: 2023-05-01 outage");
        assert_eq!(extract_date(&s), None);

        let summary = StructuredSummary::from_sections(|name| match name {
            SectionName::InitialIssue => section("N/A", "**Timeframe**: 2023-05-01 outage"),
            _ => section("N/A", ""),
        });
        let doc = to_timeline(&summary, "t", &TimelineOptions::default());
        assert_eq!(doc.events[0].start_date, ymd(2024, 1, 1));
    }

    #[test]
    fn free_text_date_feeds_forward_fill() {
        let summary = StructuredSummary::from_sections(|name| match name {
            SectionName::InitialIssue => Section::free_text("**Timeframe**: 2023-05-01\noutage"),
            _ => section("N/A", ""),
        });
        let doc = to_timeline(&summary, "t", &TimelineOptions::default());
        assert!(doc.events.iter().all(|e| e.start_date == ymd(2023, 5, 1)));
    }

    #[test]
    fn unlabeled_narrative_date_ignored() {
        let s = section("N/A", "Customer called on 2022-11-30");
        assert_eq!(extract_date(&s), None);
    }

    #[test]
    fn invalid_calendar_date_is_no_date() {
        assert_eq!(extract_date(&section("2024-13-45", "")), None);
    }

    #[test]
    fn event_text_and_headlines() {
        let summary = StructuredSummary::from_sections(|_| Section {
            timeframe: "2024-01-03".into(),
            ticket_numbers: vec!["T1".into(), "T2".into()],
            narrative: "**Outage** reported\nresolved".into(),
            free_text: false,
        });
        let doc = to_timeline(&summary, "Customer 100 - Broadband Timeline", &TimelineOptions::default());
        assert_eq!(doc.events.len(), 5);
        assert_eq!(doc.events[0].text.headline, "Initial Issue");
        assert_eq!(doc.events[4].text.headline, "Recent Events");
        assert_eq!(
            doc.events[0].text.text,
            "<b>Timeframe</b>: 2024-01-03<hr><b>Ticket Numbers</b>: T1, T2<hr><b>Narrative</b>: <b>Outage</b> reported<br>resolved"
        );
        assert_eq!(doc.title.text.headline, "Customer 100 - Broadband Timeline");
        assert_eq!(doc.title.text.text, SUBTITLE);
    }

    #[test]
    fn document_serializes_in_widget_shape() {
        let doc = to_timeline(
            &StructuredSummary::error_fallback("x"),
            &default_headline("100", "Voice"),
            &TimelineOptions::default(),
        );
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["title"]["text"]["headline"], "Customer 100 - Voice Timeline");
        assert_eq!(value["events"][0]["start_date"]["year"], 2024);
        assert_eq!(value["events"][0]["start_date"]["month"], 1);
        assert_eq!(value["events"][0]["text"]["headline"], "Initial Issue");
    }
}
