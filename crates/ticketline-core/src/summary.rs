//! The five-section structured summary shared by the dispatcher, the cache,
//! and the timeline formatter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder for fields a summary could not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Narrative used for every section but the first in an error summary.
pub const UNAVAILABLE_NARRATIVE: &str = "Not available due to error";

/// Section names in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionName {
    InitialIssue,
    FollowUps,
    Developments,
    LaterIncidents,
    RecentEvents,
}

impl SectionName {
    pub const ALL: [SectionName; 5] = [
        SectionName::InitialIssue,
        SectionName::FollowUps,
        SectionName::Developments,
        SectionName::LaterIncidents,
        SectionName::RecentEvents,
    ];

    /// Key used in the JSON shape requested from the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialIssue => "Initial Issue",
            Self::FollowUps => "Follow-ups",
            Self::Developments => "Developments",
            Self::LaterIncidents => "Later Incidents",
            Self::RecentEvents => "Recent Events",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub timeframe: String,
    #[serde(default)]
    pub ticket_numbers: Vec<String>,
    pub narrative: String,
    /// Set when the model returned this section as bare text instead of an
    /// object. Its date, if any, is a `**Timeframe**:` label in the narrative.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub free_text: bool,
}

impl Section {
    /// A section with no timeframe and no tickets.
    pub fn placeholder(narrative: impl Into<String>) -> Self {
        Self {
            timeframe: NOT_AVAILABLE.to_string(),
            ticket_numbers: Vec::new(),
            narrative: narrative.into(),
            free_text: false,
        }
    }

    /// A section the model wrote as bare text.
    pub fn free_text(text: impl Into<String>) -> Self {
        Self {
            free_text: true,
            ..Self::placeholder(text)
        }
    }
}

/// Chronological narrative of one cohort.
///
/// Holds whether it came from the cache, a model response, or an error fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSummary {
    #[serde(rename = "Initial Issue")]
    pub initial_issue: Section,
    #[serde(rename = "Follow-ups")]
    pub follow_ups: Section,
    #[serde(rename = "Developments")]
    pub developments: Section,
    #[serde(rename = "Later Incidents")]
    pub later_incidents: Section,
    #[serde(rename = "Recent Events")]
    pub recent_events: Section,
}

impl StructuredSummary {
    /// Build a summary by producing each section in [`SectionName::ALL`] order.
    pub fn from_sections(mut make: impl FnMut(SectionName) -> Section) -> Self {
        Self {
            initial_issue: make(SectionName::InitialIssue),
            follow_ups: make(SectionName::FollowUps),
            developments: make(SectionName::Developments),
            later_incidents: make(SectionName::LaterIncidents),
            recent_events: make(SectionName::RecentEvents),
        }
    }

    /// Fallback returned after the model could not produce a usable summary.
    ///
    /// `message` becomes the first section's narrative.
    pub fn error_fallback(message: impl Into<String>) -> Self {
        let mut message = Some(message.into());
        Self::from_sections(|name| match name {
            SectionName::InitialIssue => Section::placeholder(message.take().unwrap_or_default()),
            _ => Section::placeholder(UNAVAILABLE_NARRATIVE),
        })
    }

    pub fn section(&self, name: SectionName) -> &Section {
        match name {
            SectionName::InitialIssue => &self.initial_issue,
            SectionName::FollowUps => &self.follow_ups,
            SectionName::Developments => &self.developments,
            SectionName::LaterIncidents => &self.later_incidents,
            SectionName::RecentEvents => &self.recent_events,
        }
    }

    /// Sections paired with their names, in chronological order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionName, &Section)> {
        SectionName::ALL.into_iter().map(|name| (name, self.section(name)))
    }
}
