//! Prompt rendering for cohort summaries.
//!
//! Pure function of the cohort: the same records always render to the same text.

use serde_json::Value;

use crate::cohort::Cohort;
use crate::summary::NOT_AVAILABLE;

const PROMPT_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered request for one cohort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Pretty-printed JSON array of the cohort's records.
    pub payload: String,
    /// Full instruction text with the payload embedded.
    pub text: String,
}

/// Serialize the cohort's records for the model: header-order columns plus
/// `product`, `YYYY-MM-DD HH:MM:SS` timestamps, `"N/A"` for missing values.
pub fn render_payload(cohort: &Cohort) -> String {
    let missing = Value::String(NOT_AVAILABLE.to_string());
    let rows: Vec<Value> = cohort
        .records
        .iter()
        .map(|r| Value::Object(r.to_json_object(PROMPT_TIMESTAMP, &missing)))
        .collect();
    serde_json::to_string_pretty(&Value::Array(rows)).unwrap_or_else(|_| "[]".to_string())
}

pub fn build_prompt(cohort: &Cohort) -> Prompt {
    let payload = render_payload(cohort);
    let text = format!(
        "Analyze these ticket records for a single customer and service category:
{payload}

Create a chronological summary with these sections, focusing on the customer's experience:

1. Initial Issue:
    - Timeframe: Identify the period when the initial issues began.
    - Ticket Numbers: List the relevant ticket numbers.
    - Narrative: Describe the customer's initial problems, including the nature of the issues, the customer's feedback, and any immediate actions taken.

2. Follow-ups:
    - Timeframe: Document the period of follow-up activities.
    - Ticket Numbers: List the related ticket numbers.
    - Narrative: Detail the follow-up actions, including further customer interactions, additional feedback, and any responses from the support team.

3. Developments:
    - Timeframe: Specify the period during which significant developments occurred.
    - Ticket Numbers: List the relevant ticket numbers.
    - Narrative: Explain the developments, such as new issues arising, advancements in resolving existing problems, and any changes in customer experiences.

4. Later Incidents:
    - Timeframe: Note the timeframe for later incidents.
    - Ticket Numbers: List the related ticket numbers.
    - Narrative: Describe recurring issues or new problems that emerged, including how they were handled and the customer's ongoing feedback.

5. Recent Events:
    - Timeframe: Highlight the most recent period.
    - Ticket Numbers: List the relevant ticket numbers.
    - Narrative: Provide a summary of the latest events, including current issues, recent resolutions, and the customer's final feedback.

Format as JSON:
{{
    \"Initial Issue\": {{
        \"timeframe\": \"date range (YYYY-MM-DD to YYYY-MM-DD)\",
        \"ticket_numbers\": [\"list of relevant tickets\"],
        \"narrative\": \"detailed description\"
    }},
    \"Follow-ups\": {{ same structure }},
    \"Developments\": {{ same structure }},
    \"Later Incidents\": {{ same structure }},
    \"Recent Events\": {{ same structure }}
}}

Guidelines:
- Focus on this specific customer's experience with this service category
- Maintain chronological order
- Include relevant ticket numbers
- Use clear, professional language
- Highlight patterns or recurring issues
"
    );
    Prompt { payload, text }
}
