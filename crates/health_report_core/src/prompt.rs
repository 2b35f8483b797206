//! crates/health_report_core/src/prompt.rs
//!
//! Renders assembled report data into the system/user prompt pair sent to the
//! text provider. Everything here is a pure function of its inputs.

use crate::domain::{AssembledReportData, ReportFormat, TimeWindow};

/// Prefix of every section heading in a generated report. Downstream rendering
/// depends on this exact marker.
pub const SECTION_MARKER: &str = "### ";

/// The mandatory report sections, in the order the provider must emit them.
pub const REPORT_SECTIONS: [&str; 5] = [
    "HEALTH SUMMARY",
    "SYMPTOM PATTERNS",
    "MEDICATION REVIEW",
    "CORRELATIONS",
    "RECOMMENDATIONS",
];

pub const SYSTEM_INSTRUCTIONS: &str = r#"You are a medical report generator that creates clear, well-structured health reports.

Always organize the report using these exact sections, in this order:

### HEALTH SUMMARY
A concise 2-3 sentence overview of the patient's health during this period.

### SYMPTOM PATTERNS
The recorded symptoms and how their severity changed over the period.

### MEDICATION REVIEW
The medications in use and how consistently doses were confirmed.

### CORRELATIONS
Any relationship between symptoms and medications that the data supports.

### RECOMMENDATIONS
General, non-diagnostic health recommendations.

FORMAT REQUIREMENTS:
- Each section title must be on its own line, preceded by exactly three # symbols and a space (### )
- Keep paragraphs short and clear (2-4 sentences each)
- Use plain language and avoid medical jargon
- Do not use any other markdown: no bold, no italics, no tables, no horizontal rules
- Be objective and factual; only describe what the data shows
- The report should be readable at a glance

IMPORTANT: The report must be simple but professional, like a standard medical report. Do not add any decorative elements or unnecessary formatting."#;

/// The two halves of a provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
}

/// Builds the prompt for one report.
///
/// Identical inputs always yield byte-identical prompts. The only failure is
/// serialization of the record views.
pub fn build_prompt(
    data: &AssembledReportData,
    window: &TimeWindow,
    format: ReportFormat,
) -> Result<Prompt, serde_json::Error> {
    let symptoms = serde_json::to_string_pretty(&data.symptoms)?;
    let medications = serde_json::to_string_pretty(&data.medications)?;

    let user = format!(
        "Generate a health report for the period from {start} to {end}.\n\
         \n\
         SYMPTOMS DATA:\n\
         {symptoms}\n\
         \n\
         MEDICATIONS DATA:\n\
         {medications}\n\
         \n\
         Report format requested: {format}\n\
         {depth}\n\
         \n\
         Use only the five required sections and base every statement on the data above.",
        start = human_date(window.start()),
        end = human_date(window.end()),
        format = format.label(),
        depth = depth_guidance(format),
    );

    Ok(Prompt {
        system: SYSTEM_INSTRUCTIONS,
        user,
    })
}

fn human_date(instant: chrono::DateTime<chrono::Utc>) -> String {
    instant.format("%B %d, %Y").to_string()
}

fn depth_guidance(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Summary => "Keep each section brief and focus on the overall picture.",
        ReportFormat::Detailed => {
            "Discuss individual entries where they matter and note trends across the period."
        }
    }
}
