use lit_core::Report;
use std::fmt;

pub const REPORT_TITLE: &str = "Generated Research Report";

/// Markdown view of a report, section for section with the downloadable
/// document.
pub struct MarkdownReport<'a>(pub &'a Report);

impl fmt::Display for MarkdownReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "# {}\n", REPORT_TITLE)?;
        writeln!(f, "## Research Topic\n\n{}\n", report.research_topic)?;
        if let Some(field) = &report.field_of_study {
            writeln!(f, "**Field of study:** {}\n", field)?;
        }
        if let Some(kind) = &report.type_of_publication {
            writeln!(f, "**Type of publication:** {}\n", kind)?;
        }
        writeln!(f, "## Research Summary\n\n{}\n", report.generated_summary.trim())?;

        if !report.citations.is_empty() {
            writeln!(f, "## Related Articles ({})\n", report.citation_format)?;
            for citation in &report.citations {
                writeln!(f, "- {}", citation)?;
            }
            writeln!(f)?;
        }

        if !report.conditions.is_empty() {
            writeln!(f, "---\n")?;
            for condition in &report.conditions {
                writeln!(f, "> ⚠️ {}", condition)?;
            }
        }
        Ok(())
    }
}

pub fn render_markdown(report: &Report) -> String {
    MarkdownReport(report).to_string()
}
