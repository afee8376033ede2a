use crate::errors::Result;
use crate::report::{ChangeKind, RunReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Defines the possible output formats for a sweep report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A simple, human-readable text format.
    Text,
    /// JSON format, suitable for machine processing.
    Json,
    /// Comma-Separated Values, one row per change.
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

/// Handles the formatting of a [`RunReport`] into the supported output formats.
pub struct OutputFormatter {
    format: OutputFormat,
    include_summary: bool,
    tool_name: String,
    tool_version: String,
}

impl OutputFormatter {
    /// Creates a new `OutputFormatter`.
    ///
    /// `include_summary` only affects the `Text` format.
    pub fn new(format: OutputFormat, include_summary: bool) -> Self {
        Self {
            format,
            include_summary,
            tool_name: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Writes the formatted report to `writer`.
    pub fn write_output<W: Write>(&self, writer: &mut W, report: &RunReport) -> Result<()> {
        let output = match self.format {
            OutputFormat::Text => self.format_text(report),
            OutputFormat::Json => self.format_json(report)?,
            OutputFormat::Csv => self.format_csv(report)?,
        };

        writer.write_all(output.as_bytes())?;

        if self.include_summary && self.format == OutputFormat::Text {
            writer.write_all(self.format_summary(report).as_bytes())?;
        }

        Ok(())
    }

    fn format_text(&self, report: &RunReport) -> String {
        let prefix = if report.dry_run { "DRY " } else { "" };
        let mut output = String::new();

        for change in &report.changes {
            match change.kind {
                ChangeKind::Contents => output.push_str(&format!(
                    "{}Modified {} ({} changes)\n",
                    prefix,
                    change.from.display(),
                    change.substitutions
                )),
                kind => output.push_str(&format!(
                    "{}Renamed {}: {} -> {}\n",
                    prefix,
                    kind.label(),
                    change.from.display(),
                    change.to.display()
                )),
            }
        }

        for warning in &report.warnings {
            output.push_str(&format!("warning: {warning}\n"));
        }

        output
    }

    fn format_json(&self, report: &RunReport) -> Result<String> {
        #[derive(Serialize)]
        struct JsonOutput<'a> {
            tool: ToolInfo<'a>,
            run_time: DateTime<Utc>,
            total_substitutions: usize,
            #[serde(flatten)]
            report: &'a RunReport,
        }

        #[derive(Serialize)]
        struct ToolInfo<'a> {
            name: &'a str,
            version: &'a str,
        }

        let output = JsonOutput {
            tool: ToolInfo {
                name: &self.tool_name,
                version: &self.tool_version,
            },
            run_time: Utc::now(),
            total_substitutions: report.total_substitutions(),
            report,
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }

    fn format_csv(&self, report: &RunReport) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        wtr.write_record(["Kind", "From", "To", "Substitutions"])?;

        for change in &report.changes {
            wtr.write_record([
                change.kind.label().to_string(),
                change.from.display().to_string(),
                change.to.display().to_string(),
                change.substitutions.to_string(),
            ])?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| format!("CSV writer error: {}", e))?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn format_summary(&self, report: &RunReport) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("\n{}\n", "-".repeat(50)));
        if report.dry_run {
            summary.push_str("Dry run: no files were modified\n");
        }
        summary.push_str(&format!("Entries visited     : {}\n", report.entries_visited));
        summary.push_str(&format!("Directories renamed : {}\n", report.directories_renamed));
        summary.push_str(&format!("Files renamed       : {}\n", report.files_renamed));
        summary.push_str(&format!("Files scanned       : {}\n", report.files_scanned));
        summary.push_str(&format!("Files changed       : {}\n", report.files_rewritten));
        summary.push_str(&format!("Total edits         : {}\n", report.total_substitutions()));
        summary.push_str(&format!("Excluded            : {}\n", report.excluded));
        summary.push_str(&format!("Masked out          : {}\n", report.masked_out));
        if report.skipped > 0 {
            summary.push_str(&format!("Skipped             : {}\n", report.skipped));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Change;
    use std::path::PathBuf;

    fn create_test_report() -> RunReport {
        let mut report = RunReport::new(false);
        report.entries_visited = 3;
        report.files_scanned = 1;
        report.record(Change {
            kind: ChangeKind::Directory,
            from: PathBuf::from("base/top-dir"),
            to: PathBuf::from("base/top_dir"),
            substitutions: 0,
        });
        report.record(Change {
            kind: ChangeKind::Contents,
            from: PathBuf::from("base/top_dir/a-b.txt"),
            to: PathBuf::from("base/top_dir/a-b.txt"),
            substitutions: 4,
        });
        report
    }

    #[test]
    fn test_text_format() {
        let formatter = OutputFormatter::new(OutputFormat::Text, true);
        let mut out = Vec::new();
        formatter.write_output(&mut out, &create_test_report()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Renamed directory: base/top-dir -> base/top_dir"));
        assert!(text.contains("Modified base/top_dir/a-b.txt (4 changes)"));
        assert!(text.contains("Total edits         : 4"));
    }

    #[test]
    fn test_json_format() {
        let formatter = OutputFormatter::new(OutputFormat::Json, false);
        let output = formatter.format_json(&create_test_report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["tool"]["name"], "sweep");
        assert_eq!(parsed["directories_renamed"], 1);
        assert_eq!(parsed["total_substitutions"], 4);
        assert_eq!(parsed["changes"][0]["kind"], "directory");
    }

    #[test]
    fn test_csv_format() {
        let formatter = OutputFormatter::new(OutputFormat::Csv, false);
        let output = formatter.format_csv(&create_test_report()).unwrap();

        let mut rdr = csv::Reader::from_reader(output.as_bytes());
        let headers = rdr.headers().unwrap();
        assert_eq!(headers.get(0), Some("Kind"));

        let records: Vec<_> = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get(3), Some("4"));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }
}
