use colored::{Color, Colorize};
use playfall_engine::backend::AttachOutcome;
use playfall_engine::session::{SessionPhase, SessionReport};

use crate::cli::OutputFormat;
use crate::error::Result;

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_report(&self, report: &SessionReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_pretty(report)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(report)?),
        }
    }

    fn format_pretty(&self, report: &SessionReport) -> String {
        let mut out = String::new();

        out.push_str(&self.colorize("Playback resolution", Color::Green, true));
        out.push('\n');
        out.push_str(&format!(
            "  {}: {}\n",
            self.colorize("URL", Color::Yellow, false),
            report.url
        ));
        if let Some(id) = &report.declared_id {
            out.push_str(&format!(
                "  {}: {id}\n",
                self.colorize("Media ID", Color::Yellow, false)
            ));
        }
        out.push_str(&format!(
            "  {}: {}\n",
            self.colorize("Format hint", Color::Yellow, false),
            report.hint
        ));
        out.push_str(&format!(
            "  {}: {}\n",
            self.colorize("Outcome", Color::Yellow, false),
            self.outcome_line(report)
        ));

        if !report.attempts.is_empty() {
            out.push('\n');
            out.push_str(&self.colorize("Attempts", Color::Green, true));
            out.push('\n');
            for (index, attempt) in report.attempts.iter().enumerate() {
                let (verdict, color) = match &attempt.outcome {
                    AttachOutcome::Success => ("ok".to_string(), Color::Green),
                    AttachOutcome::Failure(failure) => (failure.to_string(), Color::Red),
                };
                let mime = if attempt.mime.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", attempt.mime)
                };
                out.push_str(&format!(
                    "  {}. {}{mime}  {}\n",
                    index + 1,
                    attempt.backend,
                    self.colorize(&verdict, color, false)
                ));
            }
        }

        if let Some(diagnosis) = &report.diagnosis {
            out.push('\n');
            out.push_str(&self.colorize("Diagnosis", Color::Green, true));
            out.push('\n');
            out.push_str(&format!(
                "  {}: {}\n",
                self.colorize("Cause", Color::Yellow, false),
                self.colorize(diagnosis.cause.as_str(), Color::Red, false)
            ));
            out.push_str(&format!(
                "  {}: {}\n",
                self.colorize("Retryable", Color::Yellow, false),
                if diagnosis.retryable { "yes" } else { "no" }
            ));
            out.push_str(&format!(
                "  {}: {}\n",
                self.colorize("Remediation", Color::Yellow, false),
                diagnosis.remediation
            ));
        }

        if let Some(raw) = &report.raw_url_affordance {
            out.push_str(&format!(
                "  {}: {raw}\n",
                self.colorize("Open directly", Color::Yellow, false)
            ));
        }

        out
    }

    fn outcome_line(&self, report: &SessionReport) -> String {
        match report.phase {
            SessionPhase::Succeeded if report.verified_playback() => {
                let backend = report
                    .attempts
                    .iter()
                    .rev()
                    .find(|a| a.outcome.is_success())
                    .map(|a| a.backend.as_str())
                    .unwrap_or("unknown backend");
                self.colorize(&format!("playing ({backend})"), Color::Green, false)
            }
            SessionPhase::Succeeded => self.colorize(
                "rendered via embedded frame (playback unverified)",
                Color::Yellow,
                false,
            ),
            SessionPhase::Exhausted => self.colorize("exhausted", Color::Red, false),
            phase => format!("{phase:?}"),
        }
    }

    fn colorize(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.colored {
            return text.to_string();
        }
        let colored = text.color(color);
        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }
}
