use crate::domain::outcome::TransferOutcome;
use crate::error::Result;
use std::io::Write;

/// Which slice of the outcome log a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Successes,
    Failures,
}

impl ReportScope {
    fn includes(&self, outcome: &TransferOutcome) -> bool {
        match self {
            Self::All => true,
            Self::Successes => outcome.succeeded,
            Self::Failures => !outcome.succeeded,
        }
    }
}

impl std::str::FromStr for ReportScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "successes" => Ok(Self::Successes),
            "failures" => Ok(Self::Failures),
            other => Err(format!(
                "unknown report scope '{}', expected 'all', 'successes' or 'failures'",
                other
            )),
        }
    }
}

/// Writes the outcome log as a CSV report for the operator.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(sink),
        }
    }

    pub fn write_report(&mut self, outcomes: &[TransferOutcome], scope: ReportScope) -> Result<()> {
        self.writer.write_record([
            "index",
            "status",
            "http_code",
            "transfer_id",
            "state",
            "message",
            "duration_ms",
            "completed_at",
        ])?;

        for outcome in outcomes.iter().filter(|o| scope.includes(o)) {
            self.writer.write_record([
                // 1-based, matching how operators count rows in the source file
                (outcome.original_index + 1).to_string(),
                if outcome.succeeded { "SUCCESS" } else { "FAILED" }.to_string(),
                outcome.http_status_code.to_string(),
                outcome.transfer_id.clone().unwrap_or_default(),
                outcome.current_state.clone().unwrap_or_default(),
                outcome.error_message.clone().unwrap_or_default(),
                outcome.duration_millis.to_string(),
                outcome.completed_at.to_rfc3339(),
            ])?;
        }

        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn outcome(index: usize, succeeded: bool) -> TransferOutcome {
        TransferOutcome {
            original_index: index,
            succeeded,
            http_status_code: if succeeded { 200 } else { 500 },
            status_text: String::new(),
            transfer_id: succeeded.then(|| format!("tr-{}", index)),
            current_state: None,
            error_message: (!succeeded).then(|| "boom".to_string()),
            duration_millis: 12,
            completed_at: Utc::now(),
            attempt_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_report_includes_header_and_rows() {
        let outcomes = vec![outcome(0, true), outcome(1, false)];
        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer)
            .write_report(&outcomes, ReportScope::All)
            .unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("index,status,http_code"));
        assert!(lines[1].contains("SUCCESS"));
        assert!(lines[1].contains("tr-0"));
        assert!(lines[2].contains("FAILED"));
        assert!(lines[2].contains("boom"));
    }

    #[test]
    fn test_failures_scope_filters_successes() {
        let outcomes = vec![outcome(0, true), outcome(1, false), outcome(2, false)];
        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer)
            .write_report(&outcomes, ReportScope::Failures)
            .unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(!text.contains("SUCCESS"));
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("all".parse(), Ok(ReportScope::All));
        assert_eq!("failures".parse(), Ok(ReportScope::Failures));
        assert!("errors".parse::<ReportScope>().is_err());
    }
}
