// Reporting and output for ChronosRedirect
// Streams findings to CSV, buffers them for JSON, logs fetch failures, and
// renders colorized console lines behind a progress bar

use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::errors::{FetchError, ScanError};
use crate::models::{Classification, Finding, ScanSummary};

pub const CSV_HEADER: &str = "Payloaded URL,Final Redirect,Status";

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
pub fn escape_csv_field(field: &str) -> String {
    let needs_escaping = matches!(field.chars().next(), Some('=' | '+' | '-' | '@' | '\t'));

    if needs_escaping {
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Incremental CSV sink; each row is flushed as soon as it is written
pub struct CsvSink {
    path: PathBuf,
    file: File,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self, ScanError> {
        let mut file = File::create(path).map_err(|source| output_error(path, source))?;
        writeln!(file, "{}", CSV_HEADER).map_err(|source| output_error(path, source))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn write_finding(&mut self, finding: &Finding) -> Result<(), ScanError> {
        writeln!(
            self.file,
            "{},{},{}",
            escape_csv_field(&finding.filled_url),
            escape_csv_field(&finding.final_url),
            escape_csv_field(finding.classification.as_str())
        )
        .and_then(|_| self.file.flush())
        .map_err(|source| output_error(&self.path, source))
    }
}

/// Append-only log with one timestamped line per fetch failure
pub struct FailureLog {
    path: PathBuf,
    file: File,
}

impl FailureLog {
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| output_error(path, source))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn record(&mut self, url: &str, error: &FetchError) -> Result<(), ScanError> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        writeln!(
            self.file,
            "{} - [ERROR] Error fetching: {} ({}: {})",
            timestamp,
            url,
            error.kind(),
            error
        )
        .map_err(|source| output_error(&self.path, source))
    }
}

/// Write all findings as an indented JSON array
pub fn write_json_report(path: &Path, findings: &[Finding]) -> Result<(), ScanError> {
    let mut file = File::create(path).map_err(|source| output_error(path, source))?;
    serde_json::to_writer_pretty(&mut file, findings)?;
    writeln!(file).map_err(|source| output_error(path, source))
}

/// Console line for a finding, colored by classification
pub fn format_finding_line(finding: &Finding) -> String {
    let tag = format!("[{}]", finding.classification.as_str().to_uppercase());
    let tag = match finding.classification {
        Classification::Vulnerable => tag.red(),
        Classification::Partial => tag.yellow(),
        Classification::Safe => tag.bright_green(),
    };
    format!("{} {} --> {}", tag, finding.filled_url, finding.final_url)
}

pub fn print_banner() {
    let banner = r#"
   _____ _                                 _____          _ _               _
  / ____| |                               |  __ \        | (_)             | |
 | |    | |__  _ __ ___  _ __   ___  ___  | |__) |___  __| |_ _ __ ___  ___| |_
 | |    | '_ \| '__/ _ \| '_ \ / _ \/ __| |  _  // _ \/ _` | | '__/ _ \/ __| __|
 | |____| | | | | | (_) | | | | (_) \__ \ | | \ \  __/ (_| | | | |  __/ (__| |_
  \_____|_| |_|_|  \___/|_| |_|\___/|___/ |_|  \_\___|\__,_|_|_|  \___|\___|\__|
"#;
    println!("{}", banner.green());
    println!("{}\n", "      ChronosRedirect - Open Redirect Fuzzer".green());
}

pub fn format_summary(summary: &ScanSummary) -> String {
    format!(
        "[INFO] Done: {} requests, {} vulnerable, {} partial, {} safe, {} without redirect, {} failed.",
        summary.total,
        summary.vulnerable,
        summary.partial,
        summary.safe,
        summary.skipped,
        summary.failed
    )
}

fn output_error(path: &Path, source: std::io::Error) -> ScanError {
    ScanError::Output {
        path: path.to_path_buf(),
        source,
    }
}

struct ReportState {
    csv: CsvSink,
    json: Option<Vec<Finding>>,
    log: FailureLog,
    summary: ScanSummary,
}

/// Shared sink for one run. All writes, including progress updates, go
/// through a single lock so rows from concurrent work items never interleave.
pub struct ScanReporter {
    state: Mutex<ReportState>,
    progress: ProgressBar,
    json_path: Option<PathBuf>,
    silent: bool,
}

impl ScanReporter {
    pub fn new(
        csv_path: &Path,
        log_path: &Path,
        json_path: Option<&Path>,
        total: usize,
        silent: bool,
    ) -> Result<Self, ScanError> {
        let progress = if silent {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("Processing {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed_precise}<{eta_precise}]")
            {
                bar.set_style(style);
            }
            bar
        };

        Ok(Self {
            state: Mutex::new(ReportState {
                csv: CsvSink::create(csv_path)?,
                json: json_path.map(|_| Vec::new()),
                log: FailureLog::open(log_path)?,
                summary: ScanSummary {
                    total,
                    ..ScanSummary::default()
                },
            }),
            progress,
            json_path: json_path.map(Path::to_path_buf),
            silent,
        })
    }

    pub async fn record_finding(&self, finding: Finding) -> Result<(), ScanError> {
        let mut state = self.state.lock().await;
        state.csv.write_finding(&finding)?;

        if finding.classification != Classification::Safe || !self.silent {
            let line = format_finding_line(&finding);
            self.progress.suspend(|| println!("{}", line));
        }

        match finding.classification {
            Classification::Vulnerable => state.summary.vulnerable += 1,
            Classification::Partial => state.summary.partial += 1,
            Classification::Safe => state.summary.safe += 1,
        }
        if let Some(json) = state.json.as_mut() {
            json.push(finding);
        }
        self.progress.inc(1);
        Ok(())
    }

    pub async fn record_failure(&self, url: &str, error: &FetchError) -> Result<(), ScanError> {
        let mut state = self.state.lock().await;
        state.log.record(url, error)?;
        state.summary.failed += 1;
        self.progress.inc(1);
        Ok(())
    }

    pub async fn record_skipped(&self) {
        let mut state = self.state.lock().await;
        state.summary.skipped += 1;
        self.progress.inc(1);
    }

    /// Flush the JSON sink, if configured, and return the run counters
    pub async fn finish(&self, peak_in_flight: usize) -> Result<ScanSummary, ScanError> {
        let mut state = self.state.lock().await;
        self.progress.finish_and_clear();

        if let (Some(path), Some(findings)) = (&self.json_path, state.json.as_ref()) {
            write_json_report(path, findings)?;
        }

        state.summary.peak_in_flight = peak_in_flight;
        Ok(state.summary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(escape_csv_field("http://a.test/?x=//evil.com"), "http://a.test/?x=//evil.com");
        assert_eq!(escape_csv_field(""), "");
    }

    #[test]
    fn commas_and_quotes_are_quoted() {
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn line_breaks_are_quoted() {
        assert_eq!(escape_csv_field("a\nb"), "\"a\nb\"");
        assert_eq!(escape_csv_field("a\rb"), "\"a\rb\"");
    }

    #[test]
    fn formula_prefixes_are_neutralized() {
        assert_eq!(escape_csv_field("=HYPERLINK(1)"), "\"'=HYPERLINK(1)\"");
        assert_eq!(escape_csv_field("@evil.com"), "\"'@evil.com\"");
    }

    #[test]
    fn finding_line_has_tag_and_arrow() {
        colored::control::set_override(false);
        let finding = Finding::new(
            "http://a.test/?x=//evil.com".to_string(),
            "http://evil.com/".to_string(),
            Classification::Vulnerable,
        );
        assert_eq!(
            format_finding_line(&finding),
            "[VULNERABLE] http://a.test/?x=//evil.com --> http://evil.com/"
        );
    }
}
