// HTML test report
//
// One `ReportSession` per run. Cases append entries while they execute;
// `flush` renders everything into `{reportPath}/TestReport_{timestamp}.html`.

use crate::error::Result;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Severity of a report line, ordered from least to most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportLevel {
    Info,
    Pass,
    Skip,
    Fail,
}

impl ReportLevel {
    fn label(self) -> &'static str {
        match self {
            ReportLevel::Info => "info",
            ReportLevel::Pass => "pass",
            ReportLevel::Skip => "skip",
            ReportLevel::Fail => "fail",
        }
    }
}

/// Handle to a case entry in a [`ReportSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseEntryId(usize);

#[derive(Debug, Clone)]
struct CaseEntry {
    name: String,
    description: String,
    started: DateTime<Local>,
    duration: Option<Duration>,
    lines: Vec<(ReportLevel, String)>,
    screenshots: Vec<PathBuf>,
}

impl CaseEntry {
    /// Most significant level logged; a case with only info lines passed.
    fn outcome(&self) -> ReportLevel {
        self.lines
            .iter()
            .map(|(level, _)| *level)
            .max()
            .filter(|level| *level != ReportLevel::Info)
            .unwrap_or(ReportLevel::Pass)
    }
}

/// Report for one run.
#[derive(Debug)]
pub struct ReportSession {
    path: PathBuf,
    started: DateTime<Local>,
    system_info: Vec<(String, String)>,
    entries: Mutex<Vec<CaseEntry>>,
}

impl ReportSession {
    /// Opens a report that will be written under `report_dir`.
    pub fn new(report_dir: impl AsRef<Path>) -> Self {
        let started = Local::now();
        let path = report_dir
            .as_ref()
            .join(format!("TestReport_{}.html", started.format("%Y%m%d_%H%M%S")));
        let system_info = vec![
            ("Environment".to_string(), "Test".to_string()),
            ("Browser".to_string(), "Chromium".to_string()),
            (
                "OS".to_string(),
                format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH),
            ),
        ];
        Self {
            path,
            started,
            system_info,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Where [`flush`](Self::flush) writes the report.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds a row to the report's system table.
    pub fn with_system_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_info.push((key.into(), value.into()));
        self
    }

    pub fn begin_case(&self, name: &str, description: &str) -> CaseEntryId {
        let mut entries = self.entries.lock();
        entries.push(CaseEntry {
            name: name.to_string(),
            description: description.to_string(),
            started: Local::now(),
            duration: None,
            lines: Vec::new(),
            screenshots: Vec::new(),
        });
        CaseEntryId(entries.len() - 1)
    }

    pub fn log(&self, case: CaseEntryId, level: ReportLevel, message: impl Into<String>) {
        if let Some(entry) = self.entries.lock().get_mut(case.0) {
            entry.lines.push((level, message.into()));
        }
    }

    pub fn info(&self, case: CaseEntryId, message: impl Into<String>) {
        self.log(case, ReportLevel::Info, message);
    }

    pub fn pass(&self, case: CaseEntryId, message: impl Into<String>) {
        self.log(case, ReportLevel::Pass, message);
    }

    pub fn fail(&self, case: CaseEntryId, message: impl Into<String>) {
        self.log(case, ReportLevel::Fail, message);
    }

    pub fn skip(&self, case: CaseEntryId, message: impl Into<String>) {
        self.log(case, ReportLevel::Skip, message);
    }

    pub fn attach_screenshot(&self, case: CaseEntryId, path: impl Into<PathBuf>) {
        if let Some(entry) = self.entries.lock().get_mut(case.0) {
            entry.screenshots.push(path.into());
        }
    }

    pub fn end_case(&self, case: CaseEntryId, duration: Duration) {
        if let Some(entry) = self.entries.lock().get_mut(case.0) {
            entry.duration = Some(duration);
        }
    }

    /// Outcome of a case entry as rendered in the report.
    pub fn outcome(&self, case: CaseEntryId) -> Option<ReportLevel> {
        self.entries.lock().get(case.0).map(CaseEntry::outcome)
    }

    /// Renders the report and writes it to [`path`](Self::path).
    pub fn flush(&self) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, self.render())?;
        tracing::info!(path = %self.path.display(), "Test report written");
        Ok(self.path.clone())
    }

    fn render(&self) -> String {
        let entries = self.entries.lock().clone();
        let count = |level: ReportLevel| entries.iter().filter(|e| e.outcome() == level).count();

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Test Report</title>\n<style>\n");
        html.push_str(
            "body{font-family:sans-serif;margin:2em}table{border-collapse:collapse}\
             td,th{border:1px solid #ccc;padding:4px 8px;text-align:left}\
             .pass{color:#1a7f37}.fail{color:#cf222e}.skip{color:#9a6700}.info{color:#57606a}\n",
        );
        html.push_str("</style>\n</head>\n<body>\n");
        let _ = writeln!(
            html,
            "<h1>Test Report</h1>\n<p>Started {}</p>",
            self.started.format("%Y-%m-%d %H:%M:%S")
        );

        html.push_str("<h2>System</h2>\n<table>\n");
        for (key, value) in &self.system_info {
            let _ = writeln!(
                html,
                "<tr><th>{}</th><td>{}</td></tr>",
                escape(key),
                escape(value)
            );
        }
        html.push_str("</table>\n");

        let _ = writeln!(
            html,
            "<h2>Summary</h2>\n<p><span class=\"pass\">{} passed</span>, \
             <span class=\"fail\">{} failed</span>, <span class=\"skip\">{} skipped</span></p>",
            count(ReportLevel::Pass),
            count(ReportLevel::Fail),
            count(ReportLevel::Skip)
        );

        for entry in &entries {
            let outcome = entry.outcome();
            let _ = writeln!(
                html,
                "<section>\n<h3 class=\"{}\">{} [{}]</h3>",
                outcome.label(),
                escape(&entry.name),
                outcome.label()
            );
            if !entry.description.is_empty() {
                let _ = writeln!(html, "<p>{}</p>", escape(&entry.description));
            }
            let _ = write!(html, "<p>Started {}", entry.started.format("%H:%M:%S"));
            if let Some(duration) = entry.duration {
                let _ = write!(html, ", took {:.2}s", duration.as_secs_f64());
            }
            html.push_str("</p>\n<ul>\n");
            for (level, message) in &entry.lines {
                let _ = writeln!(
                    html,
                    "<li class=\"{}\">{}</li>",
                    level.label(),
                    escape(message)
                );
            }
            for shot in &entry.screenshots {
                let href = escape(&shot.to_string_lossy());
                let _ = writeln!(html, "<li><a href=\"{href}\">screenshot</a></li>");
            }
            html.push_str("</ul>\n</section>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Escapes `text` for HTML element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
