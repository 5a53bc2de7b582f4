//! Run report: what happened to every file, with the diffs for auditing.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::Path;

use crate::diff::DiffResult;
use crate::record::{BackupPolicy, TaggingDisposition};
use crate::rules::RuleStats;

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Html,
    Json,
    Text,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Rewritten,
    Unchanged,
    Skipped,
    Failed,
    Restored,
    NothingToRestore,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub type_name: Option<String>,
    pub disposition: TaggingDisposition,
    pub outcome: FileOutcome,
    pub authors: Vec<String>,
    pub original_hash: Option<String>,
    pub rewritten_hash: Option<String>,
    pub diff: Option<DiffResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub enumerated: usize,
    pub analyzed: usize,
    pub discarded: usize,
    pub skipped_by_rules: usize,
    pub rewritten: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub restored: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: BackupPolicy,
    pub project_dir: String,
    pub source_root: String,
    pub rules: Option<RuleStats>,
    pub summary: RunSummary,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn file(&self, type_name: &str) -> Option<&FileReport> {
        self.files
            .iter()
            .find(|f| f.type_name.as_deref() == Some(type_name))
    }
}

pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    hex::encode(digest)
}

pub fn render(report: &RunReport, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
        ReportFormat::Text => render_text(report),
        ReportFormat::Html => render_html(report),
    })
}

pub fn write_report(report: &RunReport, format: ReportFormat, path: &Path) -> Result<()> {
    let content = render(report, format)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    tracing::info!("Report generated into file: {}", path.display());
    Ok(())
}

fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let s = &report.summary;
    let _ = writeln!(out, "mode: {}", report.mode);
    let _ = writeln!(out, "project_dir: {}", report.project_dir);
    let _ = writeln!(
        out,
        "files: {} enumerated, {} analyzed, {} rewritten, {} unchanged, {} skipped, {} failed",
        s.enumerated, s.analyzed, s.rewritten, s.unchanged, s.skipped, s.failed
    );
    for file in &report.files {
        let _ = writeln!(
            out,
            "\n== {} ({:?})",
            file.type_name.as_deref().unwrap_or(&file.path),
            file.outcome
        );
        if !file.authors.is_empty() {
            let _ = writeln!(out, "authors: {}", file.authors.join(", "));
        }
        if let Some(error) = &file.error {
            let _ = writeln!(out, "error: {error}");
        }
        if let Some(diff) = &file.diff {
            for line in &diff.unified {
                let _ = writeln!(out, "{line}");
            }
        }
    }
    out
}

fn render_html(report: &RunReport) -> String {
    let mut out = String::new();
    let s = &report.summary;
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Author tagging report</title>\n<style>\n");
    out.push_str("body{font-family:sans-serif}pre{background:#f6f8fa;padding:8px}\n");
    out.push_str(".add{color:#22863a}.del{color:#b31d28}.hunk{color:#6f42c1}\n");
    out.push_str("</style>\n</head>\n<body>\n");
    let _ = writeln!(
        out,
        "<h1>Author tagging report</h1>\n<p>Project: <code>{}</code>, mode: {}</p>",
        html_escape::encode_text(&report.project_dir),
        report.mode
    );
    let _ = writeln!(
        out,
        "<p>{} files enumerated, {} analyzed, {} rewritten, {} unchanged, {} skipped, {} failed.</p>",
        s.enumerated, s.analyzed, s.rewritten, s.unchanged, s.skipped, s.failed
    );

    for file in &report.files {
        let title = file.type_name.as_deref().unwrap_or(&file.path);
        let _ = writeln!(
            out,
            "<h2>{} <small>{:?}</small></h2>",
            html_escape::encode_text(title),
            file.outcome
        );
        if !file.authors.is_empty() {
            out.push_str("<ul>\n");
            for author in &file.authors {
                let _ = writeln!(out, "<li>{}</li>", html_escape::encode_text(author));
            }
            out.push_str("</ul>\n");
        }
        if let Some(error) = &file.error {
            let _ = writeln!(out, "<p class=\"del\">{}</p>", html_escape::encode_text(error));
        }
        if let Some(diff) = file.diff.as_ref().filter(|d| !d.is_empty()) {
            out.push_str("<pre>");
            for line in &diff.unified {
                let class = if line.starts_with("@@") {
                    "hunk"
                } else if line.starts_with('+') {
                    "add"
                } else if line.starts_with('-') {
                    "del"
                } else {
                    "ctx"
                };
                let _ = writeln!(
                    out,
                    "<span class=\"{class}\">{}</span>",
                    html_escape::encode_text(line)
                );
            }
            out.push_str("</pre>\n");
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}
