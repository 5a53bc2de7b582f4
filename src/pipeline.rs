//! One tagging run: enumerate, analyze, apply rules, then rewrite and diff
//! each file in turn.
//!
//! Failures are local to the file or the rule script that caused them. They
//! are logged, recorded in the report, and the run goes on.

use std::path::Path;

use crate::analyze::analyze_records;
use crate::config::RunConfig;
use crate::diff;
use crate::error::TaggerError;
use crate::record::{BackupPolicy, FileRecord, FileRecords};
use crate::report::{FileOutcome, FileReport, RunReport, RunSummary, hash_content};
use crate::rewrite::{FileRoles, RewriteOutcome, write_author_tags};
use crate::rules::{self, RuleStats};
use crate::scan::enumerate_records;

pub fn run(config: &RunConfig) -> RunReport {
    tracing::info!("Author tagging running in {} mode", config.policy);
    tracing::info!(
        "Enumerating .java files in directory: {}",
        config.source_root.display()
    );
    let records = enumerate_records(&config.source_root);

    let mut summary = RunSummary {
        enumerated: records.len(),
        ..Default::default()
    };
    let mut files = Vec::new();
    let mut rule_stats = None;

    if config.policy == BackupPolicy::Restore {
        tracing::info!("Restoring backup files");
        for record in &records {
            let report = restore_record(record);
            match report.outcome {
                FileOutcome::Restored => summary.restored += 1,
                FileOutcome::Failed => summary.failed += 1,
                _ => {}
            }
            files.push(report);
        }
    } else {
        tracing::info!("Analyzing {} .java files", records.len());
        let (mut analyzed, discarded) = analyze_records(records);
        summary.analyzed = analyzed.len();
        summary.discarded = discarded;

        tracing::info!("Reading rule script and tagging (in memory)");
        rule_stats = apply_rule_script(&config.rules_path, &mut analyzed);
        summary.skipped_by_rules = rule_stats.map_or(0, |s| s.skipped_records);

        tracing::info!("Writing to disk");
        for record in &mut analyzed {
            let report = process_record(record, config.policy);
            match report.outcome {
                FileOutcome::Rewritten => summary.rewritten += 1,
                FileOutcome::Unchanged => summary.unchanged += 1,
                FileOutcome::Skipped => summary.skipped += 1,
                FileOutcome::Failed => summary.failed += 1,
                FileOutcome::Restored | FileOutcome::NothingToRestore => {}
            }
            files.push(report);
        }
    }

    tracing::info!("Done!");
    RunReport {
        mode: config.policy,
        project_dir: config.project_dir.to_string_lossy().to_string(),
        source_root: config.source_root.to_string_lossy().to_string(),
        rules: rule_stats,
        summary,
        files,
    }
}

fn apply_rule_script(
    path: &Path,
    records: &mut FileRecords,
) -> Option<RuleStats> {
    match rules::load_and_apply(path, records) {
        Ok(stats) => Some(stats),
        Err(e @ TaggerError::ConfigNotFound { .. }) => {
            tracing::error!("{}; no rules applied", e.chain());
            None
        }
        Err(e) => {
            tracing::error!("{}; rule interpretation stopped early", e.chain());
            None
        }
    }
}

fn base_report(record: &FileRecord, outcome: FileOutcome) -> FileReport {
    FileReport {
        path: record.path().to_string_lossy().to_string(),
        type_name: record.type_name().map(str::to_string),
        disposition: record.disposition,
        outcome,
        authors: Vec::new(),
        original_hash: None,
        rewritten_hash: None,
        diff: None,
        error: None,
    }
}

fn restore_record(record: &FileRecord) -> FileReport {
    match write_author_tags(record, BackupPolicy::Restore) {
        Ok(RewriteOutcome::Restored) => base_report(record, FileOutcome::Restored),
        Ok(_) => base_report(record, FileOutcome::NothingToRestore),
        Err(e) => {
            tracing::error!("{}", e.chain());
            FileReport {
                error: Some(e.chain()),
                ..base_report(record, FileOutcome::Failed)
            }
        }
    }
}

/// Rewrites one record and attaches the diff between its pre- and post-image.
pub fn process_record(record: &mut FileRecord, policy: BackupPolicy) -> FileReport {
    let roles = FileRoles::for_path(record.path());
    let before = match std::fs::read(record.path()) {
        Ok(bytes) => bytes,
        Err(source) => {
            let e = TaggerError::rewrite_io(record.path(), "read", source);
            tracing::error!("{}", e.chain());
            return FileReport {
                error: Some(e.chain()),
                ..base_report(record, FileOutcome::Failed)
            };
        }
    };

    let mut report = base_report(record, FileOutcome::Skipped);
    report.original_hash = Some(hash_content(&before));

    match write_author_tags(record, policy) {
        Ok(RewriteOutcome::Rewritten) => {}
        Ok(_) => return report,
        Err(e) => {
            tracing::error!("Error while writing author tags: {}", e.chain());
            report.outcome = FileOutcome::Failed;
            report.error = Some(e.chain());
            return report;
        }
    }

    report.authors = record.written_authors();
    let output = roles.output(policy);
    match std::fs::read(output) {
        Ok(after) => {
            let result = diff::calculate(
                &file_name(roles.original(policy)),
                &file_name(output),
                &to_lines(&before),
                &to_lines(&after),
            );
            report.outcome = if result.is_empty() {
                FileOutcome::Unchanged
            } else {
                FileOutcome::Rewritten
            };
            report.rewritten_hash = Some(hash_content(&after));
            report.diff = Some(result.clone());
            record.diff = Some(result);
        }
        Err(source) => {
            let e = TaggerError::DiffUnavailable {
                path: output.to_path_buf(),
                source,
            };
            tracing::warn!("{}", e.chain());
            report.outcome = FileOutcome::Rewritten;
        }
    }
    report
}

fn to_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
