use anyhow::Result;
use author_tagger::cli::Cli;
use author_tagger::config::{self, RunConfig};
use author_tagger::logging;
use author_tagger::pipeline;
use author_tagger::record::BackupPolicy;
use author_tagger::report::{FileOutcome, RunReport, RunSummary, write_report};
use author_tagger::rules::RuleStats;
use clap::Parser;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    mode: BackupPolicy,
    project_dir: &'a str,
    report_path: Option<String>,
    rules: Option<RuleStats>,
    summary: &'a RunSummary,
    files: Vec<FileLine<'a>>,
}

#[derive(Debug, Serialize)]
struct FileLine<'a> {
    path: &'a str,
    type_name: Option<&'a str>,
    outcome: FileOutcome,
    authors: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::resolve(&cli)?;
    let subscriber = logging::subscriber(&config.log)?;

    let report = tracing::subscriber::with_default(subscriber, || run(&config))?;

    let output = summarize(&config, &report);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(config: &RunConfig) -> Result<RunReport> {
    let report = pipeline::run(config);
    if let Some((path, format)) = &config.report {
        write_report(&report, *format, path)?;
    }
    Ok(report)
}

fn summarize<'a>(config: &RunConfig, report: &'a RunReport) -> RunOutput<'a> {
    RunOutput {
        mode: report.mode,
        project_dir: &report.project_dir,
        report_path: config
            .report
            .as_ref()
            .map(|(path, _)| path.to_string_lossy().to_string()),
        rules: report.rules,
        summary: &report.summary,
        files: report
            .files
            .iter()
            .map(|f| FileLine {
                path: &f.path,
                type_name: f.type_name.as_deref(),
                outcome: f.outcome,
                authors: &f.authors,
                error: f.error.as_deref(),
            })
            .collect(),
    }
}
