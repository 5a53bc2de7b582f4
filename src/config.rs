use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::logging::LogSettings;
use crate::record::BackupPolicy;
use crate::report::ReportFormat;

pub const RULES_FILE: &str = ".authors";
pub const REPORT_FILE_STEM: &str = ".authors-diff-report";
pub const DEFAULT_SOURCE_DIR: &str = "src";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub project_dir: PathBuf,
    pub source_root: PathBuf,
    pub rules_path: PathBuf,
    pub policy: BackupPolicy,
    pub report: Option<(PathBuf, ReportFormat)>,
    pub log: LogSettings,
}

impl RunConfig {
    /// Defaults for `project_dir`: rules in `.authors`, sources under `src/`
    /// when present, no report.
    pub fn for_project(project_dir: &Path, policy: BackupPolicy) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            source_root: default_source_root(project_dir),
            rules_path: project_dir.join(RULES_FILE),
            policy,
            report: None,
            log: LogSettings::default(),
        }
    }
}

pub fn resolve(cli: &Cli) -> Result<RunConfig> {
    let project_dir = &cli.project_dir;
    if !project_dir.is_dir() {
        anyhow::bail!(
            "Project directory does not exist or is not a directory: {}",
            project_dir.display()
        );
    }
    let project_dir = project_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve project directory: {}", project_dir.display()))?;

    let mut config = RunConfig::for_project(&project_dir, cli.mode);
    if let Some(src) = cli.src.clone() {
        config.source_root = src;
    }
    if let Some(rules) = cli.rules.clone() {
        config.rules_path = rules;
    }
    config.report = resolve_report(cli, &project_dir);
    config.log = LogSettings::from_verbosity(cli.verbose, cli.quiet, cli.log_file.clone());
    Ok(config)
}

fn resolve_report(cli: &Cli, project_dir: &Path) -> Option<(PathBuf, ReportFormat)> {
    if cli.no_report || cli.mode == BackupPolicy::Restore {
        return None;
    }
    let path = cli.report.clone().unwrap_or_else(|| {
        project_dir.join(format!(
            "{REPORT_FILE_STEM}.{}",
            cli.report_format.extension()
        ))
    });
    Some((path, cli.report_format))
}

fn default_source_root(project_dir: &Path) -> PathBuf {
    let src = project_dir.join(DEFAULT_SOURCE_DIR);
    if src.is_dir() {
        src
    } else {
        project_dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_point_into_project_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("src"))?;
        let cli = Cli::parse_from(["author-tagger", dir.path().to_str().unwrap()]);

        let config = resolve(&cli)?;
        let root = dir.path().canonicalize()?;
        assert_eq!(config.source_root, root.join("src"));
        assert_eq!(config.rules_path, root.join(".authors"));
        assert_eq!(
            config.report,
            Some((root.join(".authors-diff-report.html"), ReportFormat::Html))
        );
        assert_eq!(config.policy, BackupPolicy::Backup);
        Ok(())
    }

    #[test]
    fn source_root_falls_back_to_project_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = RunConfig::for_project(dir.path(), BackupPolicy::Test);
        assert_eq!(config.source_root, dir.path());
        Ok(())
    }

    #[test]
    fn restore_mode_writes_no_report() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cli = Cli::parse_from(["author-tagger", dir.path().to_str().unwrap(), "restore"]);
        assert_eq!(resolve(&cli)?.report, None);
        Ok(())
    }

    #[test]
    fn missing_project_dir_is_rejected() {
        let cli = Cli::parse_from(["author-tagger", "/definitely/not/here"]);
        assert!(resolve(&cli).is_err());
    }
}
