use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::record::BackupPolicy;
use crate::report::ReportFormat;

#[derive(Debug, Clone, Parser)]
#[command(name = "author-tagger")]
#[command(about = "Rewrite @author tags of the Java files in a project according to its .authors rules")]
#[command(
    long_about = "Rewrite @author tags of the Java files in a project according to its .authors rules.\n\n\
    backup (default) keeps the previous version of every rewritten file next to it,\n\
    no-backup deletes previous backups, test writes the results into separate files\n\
    and leaves the sources untouched, restore puts the backups of the previous run back."
)]
pub struct Cli {
    #[arg(value_name = "PROJECT_DIR")]
    pub project_dir: PathBuf,

    #[arg(value_enum, value_name = "MODE", default_value_t = BackupPolicy::Backup)]
    pub mode: BackupPolicy,

    /// Rule script, defaults to PROJECT_DIR/.authors
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Source root, defaults to PROJECT_DIR/src when it exists
    #[arg(long, value_name = "DIR")]
    pub src: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value_t = ReportFormat::Html)]
    pub report_format: ReportFormat,

    #[arg(long)]
    pub no_report: bool,

    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_is_an_optional_positional() {
        let cli = Cli::parse_from(["author-tagger", "proj"]);
        assert_eq!(cli.mode, BackupPolicy::Backup);

        let cli = Cli::parse_from(["author-tagger", "proj", "nobackup", "-vv"]);
        assert_eq!(cli.mode, BackupPolicy::NoBackup);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["author-tagger", "proj", "test", "-f", "json"]);
        assert_eq!(cli.mode, BackupPolicy::Test);
        assert_eq!(cli.report_format, ReportFormat::Json);
    }
}
