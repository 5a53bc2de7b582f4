//! Interpreter for the `.authors` rule script.
//!
//! The script is read top to bottom, one line at a time. After stripping a
//! trailing `#` comment and surrounding whitespace a line is one of:
//!
//! ```text
//! $ <type filter> [merge|overwrite|skip]   selection block header
//! @ <author>                               author block header
//! ! <skip|merge|overwrite>                 selection block: drop records / set disposition
//! + <author>                               selection block: add author
//! + <type filter>                          author block: add the block's author
//! - <author filter>                        selection block: remove matching authors
//! - <type filter>                          author block: remove the block's author
//! ```
//!
//! Anything else is ignored, so free-form notes may sit between rules.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, TaggerError};
use crate::filter::{AuthorFilter, TypeNameFilter};
use crate::record::{FileRecords, TaggingDisposition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleLine {
    Selection {
        filter: String,
        disposition: Option<String>,
    },
    Author(String),
    Command(String),
    Add(String),
    Remove(String),
    /// A `$` or `@` header that cannot be used; it still closes the open block.
    MalformedHeader(String),
    Inert,
}

impl RuleLine {
    pub fn parse(raw: &str) -> Self {
        let line = match raw.find('#') {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let line = line.trim();

        let Some(lead) = line.chars().next() else {
            return Self::Inert;
        };
        let rest = line[lead.len_utf8()..].trim();

        match lead {
            '$' => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(filter), disposition, None) => Self::Selection {
                        filter: filter.to_string(),
                        disposition: disposition.map(str::to_string),
                    },
                    _ => Self::MalformedHeader(line.to_string()),
                }
            }
            '@' if rest.is_empty() => Self::MalformedHeader(line.to_string()),
            '@' => Self::Author(rest.to_string()),
            '!' if !rest.is_empty() => Self::Command(rest.to_string()),
            '+' if !rest.is_empty() => Self::Add(rest.to_string()),
            '-' if !rest.is_empty() => Self::Remove(rest.to_string()),
            _ => Self::Inert,
        }
    }
}

#[derive(Debug)]
enum Block {
    None,
    Selection(Option<TypeNameFilter>),
    Author(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RuleStats {
    pub lines: usize,
    pub skipped_records: usize,
    pub added: usize,
    pub removed: usize,
}

/// Applies rules to the collection, one line at a time.
#[derive(Debug)]
pub struct RuleInterpreter {
    block: Block,
    stats: RuleStats,
}

impl Default for RuleInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleInterpreter {
    pub fn new() -> Self {
        Self {
            block: Block::None,
            stats: RuleStats::default(),
        }
    }

    pub fn stats(&self) -> RuleStats {
        self.stats
    }

    pub fn apply_line(&mut self, raw: &str, records: &mut FileRecords) {
        self.stats.lines += 1;
        match RuleLine::parse(raw) {
            RuleLine::Inert => {}
            RuleLine::MalformedHeader(line) => {
                tracing::warn!("Ignoring malformed block header `{line}`; following operations are inert");
                self.block = Block::None;
            }
            RuleLine::Selection {
                filter,
                disposition,
            } => {
                let filter = compile(TypeNameFilter::new(&filter));
                if let Some(filter) = &filter {
                    tracing::debug!(
                        "$ {} selects {} files",
                        filter.filter(),
                        records.matching(filter).count()
                    );
                    if let Some(token) = disposition {
                        set_disposition(records, filter, &token);
                    }
                }
                self.block = Block::Selection(filter);
            }
            RuleLine::Author(author) => {
                self.block = Block::Author(author);
            }
            RuleLine::Command(param) => match &self.block {
                Block::Selection(Some(filter)) => {
                    if param.eq_ignore_ascii_case("skip") {
                        let skipped = records.skip(filter);
                        tracing::debug!("!skip {} >> {} files", filter.filter(), skipped);
                        self.stats.skipped_records += skipped;
                    } else {
                        set_disposition(records, filter, &param);
                    }
                }
                Block::Author(author) => {
                    tracing::debug!("Ignoring `!{param}` in author block `@ {author}`");
                }
                _ => {}
            },
            RuleLine::Add(param) => match &self.block {
                Block::Selection(Some(filter)) => {
                    let added = records.add_author(filter, &param);
                    tracing::debug!("@author {} >> {} files", param, added);
                    self.stats.added += added;
                }
                Block::Author(author) => {
                    if let Some(filter) = compile(TypeNameFilter::new(&param)) {
                        let added = records.add_author(&filter, author);
                        tracing::debug!("@author {} >> {} files", author, added);
                        self.stats.added += added;
                    }
                }
                _ => {}
            },
            RuleLine::Remove(param) => match &self.block {
                Block::Selection(Some(filter)) => {
                    if let Some(author_filter) = compile(AuthorFilter::new(&param)) {
                        let removed = records.remove_matching_authors(filter, &author_filter);
                        tracing::debug!("{} << {} authors removed", param, removed);
                        self.stats.removed += removed;
                    }
                }
                Block::Author(author) => {
                    if let Some(filter) = compile(TypeNameFilter::new(&param)) {
                        let removed = records.remove_author(&filter, author);
                        tracing::debug!("{} << {} authors removed", author, removed);
                        self.stats.removed += removed;
                    }
                }
                _ => {}
            },
        }
    }

    /// Interprets every line from `reader`. A read error stops interpretation,
    /// leaving the changes made so far in place.
    pub fn apply_reader<R: BufRead>(&mut self, reader: R, records: &mut FileRecords) -> io::Result<()> {
        for line in reader.lines() {
            self.apply_line(&line?, records);
        }
        Ok(())
    }
}

fn compile<T>(filter: Result<T>) -> Option<T> {
    match filter {
        Ok(f) => Some(f),
        Err(e) => {
            tracing::warn!("{e}");
            None
        }
    }
}

fn set_disposition(records: &mut FileRecords, filter: &TypeNameFilter, token: &str) {
    match token.parse::<TaggingDisposition>() {
        Ok(disposition) => {
            let count = records.set_disposition(filter, disposition);
            tracing::debug!(
                "Setting tagging mode to {:?} for {} .java files",
                disposition,
                count
            );
        }
        Err(unknown) => tracing::warn!("Invalid tagging mode: {unknown}"),
    }
}

pub fn apply_rules(source: &str, records: &mut FileRecords) -> RuleStats {
    let mut interpreter = RuleInterpreter::new();
    for line in source.lines() {
        interpreter.apply_line(line, records);
    }
    interpreter.stats()
}

/// Loads the rule script at `path` and applies it to `records`.
pub fn load_and_apply(path: &Path, records: &mut FileRecords) -> Result<RuleStats> {
    let file = File::open(path).map_err(|source| TaggerError::ConfigNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let mut interpreter = RuleInterpreter::new();
    interpreter
        .apply_reader(BufReader::new(file), records)
        .map_err(|source| TaggerError::RuleRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(interpreter.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileRecord;
    use indoc::indoc;

    fn records(entries: &[(&str, &[&str])]) -> FileRecords {
        let mut all = FileRecords::new();
        for (name, authors) in entries {
            let mut r = FileRecord::new(format!("{name}.java"));
            r.set_type_name(name.to_string());
            for a in *authors {
                r.add_existing_author(a);
            }
            all.push(r);
        }
        all
    }

    #[test]
    fn parses_line_shapes() {
        assert_eq!(
            RuleLine::parse("$\tp.*   # comment"),
            RuleLine::Selection {
                filter: "p.*".to_string(),
                disposition: None
            }
        );
        assert_eq!(
            RuleLine::parse("$ p.* OVERWRITE"),
            RuleLine::Selection {
                filter: "p.*".to_string(),
                disposition: Some("OVERWRITE".to_string())
            }
        );
        assert_eq!(RuleLine::parse("@ Jane Doe "), RuleLine::Author("Jane Doe".to_string()));
        assert_eq!(RuleLine::parse("  + Jane Doe"), RuleLine::Add("Jane Doe".to_string()));
        assert_eq!(RuleLine::parse("-J*"), RuleLine::Remove("J*".to_string()));
        assert_eq!(RuleLine::parse("!Skip"), RuleLine::Command("Skip".to_string()));
        assert_eq!(RuleLine::parse("just some prose"), RuleLine::Inert);
        assert_eq!(RuleLine::parse("# only a comment"), RuleLine::Inert);
        assert_eq!(RuleLine::parse("+"), RuleLine::Inert);
        assert_eq!(
            RuleLine::parse("$ q.B overwrite now"),
            RuleLine::MalformedHeader("$ q.B overwrite now".to_string())
        );
        assert_eq!(RuleLine::parse("$"), RuleLine::MalformedHeader("$".to_string()));
        assert_eq!(RuleLine::parse("@ "), RuleLine::MalformedHeader("@".to_string()));
        assert_eq!(RuleLine::parse(""), RuleLine::Inert);
    }

    #[test]
    fn selection_block_adds_authors_to_matching_records() {
        let mut all = records(&[("p.C", &["Old Name"]), ("q.D", &[])]);
        let stats = apply_rules(
            indoc! {"
                $ p.C
                + New Name
                + New Name
            "},
            &mut all,
        );
        assert_eq!(stats.added, 1);
        assert_eq!(all.get("p.C").unwrap().written_authors(), ["Old Name", "New Name"]);
        assert!(all.get("q.D").unwrap().new_authors().is_empty());
    }

    #[test]
    fn author_block_adds_author_to_each_filter() {
        let mut all = records(&[("p.A", &[]), ("p.sub.B", &[]), ("q.C", &[])]);
        apply_rules(
            indoc! {"
                @ Jane
                + p.**
                + C
            "},
            &mut all,
        );
        assert_eq!(all.get("p.A").unwrap().new_authors(), ["Jane"]);
        assert_eq!(all.get("p.sub.B").unwrap().new_authors(), ["Jane"]);
        assert_eq!(all.get("q.C").unwrap().new_authors(), ["Jane"]);
    }

    #[test]
    fn remove_in_selection_uses_author_filter() {
        let mut all = records(&[("p.A", &["John Smith", "Jane Roe", "Johnny"]), ("q.B", &["John Smith"])]);
        let stats = apply_rules("$ p.*\n- John*\n", &mut all);
        assert_eq!(stats.removed, 2);
        assert_eq!(all.get("p.A").unwrap().authors(), ["Jane Roe"]);
        assert_eq!(all.get("q.B").unwrap().authors(), ["John Smith"]);
    }

    #[test]
    fn remove_in_author_block_removes_that_author_from_matching_types() {
        let mut all = records(&[("p.A", &["John", "Johnny"]), ("q.B", &["John"])]);
        apply_rules("@ John\n- p.*\n", &mut all);
        assert_eq!(all.get("p.A").unwrap().authors(), ["Johnny"]);
        assert_eq!(all.get("q.B").unwrap().authors(), ["John"]);
    }

    #[test]
    fn skip_removes_records_from_collection() {
        let mut all = records(&[("p.A", &[]), ("p.B", &[]), ("q.C", &[])]);
        let stats = apply_rules("$ p.*\n! SKIP\n+ Late\n", &mut all);
        assert_eq!(stats.skipped_records, 2);
        assert_eq!(all.len(), 1);
        assert!(all.get("q.C").unwrap().new_authors().is_empty());
    }

    #[test]
    fn skip_in_author_block_is_ignored() {
        let mut all = records(&[("p.A", &[])]);
        apply_rules("@ Jane\n!skip\n", &mut all);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn header_and_command_set_disposition_unknown_tokens_ignored() {
        let mut all = records(&[("p.A", &["Old"]), ("q.B", &["Old"]), ("r.C", &[])]);
        apply_rules(
            indoc! {"
                $ p.A overwrite
                + New
                $ q.B
                !skip-ish
                !merge
                $ r.C sometimes
            "},
            &mut all,
        );
        assert_eq!(all.get("p.A").unwrap().disposition, TaggingDisposition::Overwrite);
        assert_eq!(all.get("p.A").unwrap().written_authors(), ["New"]);
        assert_eq!(all.get("q.B").unwrap().disposition, TaggingDisposition::Merge);
        assert_eq!(all.get("r.C").unwrap().disposition, TaggingDisposition::Merge);
    }

    #[test]
    fn operations_without_block_are_no_ops() {
        let mut all = records(&[("p.A", &["Old"])]);
        apply_rules("+ New\n- Old\n!skip\n", &mut all);
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("p.A").unwrap().written_authors(), ["Old"]);
    }

    #[test]
    fn block_headers_reset_each_other() {
        let mut all = records(&[("p.A", &[])]);
        apply_rules("$ p.A\n@ Jane\n+ Bob\n", &mut all);
        // `+ Bob` runs in the author block, where Bob is a type filter
        assert!(all.get("p.A").unwrap().new_authors().is_empty());
    }

    #[test]
    fn malformed_header_closes_previous_block() {
        let mut all = records(&[("p.A", &[]), ("q.B", &[])]);
        apply_rules("$ p.A\n+ X\n$ q.B overwrite now\n+ Y\n- X\n", &mut all);
        assert_eq!(all.get("p.A").unwrap().new_authors(), ["X"]);
        assert!(all.get("q.B").unwrap().new_authors().is_empty());
        assert_eq!(all.get("q.B").unwrap().disposition, TaggingDisposition::Merge);

        apply_rules("@ Jane\n@\n+ p.A\n", &mut all);
        assert_eq!(all.get("p.A").unwrap().new_authors(), ["X"]);
    }

    #[test]
    fn invalid_filter_disables_block_without_panicking() {
        let mut all = records(&[("p.A", &[])]);
        apply_rules("$ /(broken/\n+ X\n", &mut all);
        assert!(all.get("p.A").unwrap().new_authors().is_empty());
    }

    #[test]
    fn missing_script_reports_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut all = records(&[("p.A", &[])]);
        let err = load_and_apply(&dir.path().join(".authors"), &mut all).unwrap_err();
        assert!(matches!(err, TaggerError::ConfigNotFound { .. }));
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn read_error_keeps_changes_made_so_far() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".authors");
        let mut bytes = b"$ p.A\n+ Before\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"+ After\n");
        std::fs::write(&path, bytes).unwrap();

        let mut all = records(&[("p.A", &[])]);
        let err = load_and_apply(&path, &mut all).unwrap_err();
        assert!(matches!(err, TaggerError::RuleRead { .. }));
        assert_eq!(all.get("p.A").unwrap().new_authors(), ["Before"]);
    }
}
