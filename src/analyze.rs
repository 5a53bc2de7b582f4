//! Line-based structural analysis of Java source files.
//!
//! No parser is involved: a single forward pass recognizes the package
//! declaration, existing `@author` tags, the first annotation and the first
//! public type declaration, then stops.
//!
//! Known limitations of the line shapes:
//!
//! - `package` must start the line,
//! - authors must look exactly like `" * @author name"`, one per line, and
//!   tags above the package statement are part of a file header, not authors,
//! - the first public type in the file is the one that counts, and `public`
//!   must start its line,
//! - comment and block nesting is not tracked.

use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Result, TaggerError};
use crate::record::{FileRecord, FileRecords};

pub static PACKAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^package\s+([^\s;]+)\s*;").expect("valid package regex"));

pub static AUTHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ \* @author (.*?)(?:\s+//.*)?$").expect("valid author regex")
});

pub static ANNOTATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@\S").expect("valid annotation regex"));

pub static TYPE_DECLARATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^public(?:\s+(?:@\S+|abstract|final|strictfp|sealed|non-sealed))*\s+(?:class|enum|@interface|interface|record)\s+(?P<name>[\p{L}_$][\p{L}\p{N}_$]*)",
    )
    .expect("valid type declaration regex")
});

/// Returns the author name if `line` is an author tag.
pub fn author_tag(line: &str) -> Option<&str> {
    AUTHOR_PATTERN
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub package_name: Option<String>,
    pub type_name: String,
    pub authors: Vec<String>,
    /// Zero-based line before which the authorship block belongs.
    pub type_declaration_line: Option<usize>,
}

/// Author tags and annotations before the package statement belong to a
/// file header. They only count when the file has no package statement.
#[derive(Debug, Default)]
struct LineScan {
    package_name: Option<String>,
    short_name: Option<String>,
    authors: Vec<String>,
    header_authors: Vec<String>,
    package_line: Option<usize>,
    annotation_line: Option<usize>,
    header_annotation_line: Option<usize>,
    type_line: Option<usize>,
}

impl LineScan {
    /// Feeds one line; returns `true` once the type declaration was found.
    fn feed(&mut self, ln: usize, line: &str) -> bool {
        if let Some(caps) = PACKAGE_PATTERN.captures(line) {
            if self.package_line.is_none() {
                self.package_line = Some(ln);
                self.package_name = Some(caps[1].trim().to_string());
            }
        } else if let Some(author) = author_tag(line) {
            let authors = if self.package_line.is_some() {
                &mut self.authors
            } else {
                &mut self.header_authors
            };
            if !authors.iter().any(|a| a == author) {
                authors.push(author.to_string());
            }
        } else if ANNOTATION_PATTERN.is_match(line) {
            if self.package_line.is_some() {
                self.annotation_line.get_or_insert(ln);
            } else {
                self.header_annotation_line.get_or_insert(ln);
            }
        } else if let Some(caps) = TYPE_DECLARATION_PATTERN.captures(line) {
            self.type_line = Some(ln);
            self.short_name = Some(caps["name"].to_string());
            return true;
        }
        false
    }

    fn finish(mut self, file_stem: &str) -> Option<Analysis> {
        if self.package_line.is_none() {
            self.authors = std::mem::take(&mut self.header_authors);
            self.annotation_line = self.header_annotation_line.take();
        }
        let type_declaration_line = self
            .annotation_line
            .or(self.type_line)
            .or(self.header_annotation_line)
            .or(self.package_line);

        let type_name = match (&self.package_name, self.short_name) {
            (Some(pkg), Some(name)) => format!("{pkg}.{name}"),
            (None, Some(name)) => name,
            (Some(pkg), None) if !file_stem.is_empty() => format!("{pkg}.{file_stem}"),
            _ => return None,
        };

        Some(Analysis {
            package_name: self.package_name,
            type_name,
            authors: self.authors,
            type_declaration_line,
        })
    }
}

pub fn analyze_source(source: &str, file_stem: &str) -> Option<Analysis> {
    let mut scan = LineScan::default();
    for (ln, line) in source.lines().enumerate() {
        if scan.feed(ln, line) {
            break;
        }
    }
    scan.finish(file_stem)
}

/// Reads lines from `reader` until the type declaration is found.
pub fn analyze_reader<R: BufRead>(mut reader: R, file_stem: &str) -> io::Result<Option<Analysis>> {
    let mut scan = LineScan::default();
    let mut buf = Vec::new();
    let mut ln = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if scan.feed(ln, line.trim_end_matches(['\n', '\r'])) {
            break;
        }
        ln += 1;
    }
    Ok(scan.finish(file_stem))
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
}

/// Fills in type name, existing authors and anchor line of `record`.
pub fn analyze_record(record: &mut FileRecord) -> Result<()> {
    tracing::trace!("Analyzing .java file: {}", record.path().display());
    let path = record.path().to_path_buf();
    let failure = |reason: String| TaggerError::Analysis {
        path: path.clone(),
        reason,
    };

    let file = File::open(&path).map_err(|e| failure(e.to_string()))?;
    let analysis = analyze_reader(BufReader::new(file), file_stem(&path))
        .map_err(|e| failure(e.to_string()))?
        .ok_or_else(|| failure("no type declaration or package statement".to_string()))?;

    record.set_type_name(analysis.type_name);
    for author in &analysis.authors {
        record.add_existing_author(author);
    }
    record.set_type_declaration_line(analysis.type_declaration_line);
    tracing::trace!(
        "{:?} anchored at line {:?}, authors {:?}",
        record.type_name(),
        record.type_declaration_line(),
        record.authors()
    );
    Ok(())
}

/// Analyzes every record, keeping the ones that yield a type name.
///
/// Returns the working collection and the number of discarded records.
pub fn analyze_records(records: Vec<FileRecord>) -> (FileRecords, usize) {
    tracing::debug!("Analyzing {} .java files", records.len());
    let mut analyzed = FileRecords::new();
    let mut discarded = 0usize;
    for mut record in records {
        match analyze_record(&mut record) {
            Ok(()) => {
                analyzed.push(record);
            }
            Err(e) => {
                tracing::warn!("Discarding file: {e}");
                discarded += 1;
            }
        }
    }
    (analyzed, discarded)
}
