//! File records and the working collection a run mutates.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::diff::DiffResult;
use crate::filter::{AuthorFilter, TypeNameFilter};

/// How the authors found on disk combine with the ones assigned by rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggingDisposition {
    #[default]
    Merge,
    Overwrite,
    Skip,
}

impl FromStr for TaggingDisposition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            _ => Err(s.to_string()),
        }
    }
}

/// Run-wide I/O routing of the rewrite stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackupPolicy {
    #[default]
    Backup,
    #[value(alias = "nobackup")]
    NoBackup,
    Restore,
    Test,
}

impl fmt::Display for BackupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Backup => "BACKUP",
            Self::NoBackup => "NO_BACKUP",
            Self::Restore => "RESTORE",
            Self::Test => "TEST",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    path: PathBuf,
    type_name: Option<String>,
    authors: Vec<String>,
    new_authors: Vec<String>,
    pub disposition: TaggingDisposition,
    type_declaration_line: Option<usize>,
    pub diff: Option<DiffResult>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            type_name: None,
            authors: Vec::new(),
            new_authors: Vec::new(),
            disposition: TaggingDisposition::default(),
            type_declaration_line: None,
            diff: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Sets the type name. Once a name is established it never changes.
    pub fn set_type_name(&mut self, type_name: String) -> bool {
        if self.type_name.is_some() {
            return false;
        }
        self.type_name = Some(type_name);
        true
    }

    /// Authors found in the file on disk.
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Authors assigned by the rule script.
    pub fn new_authors(&self) -> &[String] {
        &self.new_authors
    }

    pub fn type_declaration_line(&self) -> Option<usize> {
        self.type_declaration_line
    }

    pub fn set_type_declaration_line(&mut self, line: Option<usize>) {
        self.type_declaration_line = line;
    }

    pub fn add_existing_author(&mut self, author: &str) -> bool {
        push_unique(&mut self.authors, author)
    }

    pub fn add_author(&mut self, author: &str) -> bool {
        push_unique(&mut self.new_authors, author)
    }

    /// Removes every author equal to `author` from both lists.
    pub fn remove_author(&mut self, author: &str) -> usize {
        let before = self.authors.len() + self.new_authors.len();
        self.authors.retain(|a| a != author);
        self.new_authors.retain(|a| a != author);
        before - self.authors.len() - self.new_authors.len()
    }

    /// Removes every author accepted by `filter` from both lists.
    pub fn remove_matching_authors(&mut self, filter: &AuthorFilter) -> usize {
        let before = self.authors.len() + self.new_authors.len();
        self.authors.retain(|a| !filter.accept(Some(a.as_str())));
        self.new_authors.retain(|a| !filter.accept(Some(a.as_str())));
        before - self.authors.len() - self.new_authors.len()
    }

    /// The author list the rewrite stage emits for this record.
    pub fn written_authors(&self) -> Vec<String> {
        let mut written = Vec::new();
        match self.disposition {
            TaggingDisposition::Skip => {}
            TaggingDisposition::Merge => {
                for author in self.authors.iter().chain(self.new_authors.iter()) {
                    push_unique(&mut written, author);
                }
            }
            TaggingDisposition::Overwrite => {
                written.extend(self.new_authors.iter().cloned());
            }
        }
        written
    }
}

fn push_unique(list: &mut Vec<String>, author: &str) -> bool {
    if author.is_empty() || list.iter().any(|a| a == author) {
        return false;
    }
    list.push(author.to_string());
    true
}

/// Ordered working set of analyzed records.
#[derive(Debug, Clone, Default)]
pub struct FileRecords {
    records: Vec<FileRecord>,
}

impl FileRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record. Records without a type name are rejected.
    pub fn push(&mut self, record: FileRecord) -> bool {
        if record.type_name().is_none() {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, FileRecord> {
        self.records.iter_mut()
    }

    pub fn get(&self, type_name: &str) -> Option<&FileRecord> {
        self.records
            .iter()
            .find(|r| r.type_name() == Some(type_name))
    }

    pub fn matching<'a>(
        &'a self,
        filter: &'a TypeNameFilter,
    ) -> impl Iterator<Item = &'a FileRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| filter.accept(r.type_name()))
    }

    fn matching_mut<'a>(
        &'a mut self,
        filter: &'a TypeNameFilter,
    ) -> impl Iterator<Item = &'a mut FileRecord> + 'a {
        self.records
            .iter_mut()
            .filter(move |r| filter.accept(r.type_name()))
    }

    /// Adds `author` to every matching record; returns how many records changed.
    pub fn add_author(&mut self, filter: &TypeNameFilter, author: &str) -> usize {
        let mut changed = 0;
        for record in self.matching_mut(filter) {
            if record.add_author(author) {
                tracing::trace!("{} >> {:?}", author, record.type_name());
                changed += 1;
            }
        }
        changed
    }

    pub fn remove_author(&mut self, filter: &TypeNameFilter, author: &str) -> usize {
        self.matching_mut(filter)
            .map(|record| record.remove_author(author))
            .sum()
    }

    pub fn remove_matching_authors(
        &mut self,
        filter: &TypeNameFilter,
        author_filter: &AuthorFilter,
    ) -> usize {
        self.matching_mut(filter)
            .map(|record| record.remove_matching_authors(author_filter))
            .sum()
    }

    pub fn set_disposition(
        &mut self,
        filter: &TypeNameFilter,
        disposition: TaggingDisposition,
    ) -> usize {
        let mut count = 0;
        for record in self.matching_mut(filter) {
            record.disposition = disposition;
            count += 1;
        }
        count
    }

    /// Permanently drops every matching record; returns how many were dropped.
    pub fn skip(&mut self, filter: &TypeNameFilter) -> usize {
        let before = self.records.len();
        self.records.retain(|record| {
            let matched = filter.accept(record.type_name());
            if matched {
                tracing::trace!("DELETE :: {:?}", record.type_name());
            }
            !matched
        });
        before - self.records.len()
    }
}

impl IntoIterator for FileRecords {
    type Item = FileRecord;
    type IntoIter = std::vec::IntoIter<FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileRecords {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a mut FileRecords {
    type Item = &'a mut FileRecord;
    type IntoIter = std::slice::IterMut<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter_mut()
    }
}
