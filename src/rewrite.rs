//! Regenerates the authorship block of a Java file.
//!
//! Every file touched by a run has four roles on disk:
//!
//! - the live file,
//! - `<file>.at-save`, the backup taken in BACKUP mode,
//! - `<file>.at-temp`, the working copy, renamed into place when complete,
//! - `<file>.at-test`, the output of TEST mode, which never touches the live file.
//!
//! Lines are handled as raw bytes so that everything outside the authorship
//! block, line terminators included, is copied through unchanged.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::analyze::AUTHOR_PATTERN;
use crate::error::{Result, TaggerError};
use crate::record::{BackupPolicy, FileRecord, TaggingDisposition};

pub const BACKUP_SUFFIX: &str = ".at-save";
pub const TEMP_SUFFIX: &str = ".at-temp";
pub const TEST_SUFFIX: &str = ".at-test";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRoles {
    pub live: PathBuf,
    pub backup: PathBuf,
    pub temp: PathBuf,
    pub test: PathBuf,
}

impl FileRoles {
    pub fn for_path(path: &Path) -> Self {
        Self {
            live: path.to_path_buf(),
            backup: with_suffix(path, BACKUP_SUFFIX),
            temp: with_suffix(path, TEMP_SUFFIX),
            test: with_suffix(path, TEST_SUFFIX),
        }
    }

    /// Where the rewritten content ends up under `policy`.
    pub fn output(&self, policy: BackupPolicy) -> &Path {
        match policy {
            BackupPolicy::Test => &self.test,
            _ => &self.live,
        }
    }

    /// Where the pre-rewrite content can be read after a rewrite under `policy`.
    pub fn original(&self, policy: BackupPolicy) -> &Path {
        match policy {
            BackupPolicy::Backup => &self.backup,
            _ => &self.live,
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteOutcome {
    Rewritten,
    Skipped,
    Restored,
    NothingToRestore,
}

/// Position of the rewriter relative to the authorship block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    /// No doc comment is open and no authors were written yet.
    BeforeDoc,
    /// Inside a doc comment that has not received the authors yet.
    InsideDoc,
    /// Authors were written; old author tags up to the anchor are dropped.
    AuthorsEmitted,
    /// Past the anchor line; everything is copied verbatim.
    CopyingRemainder,
}

/// Line-at-a-time rewriter for the head of a file, up to the anchor line.
#[derive(Debug)]
pub struct AuthorBlockRewriter<'a> {
    authors: &'a [String],
    anchor: usize,
    state: RewriteState,
    line_no: usize,
    eol: &'static [u8],
}

impl<'a> AuthorBlockRewriter<'a> {
    pub fn new(authors: &'a [String], anchor: usize) -> Self {
        Self {
            authors,
            anchor,
            state: RewriteState::BeforeDoc,
            line_no: 0,
            eol: b"\n",
        }
    }

    pub fn state(&self) -> RewriteState {
        self.state
    }

    /// Processes one raw line, terminator included.
    pub fn push_line<W: Write>(&mut self, line: &[u8], out: &mut W) -> io::Result<()> {
        let ln = self.line_no;
        self.line_no += 1;
        if ln == 0 && line.ends_with(b"\r\n") {
            self.eol = b"\r\n";
        }

        if self.state == RewriteState::CopyingRemainder {
            return out.write_all(line);
        }

        let decoded = String::from_utf8_lossy(line);
        let text = decoded.trim_end_matches(['\n', '\r']);
        let at_anchor = ln == self.anchor;
        let is_author = AUTHOR_PATTERN.is_match(text);

        match self.state {
            RewriteState::BeforeDoc if at_anchor => {
                self.write_synthesized_doc(out)?;
                out.write_all(line)?;
            }
            RewriteState::BeforeDoc => {
                if opens_doc(text) && !closes_doc(&text[2..]) {
                    self.state = RewriteState::InsideDoc;
                }
                out.write_all(line)?;
            }
            RewriteState::InsideDoc if is_author => {
                self.write_authors(out)?;
                self.state = RewriteState::AuthorsEmitted;
            }
            RewriteState::InsideDoc if closes_doc(text) || at_anchor => {
                self.write_authors(out)?;
                self.state = RewriteState::AuthorsEmitted;
                out.write_all(line)?;
            }
            RewriteState::InsideDoc => out.write_all(line)?,
            RewriteState::AuthorsEmitted => {
                if !is_author {
                    out.write_all(line)?;
                }
            }
            RewriteState::CopyingRemainder => unreachable!("handled above"),
        }

        if at_anchor {
            self.state = RewriteState::CopyingRemainder;
        }
        Ok(())
    }

    fn write_authors<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for author in self.authors {
            out.write_all(b" * @author ")?;
            out.write_all(author.as_bytes())?;
            out.write_all(self.eol)?;
        }
        Ok(())
    }

    fn write_synthesized_doc<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.authors.is_empty() {
            return Ok(());
        }
        out.write_all(b"/**")?;
        out.write_all(self.eol)?;
        self.write_authors(out)?;
        out.write_all(b" */")?;
        out.write_all(self.eol)
    }
}

fn opens_doc(text: &str) -> bool {
    text.starts_with("/**")
}

fn closes_doc(text: &str) -> bool {
    text.trim_end().ends_with("*/")
}

/// Streams `reader` into `writer`, replacing the authorship block.
pub fn rewrite_stream<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    authors: &[String],
    anchor: usize,
) -> io::Result<()> {
    let mut rewriter = AuthorBlockRewriter::new(authors, anchor);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        rewriter.push_line(&buf, &mut writer)?;
    }
    writer.flush()
}

/// In-memory variant of [`rewrite_stream`].
pub fn rewrite_bytes(input: &[u8], authors: &[String], anchor: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + authors.len() * 32);
    let mut rewriter = AuthorBlockRewriter::new(authors, anchor);
    for line in input.split_inclusive(|b| *b == b'\n') {
        // writes into a Vec cannot fail
        let _ = rewriter.push_line(line, &mut out);
    }
    out
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Routes one record through `policy`: restores it, or rewrites its authorship
/// block into the live file or the test output.
///
/// A record without type name or anchor, or with disposition SKIP, is left
/// untouched on disk.
pub fn write_author_tags(record: &FileRecord, policy: BackupPolicy) -> Result<RewriteOutcome> {
    let roles = FileRoles::for_path(record.path());

    if policy == BackupPolicy::Restore {
        if !roles.backup.exists() {
            return Ok(RewriteOutcome::NothingToRestore);
        }
        tracing::debug!("Restoring {}", roles.live.display());
        remove_if_exists(&roles.live)
            .map_err(|e| TaggerError::rewrite_io(&roles.live, "remove", e))?;
        fs::rename(&roles.backup, &roles.live)
            .map_err(|e| TaggerError::rewrite_io(&roles.backup, "restore", e))?;
        return Ok(RewriteOutcome::Restored);
    }

    if policy != BackupPolicy::Test {
        remove_if_exists(&roles.test)
            .map_err(|e| TaggerError::rewrite_io(&roles.test, "remove stale test output", e))?;
    }
    if policy == BackupPolicy::NoBackup {
        remove_if_exists(&roles.backup)
            .map_err(|e| TaggerError::rewrite_io(&roles.backup, "remove stale backup", e))?;
    }

    let (Some(type_name), Some(anchor)) = (record.type_name(), record.type_declaration_line())
    else {
        tracing::info!("Skipping file: {}", roles.live.display());
        return Ok(RewriteOutcome::Skipped);
    };
    if record.disposition == TaggingDisposition::Skip {
        tracing::info!("Skipping file: {}", roles.live.display());
        return Ok(RewriteOutcome::Skipped);
    }

    tracing::info!("Processing type: {type_name}");
    let authors = record.written_authors();
    tracing::debug!("Final author list for {type_name} is: {authors:?}");

    if let Err(e) = write_working_copy(&roles, &authors, anchor) {
        let _ = fs::remove_file(&roles.temp);
        return Err(TaggerError::rewrite_io(&roles.live, "rewrite", e));
    }

    if let Err(e) = install_working_copy(&roles, policy) {
        let _ = fs::remove_file(&roles.temp);
        return Err(e);
    }

    Ok(RewriteOutcome::Rewritten)
}

/// Moves the finished working copy into the output slot of `policy`, taking
/// the backup first in BACKUP mode.
fn install_working_copy(roles: &FileRoles, policy: BackupPolicy) -> Result<()> {
    if policy == BackupPolicy::Backup {
        tracing::trace!("Backing up to: {}", roles.backup.display());
        remove_if_exists(&roles.backup)
            .map_err(|e| TaggerError::rewrite_io(&roles.backup, "remove stale backup", e))?;
        fs::rename(&roles.live, &roles.backup)
            .map_err(|e| TaggerError::rewrite_io(&roles.live, "back up", e))?;
    }

    let output = roles.output(policy);
    tracing::trace!("Writing {}", output.display());
    remove_if_exists(output).map_err(|e| TaggerError::rewrite_io(output, "replace", e))?;
    fs::rename(&roles.temp, output).map_err(|e| TaggerError::rewrite_io(output, "replace", e))
}

fn write_working_copy(roles: &FileRoles, authors: &[String], anchor: usize) -> io::Result<()> {
    let reader = BufReader::new(File::open(&roles.live)?);
    let writer = BufWriter::new(File::create(&roles.temp)?);
    rewrite_stream(reader, writer, authors, anchor)
}
