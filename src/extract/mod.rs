//! # Extraction Module
//!
//! Reads an archive stream record by record and recreates each file on disk
//! before moving to the next. [`ArchiveReader`] is the low-level pull API;
//! [`extract_archive`] and [`list_entries`] drive it.
//!
//! The format has no resynchronization point, so any framing error, short
//! read, or failure to write a destination ends the pass. Entry names are
//! confined to the extraction root: a leading `/` is stripped, while names
//! containing `..` or passing through a symlinked directory are skipped with
//! a warning. A symlink sitting at the destination is replaced, never followed.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::archive::{read_frame, EntryHeader, Frame};
use crate::common::{pump, PumpError, DEFAULT_CHUNK_SIZE};
use crate::error::{ArchiverError, Result};
use crate::fsx;

/// Sequential reader over an archive stream.
///
/// After any error the stream position is undefined and the reader should be
/// discarded.
pub struct ArchiveReader<R: Read> {
    source: R,
    buf: Vec<u8>,
    current: Option<EntryHeader>,
    remaining: u64,
    finished: bool,
    entries_read: u64,
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            buf: vec![0; chunk_size.max(1)],
            current: None,
            remaining: 0,
            finished: false,
            entries_read: 0,
        }
    }

    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    /// Decodes the next entry header, or returns `None` once the end marker
    /// has been read. Unread content of the previous entry is skipped first.
    pub fn next_entry(&mut self) -> Result<Option<EntryHeader>> {
        if self.finished {
            return Ok(None);
        }
        if self.remaining > 0 {
            self.skip_content()?;
        }
        match read_frame(&mut self.source)? {
            Frame::End => {
                self.finished = true;
                self.current = None;
                Ok(None)
            }
            Frame::Entry(header) => {
                self.remaining = header.size;
                self.current = Some(header.clone());
                self.entries_read += 1;
                Ok(Some(header))
            }
        }
    }

    /// Streams the rest of the current entry's content into `dst`.
    ///
    /// Fails with [`ArchiverError::TruncatedContent`] if the archive ends first
    /// and with [`ArchiverError::Sink`] if `dst` rejects a write.
    pub fn copy_content<W: Write + ?Sized>(&mut self, dst: &mut W) -> Result<u64> {
        let want = self.remaining;
        match pump(&mut self.source, dst, want, &mut self.buf) {
            Ok(copied) => {
                self.remaining -= copied;
                if copied < want {
                    let (name, expected) = match &self.current {
                        Some(h) => (h.name.clone(), h.size),
                        None => (String::new(), want),
                    };
                    return Err(ArchiverError::TruncatedContent {
                        name,
                        expected,
                        actual: expected - self.remaining,
                    });
                }
                Ok(copied)
            }
            Err(PumpError::Read { copied, source }) => {
                self.remaining -= copied;
                Err(ArchiverError::Source(source))
            }
            Err(PumpError::Write(e)) => Err(ArchiverError::Sink(e)),
        }
    }

    /// Discards the rest of the current entry's content.
    pub fn skip_content(&mut self) -> Result<u64> {
        self.copy_content(&mut io::sink())
    }
}

/// Tunables for [`extract_archive`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory entries are extracted under.
    pub root: PathBuf,
    /// Apply the archived mode and mtime to extracted files.
    pub restore_metadata: bool,
    /// Bytes moved per read/write while streaming content.
    pub chunk_size: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { root: PathBuf::from("."), restore_metadata: true, chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

/// Outcome of a successful extraction pass.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Entries written to disk, in archive order.
    pub extracted: Vec<EntryHeader>,
    /// Names whose destination already existed and was replaced.
    pub overwritten: Vec<String>,
    /// Names skipped because they would land outside the extraction root.
    pub rejected: Vec<String>,
    /// Files extracted intact whose mode or mtime could not be applied.
    pub metadata_failures: Vec<(String, ArchiverError)>,
}

/// Maps an entry name onto a path under `root`.
///
/// Leading root and drive prefixes are dropped, so `/etc/x` lands at
/// `root/etc/x`. Returns `None` for names with `..` components and names that
/// resolve to `root` itself.
pub fn resolve_destination(root: &Path, name: &str) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    let mut pushed = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    pushed.then_some(out)
}

/// First directory between `root` (exclusive) and `target` (exclusive) that is
/// a symlink. Components that do not exist yet end the walk.
fn symlinked_ancestor(root: &Path, target: &Path) -> Option<PathBuf> {
    let rel = target.strip_prefix(root).ok()?.parent()?;
    let mut cur = root.to_path_buf();
    for component in rel.components() {
        cur.push(component);
        match fs::symlink_metadata(&cur) {
            Ok(meta) if meta.file_type().is_symlink() => return Some(cur),
            Ok(_) => {}
            Err(_) => break,
        }
    }
    None
}

/// Extracts every entry of the archive read from `source` under `options.root`.
pub fn extract_archive<R: Read>(source: R, options: &ExtractOptions) -> Result<ExtractReport> {
    let mut reader = ArchiveReader::with_chunk_size(source, options.chunk_size);
    let mut report = ExtractReport::default();

    while let Some(header) = reader.next_entry()? {
        let Some(target) = resolve_destination(&options.root, &header.name) else {
            tracing::warn!("Skipping {}: path escapes the extraction root", header.name);
            reader.skip_content()?;
            report.rejected.push(header.name);
            continue;
        };
        if let Some(link) = symlinked_ancestor(&options.root, &target) {
            tracing::warn!("Skipping {}: {} is a symlink", header.name, link.display());
            reader.skip_content()?;
            report.rejected.push(header.name);
            continue;
        }
        if Path::new(&header.name).has_root() {
            tracing::warn!("Removing leading '/' from {}", header.name);
        }

        tracing::info!("Extracting: {} ({} bytes)", header.name, header.size);
        if fs::symlink_metadata(&target).is_ok() {
            tracing::warn!("Warning: overwriting {}", header.name);
            report.overwritten.push(header.name.clone());
        }

        let file = write_entry(&mut reader, &target)?;
        if options.restore_metadata {
            if let Err(e) = restore_metadata(file, &target, &header) {
                tracing::warn!("{}", e);
                report.metadata_failures.push((header.name.clone(), e));
            }
        }
        report.extracted.push(header);
    }

    Ok(report)
}

/// Creates `target` and fills it with the current entry's content.
/// A partially written file is removed before the error is returned.
fn write_entry<R: Read>(reader: &mut ArchiveReader<R>, target: &Path) -> Result<File> {
    let dest_err = |source| ArchiverError::DestinationWrite { path: target.to_path_buf(), source };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(dest_err)?;
    }
    if fs::symlink_metadata(target).is_ok_and(|meta| meta.file_type().is_symlink()) {
        fs::remove_file(target).map_err(dest_err)?;
    }
    let mut file = File::create(target).map_err(dest_err)?;

    if let Err(e) = reader.copy_content(&mut file) {
        drop(file);
        let _ = fs::remove_file(target);
        return Err(match e {
            ArchiverError::Sink(source) => dest_err(source),
            other => other,
        });
    }
    Ok(file)
}

/// Applies mtime (through the still-open handle) and then mode. Both are
/// attempted; the first failure is returned. The file is closed on return.
fn restore_metadata(file: File, target: &Path, header: &EntryHeader) -> Result<()> {
    let mtime = fsx::set_mtime(&file, header.mtime);
    drop(file);
    let mode = fsx::set_unix_permissions(target, header.mode);
    mtime
        .and(mode)
        .map_err(|source| ArchiverError::Metadata { path: target.to_path_buf(), source })
}

/// Walks the archive without touching the filesystem, returning every header.
/// Each entry's content length is verified along the way.
pub fn list_entries<R: Read>(source: R) -> Result<Vec<EntryHeader>> {
    let mut reader = ArchiveReader::new(source);
    let mut entries = Vec::new();
    while let Some(header) = reader.next_entry()? {
        reader.skip_content()?;
        entries.push(header);
    }
    Ok(entries)
}
