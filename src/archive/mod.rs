//! # Archive Format
//!
//! This module defines the on-wire layout of a `frametar` archive and the
//! streaming writer that produces it.
//!
//! ## Format
//!
//! An archive is a plain sequence of entries followed by an end marker. There
//! is no magic number, version field, index or checksum. Every integer is
//! big-endian and fixed width:
//!
//! ```text
//! name_len: u32 | name: [u8; name_len] | size: u64 | mode: u32 | mtime: u64 | content: [u8; size]
//! ...
//! 0u32  (end-of-archive marker, an entry header with name_len == 0)
//! ```
//!
//! The marker is mandatory. A stream that ends where a header should begin is
//! truncated, not finished.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::common::{pump, read_full, write_zeros, PumpError, DEFAULT_CHUNK_SIZE};
use crate::error::{ArchiverError, Result};
use crate::fsx;

/// Width of the `name_len` field.
pub const NAME_LEN_SIZE: usize = 4;
/// Width of the fields after the name: `size` + `mode` + `mtime`.
pub const FIXED_TAIL_SIZE: usize = 8 + 4 + 8;
/// The end-of-archive marker.
pub const END_MARKER: [u8; NAME_LEN_SIZE] = [0; NAME_LEN_SIZE];

/// Header of a single archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Path of the file as given at creation time.
    pub name: String,
    /// Number of content bytes following the header.
    pub size: u64,
    /// POSIX permission bits.
    pub mode: u32,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
}

impl EntryHeader {
    /// Number of bytes `encode` produces.
    pub fn encoded_len(&self) -> usize {
        NAME_LEN_SIZE + self.name.len() + FIXED_TAIL_SIZE
    }

    fn name_len(&self) -> Result<u32> {
        if self.name.is_empty() {
            return Err(ArchiverError::InvalidName { name: String::new() });
        }
        u32::try_from(self.name.len()).map_err(|_| ArchiverError::InvalidName { name: self.name.clone() })
    }

    /// Serializes the header fields in wire order.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let name_len = self.name_len()?;
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&self.mode.to_be_bytes());
        out.extend_from_slice(&self.mtime.to_be_bytes());
        Ok(out)
    }

    /// Encodes the header and writes all of it to `sink`.
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> Result<()> {
        let bytes = self.encode()?;
        sink.write_all(&bytes).map_err(ArchiverError::Sink)
    }
}

/// One decoded unit of the archive stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Entry(EntryHeader),
    End,
}

fn read_field<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> Result<()> {
    let got = read_full(source, buf).map_err(ArchiverError::Source)?;
    if got < buf.len() {
        return Err(ArchiverError::TruncatedHeader { expected: buf.len(), actual: got });
    }
    Ok(())
}

/// Decodes the next header (or the end marker) from `source`.
///
/// On success with [`Frame::Entry`] the source is positioned at the first
/// content byte; the caller must consume exactly `size` bytes before decoding
/// the next frame.
pub fn read_frame<R: Read + ?Sized>(source: &mut R) -> Result<Frame> {
    let mut len_buf = [0u8; NAME_LEN_SIZE];
    read_field(source, &mut len_buf)?;
    let name_len = u32::from_be_bytes(len_buf);
    if name_len == 0 {
        return Ok(Frame::End);
    }

    // Grow with the data actually present; name_len is untrusted.
    let mut name_bytes = Vec::new();
    let got = (&mut *source)
        .take(u64::from(name_len))
        .read_to_end(&mut name_bytes)
        .map_err(ArchiverError::Source)?;
    if got < name_len as usize {
        return Err(ArchiverError::TruncatedHeader { expected: name_len as usize, actual: got });
    }
    let name = String::from_utf8(name_bytes).map_err(|e| ArchiverError::InvalidName {
        name: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })?;

    let mut tail = [0u8; FIXED_TAIL_SIZE];
    read_field(source, &mut tail)?;
    let (size, rest) = tail.split_at(8);
    let (mode, mtime) = rest.split_at(4);

    Ok(Frame::Entry(EntryHeader {
        name,
        size: u64::from_be_bytes(to_array(size)),
        mode: u32::from_be_bytes(to_array(mode)),
        mtime: u64::from_be_bytes(to_array(mtime)),
    }))
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// Writes the end-of-archive marker.
pub fn write_end_marker<W: Write + ?Sized>(sink: &mut W) -> io::Result<()> {
    sink.write_all(&END_MARKER)
}

/// A writer that appends entries to an archive stream.
///
/// Content is streamed through a fixed-size buffer, so files of any size are
/// archived without being held in memory. Call [`ArchiveWriter::finish`] to
/// terminate the archive; dropping the writer leaves the stream without its
/// end marker.
pub struct ArchiveWriter<W: Write> {
    sink: W,
    buf: Vec<u8>,
    entries_written: u64,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(sink: W) -> Self {
        Self::with_chunk_size(sink, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(sink: W, chunk_size: usize) -> Self {
        Self { sink, buf: vec![0; chunk_size.max(1)], entries_written: 0 }
    }

    /// Number of headers emitted so far, including entries whose content had
    /// to be zero-filled.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Archives the regular file at `path`, recording `path` verbatim as the
    /// entry name.
    ///
    /// Errors for which [`ArchiverError::is_fatal`] is `false` concern only this
    /// file; the archive stream is still well-formed afterwards.
    pub fn append_path(&mut self, path: &Path) -> Result<EntryHeader> {
        let name = path
            .to_str()
            .ok_or_else(|| ArchiverError::InvalidName { name: path.to_string_lossy().into_owned() })?;
        self.append_path_as(path, name)
    }

    /// Archives the regular file at `path` under the entry name `name`.
    pub fn append_path_as(&mut self, path: &Path, name: &str) -> Result<EntryHeader> {
        let unavailable = |source| ArchiverError::SourceUnavailable { path: path.to_path_buf(), source };
        let file = File::open(path).map_err(unavailable)?;
        let meta = file.metadata().map_err(unavailable)?;
        if !meta.is_file() {
            return Err(ArchiverError::NotRegularFile { path: path.to_path_buf() });
        }

        let header = EntryHeader {
            name: name.to_owned(),
            size: meta.len(),
            mode: fsx::unix_mode(&meta),
            mtime: fsx::mtime_secs(&meta),
        };
        tracing::info!("Adding: {} ({} bytes)", header.name, header.size);
        self.append_reader(&header, file)?;
        Ok(header)
    }

    /// Emits `header` followed by exactly `header.size` bytes taken from `content`.
    ///
    /// If `content` fails or runs dry early, the missing bytes are written as
    /// zeros so later entries stay decodable, and the shortfall is returned as a
    /// per-file error. Bytes beyond `header.size` are ignored.
    pub fn append_reader<R: Read>(&mut self, header: &EntryHeader, mut content: R) -> Result<()> {
        header.write_to(&mut self.sink)?;
        self.entries_written += 1;

        let path = PathBuf::from(&header.name);
        match pump(&mut content, &mut self.sink, header.size, &mut self.buf) {
            Ok(copied) if copied == header.size => {
                let mut extra = [0u8; 1];
                if matches!(read_full(&mut content, &mut extra), Ok(1)) {
                    tracing::warn!("{} grew while archiving; stored the first {} bytes", header.name, header.size);
                }
                Ok(())
            }
            Ok(copied) => {
                self.zero_fill(header.size - copied)?;
                Err(ArchiverError::SourceChanged { path, expected: header.size, actual: copied })
            }
            Err(PumpError::Read { copied, source }) => {
                self.zero_fill(header.size - copied)?;
                Err(ArchiverError::SourceUnavailable { path, source })
            }
            Err(PumpError::Write(e)) => Err(ArchiverError::Sink(e)),
        }
    }

    fn zero_fill(&mut self, len: u64) -> Result<()> {
        write_zeros(&mut self.sink, len, &mut self.buf).map_err(ArchiverError::Sink)
    }

    /// Writes the end marker, flushes, and hands back the sink.
    pub fn finish(mut self) -> Result<W> {
        write_end_marker(&mut self.sink).map_err(ArchiverError::Sink)?;
        self.sink.flush().map_err(ArchiverError::Sink)?;
        Ok(self.sink)
    }
}

/// Tunables for [`create_archive`].
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Bytes moved per read/write while streaming content.
    pub chunk_size: usize,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

/// Outcome of a creation pass.
#[derive(Debug, Default)]
pub struct CreateReport {
    /// Entries written intact, in emission order.
    pub archived: Vec<EntryHeader>,
    /// Files that were skipped or stored incompletely, with the reason.
    pub failures: Vec<(PathBuf, ArchiverError)>,
}

/// Archives `paths` in order into `sink` and terminates the archive.
///
/// A file that cannot be archived is logged, recorded in the report and
/// skipped; the remaining files are still processed. Only failures of the sink
/// itself abort the pass.
pub fn create_archive<P, W>(paths: &[P], sink: W, options: &CreateOptions) -> Result<CreateReport>
where
    P: AsRef<Path>,
    W: Write,
{
    let mut writer = ArchiveWriter::with_chunk_size(sink, options.chunk_size);
    let mut report = CreateReport::default();

    for path in paths {
        let path = path.as_ref();
        match writer.append_path(path) {
            Ok(header) => report.archived.push(header),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("{}", e);
                report.failures.push((path.to_path_buf(), e));
            }
        }
    }

    tracing::debug!("{} entries written, {} files failed", writer.entries_written(), report.failures.len());
    writer.finish()?;
    Ok(report)
}
