//! # frametar Core Library
//!
//! This crate provides the core functionality for the `frametar` archiver: a
//! dead-simple sequential framed format and the streaming reader/writer that
//! produce and consume it.
//!
//! ## Key Modules
//!
//! - [`archive`]: The wire format (entry headers, end marker) and the archive writer.
//! - [`extract`]: The archive reader, extraction and listing.
//! - [`error`]: The crate-wide error type.
//!
//! ## Examples
//!
//! ```no_run
//! use frametar::archive::{ArchiveWriter, EntryHeader};
//! use frametar::extract::{extract_archive, ExtractOptions};
//!
//! # fn main() -> frametar::error::Result<()> {
//! let mut writer = ArchiveWriter::new(Vec::new());
//! let header = EntryHeader { name: "hello.txt".into(), size: 5, mode: 0o644, mtime: 0 };
//! writer.append_reader(&header, &b"hello"[..])?;
//! let bytes = writer.finish()?;
//!
//! extract_archive(&bytes[..], &ExtractOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod error;
pub mod extract;

// Cross-platform filesystem wrapper
pub mod fsx;

pub use archive::{create_archive, ArchiveWriter, CreateOptions, CreateReport, EntryHeader};
pub use error::ArchiverError;
pub use extract::{extract_archive, list_entries, ArchiveReader, ExtractOptions, ExtractReport};
