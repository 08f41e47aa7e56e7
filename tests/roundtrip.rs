use frametar::archive::{read_frame, ArchiveWriter, Frame};
use frametar::extract::{extract_archive, list_entries, ExtractOptions};
use frametar::{create_archive, ArchiverError, CreateOptions};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

fn write_with_mtime(path: &Path, contents: &[u8], mtime: u64) -> std::io::Result<()> {
    fs::write(path, contents)?;
    let file = File::options().write(true).open(path)?;
    file.set_modified(UNIX_EPOCH + Duration::from_secs(mtime))
}

#[test]
fn files_round_trip_with_content_mode_and_mtime() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let cases: Vec<(&str, Vec<u8>, u64)> = vec![
        ("empty.txt", Vec::new(), 1_000_000_000),
        ("small.txt", b"tiny".to_vec(), 1_100_000_000),
        ("exact.bin", vec![0xAB; 4096], 1_200_000_000),
        ("large.bin", (0..100_003u32).map(|i| (i % 256) as u8).collect(), 1_300_000_000),
    ];
    for (name, body, mtime) in &cases {
        write_with_mtime(&src.path().join(name), body, *mtime)?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(src.path().join("small.txt"), fs::Permissions::from_mode(0o750))?;
    }

    let mut writer = ArchiveWriter::new(Vec::new());
    for (name, _, _) in &cases {
        writer.append_path_as(&src.path().join(name), name)?;
    }
    let archive = writer.finish()?;

    let listed: Vec<_> = list_entries(&archive[..])?.into_iter().map(|h| h.name).collect();
    assert_eq!(listed, ["empty.txt", "small.txt", "exact.bin", "large.bin"]);

    let dst = tempdir()?;
    let options = ExtractOptions { root: dst.path().to_path_buf(), ..ExtractOptions::default() };
    let report = extract_archive(&archive[..], &options)?;
    assert_eq!(report.extracted.len(), cases.len());

    for (name, body, mtime) in &cases {
        let out = dst.path().join(name);
        assert_eq!(&fs::read(&out)?, body, "{name} content");
        let modified = fs::metadata(&out)?.modified()?.duration_since(UNIX_EPOCH)?.as_secs();
        assert_eq!(modified, *mtime, "{name} mtime");
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dst.path().join("small.txt"))?.permissions().mode() & 0o7777;
        assert_eq!(mode, 0o750);
    }
    Ok(())
}

#[test]
fn creation_isolates_unreadable_inputs() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let a = src.path().join("a.txt");
    let b = src.path().join("b.txt");
    fs::write(&a, "A")?;
    fs::write(&b, "B")?;
    let paths = [a.clone(), src.path().join("missing.txt"), b.clone()];

    let mut archive = Vec::new();
    let report = create_archive(&paths, &mut archive, &CreateOptions::default())?;
    assert_eq!(report.archived.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].1, ArchiverError::SourceUnavailable { .. }));

    // Exactly two entries, then exactly one marker, then nothing.
    let mut cursor = &archive[..];
    let mut seen = Vec::new();
    loop {
        match read_frame(&mut cursor)? {
            Frame::Entry(h) => {
                cursor = &cursor[h.size as usize..];
                seen.push(h.name);
            }
            Frame::End => break,
        }
    }
    assert_eq!(seen, [a.to_string_lossy(), b.to_string_lossy()]);
    assert!(cursor.is_empty());
    Ok(())
}

#[test]
fn truncated_stream_never_yields_a_complete_file() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let input = src.path().join("payload");
    fs::write(&input, vec![1u8; 10_000])?;

    let mut writer = ArchiveWriter::new(Vec::new());
    writer.append_path_as(&input, "payload")?;
    let archive = writer.finish()?;

    for cut in [1, 20, 31, 32, 5_000, archive.len() - 5] {
        let dst = tempdir()?;
        let options = ExtractOptions { root: dst.path().to_path_buf(), ..ExtractOptions::default() };
        let err = extract_archive(&archive[..cut], &options).unwrap_err();
        assert!(
            matches!(err, ArchiverError::TruncatedHeader { .. } | ArchiverError::TruncatedContent { .. }),
            "cut at {cut}: {err}"
        );
        assert!(!dst.path().join("payload").exists(), "cut at {cut} left a file behind");
    }

    // Cut inside the end marker: the complete entry is on disk, the pass still fails.
    let dst = tempdir()?;
    let options = ExtractOptions { root: dst.path().to_path_buf(), ..ExtractOptions::default() };
    let err = extract_archive(&archive[..archive.len() - 2], &options).unwrap_err();
    assert!(matches!(err, ArchiverError::TruncatedHeader { expected: 4, actual: 2 }), "{err}");
    assert_eq!(fs::read(dst.path().join("payload"))?, vec![1u8; 10_000]);
    Ok(())
}
