// src/demux.rs

//! Output archive demultiplexing.
//!
//! The engine returns a single tar stream mixing per-file results with a
//! reserved diagnostic entry. Per-file entries are reported (and, outside
//! dry runs, written back in place); diagnostics are buffered and
//! surfaced only once every other entry has been handled, so change
//! reports and the trailing summary are never interleaved.

use crate::archive::{DIAGNOSTIC_ENTRY, OUTPUT_PREFIX};
use crate::error::{Error, Result};
use crate::select;
use std::fs::OpenOptions;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;

/// Split the engine's output archive into per-file results and the
/// diagnostic side-channel.
///
/// Returns whether any transformed file was present. The engine omits
/// files whose formatted content is identical to the input, so presence
/// alone means "changed".
pub fn demux(root: &Path, output: &[u8], dry_run: bool, out: &mut dyn Write) -> Result<bool> {
    let mut archive = Archive::new(Cursor::new(output));
    let mut diagnostics = Vec::new();
    let mut found_files = false;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        if entry.header().entry_type().is_dir() || name.ends_with('/') {
            continue;
        }
        if name == DIAGNOSTIC_ENTRY {
            entry.read_to_end(&mut diagnostics)?;
            continue;
        }

        let relative = name.strip_prefix(OUTPUT_PREFIX).unwrap_or(&name).to_string();
        writeln!(out, "{relative}")?;
        found_files = true;
        if !dry_run {
            // Entry names come from an external process; they must still
            // resolve under the working root before anything is written.
            let target = select::resolve(root, Path::new(&relative));
            if !target.starts_with(root) {
                return Err(Error::NotUnderRoot {
                    path: PathBuf::from(relative),
                    root: root.to_path_buf(),
                });
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            rewrite_in_place(&target, &data)?;
        }
    }

    out.write_all(&diagnostics)?;
    Ok(found_files)
}

/// Truncate and rewrite an existing file's contents in place.
///
/// The file passed the writability pre-check, so it exists and opens
/// read-write; rewriting keeps its inode, mode, and hard links.
fn rewrite_in_place(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| Error::Unusable {
            path: path.to_path_buf(),
            source,
        })?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(data)?;
    debug!(path = %path.display(), bytes = data.len(), "rewrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tar::{Builder, EntryType, Header};
    use tempfile::TempDir;

    fn archive_of(entries: &[(&str, EntryType, &[u8])]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for (name, kind, data) in entries {
            let mut header = Header::new_gnu();
            header.set_entry_type(*kind);
            header.set_mode(0o644);
            header.set_size(data.len() as u64);
            // Write the entry name straight into the raw GNU header so tests
            // can construct adversarial paths (e.g. containing `..`) that the
            // path-validating `append_data`/`set_path` helpers refuse.
            {
                let gnu = header.as_gnu_mut().unwrap();
                let bytes = name.as_bytes();
                gnu.name[..bytes.len()].copy_from_slice(bytes);
            }
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_real_run_rewrites_in_place() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.json"), "{ \"k\": 1 }").unwrap();
        fs::write(root.join("sub/b.go"), "package     p").unwrap();

        let output = archive_of(&[
            ("b/a.json", EntryType::Regular, b"{}\n"),
            ("b/sub/b.go", EntryType::Regular, b"package p\n"),
        ]);

        let mut out = Vec::new();
        let found = demux(root, &output, false, &mut out).unwrap();
        assert!(found);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a.json\nsub/b.go\n"
        );
        // shorter content proves truncate-and-rewrite, not append
        assert_eq!(fs::read_to_string(root.join("a.json")).unwrap(), "{}\n");
        assert_eq!(
            fs::read_to_string(root.join("sub/b.go")).unwrap(),
            "package p\n"
        );
    }

    #[test]
    fn test_dry_run_reports_without_touching_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.json"), "{ }").unwrap();

        let output = archive_of(&[("b/a.json", EntryType::Regular, b"{}\n")]);

        let mut out = Vec::new();
        let found = demux(root, &output, true, &mut out).unwrap();
        assert!(found);
        assert_eq!(String::from_utf8(out).unwrap(), "a.json\n");
        assert_eq!(fs::read_to_string(root.join("a.json")).unwrap(), "{ }");
    }

    #[test]
    fn test_diagnostics_surface_last() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        // diagnostic entry precedes the file entry in the stream
        let output = archive_of(&[
            (DIAGNOSTIC_ENTRY, EntryType::Regular, b"! some.xyz\n"),
            ("b/late.json", EntryType::Regular, b"{}\n"),
        ]);

        let mut out = Vec::new();
        demux(root, &output, true, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "late.json\n! some.xyz\n"
        );
    }

    #[test]
    fn test_directory_markers_are_skipped() {
        let tmp = TempDir::new().unwrap();

        let output = archive_of(&[
            ("b/", EntryType::Directory, b""),
            ("b/sub/", EntryType::Directory, b""),
        ]);

        let mut out = Vec::new();
        let found = demux(tmp.path(), &output, false, &mut out).unwrap();
        assert!(!found);
        assert!(out.is_empty());
    }

    #[test]
    fn test_escaping_entry_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        let output = archive_of(&[("b/../evil.json", EntryType::Regular, b"{}\n")]);

        let mut out = Vec::new();
        let err = demux(root, &output, false, &mut out).unwrap_err();
        assert!(matches!(err, Error::NotUnderRoot { .. }));
        assert!(!root.join("../evil.json").exists());
    }

    #[test]
    fn test_empty_archive_finds_nothing() {
        let tmp = TempDir::new().unwrap();
        let output = archive_of(&[]);

        let mut out = Vec::new();
        let found = demux(tmp.path(), &output, false, &mut out).unwrap();
        assert!(!found);
        assert!(out.is_empty());
    }

    #[test]
    fn test_diagnostic_only_archive_is_not_a_change() {
        let tmp = TempDir::new().unwrap();
        let output = archive_of(&[(DIAGNOSTIC_ENTRY, EntryType::Regular, b"! a.xyz\n")]);

        let mut out = Vec::new();
        let found = demux(tmp.path(), &output, true, &mut out).unwrap();
        assert!(!found);
        assert_eq!(String::from_utf8(out).unwrap(), "! a.xyz\n");
    }
}
