//! Zip archives of staged release directories.
//!
//! The archive holds every regular file directly inside the staging directory,
//! stored under its bare file name and sorted by name. Timestamps are pinned to
//! the zip epoch so identical inputs produce byte-identical archives. The
//! archive is written to a temporary file beside its destination and then
//! persisted over any previous archive of the same name.

use crate::error::{PackagerError, Result};
use crate::layout::ReleaseLayout;
use crate::stager::StagedRelease;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io;
use tempfile::{Builder, NamedTempFile};
use zip::result::{ZipError, ZipResult};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Compresses staging directories into release archives.
pub struct Archiver {
    layout: ReleaseLayout,
}

impl Archiver {
    /// Create an archiver writing archives into `layout`'s release root.
    #[must_use]
    pub fn new(layout: ReleaseLayout) -> Self {
        Self { layout }
    }

    /// Archive a staged release and return the archive path.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ArchiveFailed`] if the staging directory
    /// cannot be read or the archive cannot be written.
    pub fn archive(&self, staged: &StagedRelease) -> Result<Utf8PathBuf> {
        let destination = self.layout.archive_path(&staged.target);
        debug!("archiving {} into {destination}", staged.directory);

        write_archive(&staged.directory, &destination).map_err(|source| {
            PackagerError::ArchiveFailed {
                target: staged.target.clone(),
                path: destination.clone(),
                source,
            }
        })?;

        Ok(destination)
    }
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read or holds a file whose
/// name is not valid UTF-8.
pub fn archive_entries(dir: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn write_archive(source_dir: &Utf8Path, destination: &Utf8Path) -> ZipResult<()> {
    let entries = archive_entries(source_dir)?;
    let parent = destination
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));

    let mut writer = ZipWriter::new(archive_temp_file(parent)?);
    for path in &entries {
        let Some(name) = path.file_name() else {
            continue;
        };
        writer.start_file(name, entry_options(path)?)?;
        let mut file = fs::File::open(path)?;
        io::copy(&mut file, &mut writer)?;
    }

    let temp = writer.finish()?;
    temp.persist(destination)
        .map_err(|e| ZipError::Io(e.error))?;
    Ok(())
}

/// Create the temporary archive file with the same mode a plain file create
/// would give it, so the persisted archive is not owner-only.
#[cfg(unix)]
fn archive_temp_file(parent: &Utf8Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    Builder::new()
        .prefix(".archive")
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(parent)
}

#[cfg(not(unix))]
fn archive_temp_file(parent: &Utf8Path) -> io::Result<NamedTempFile> {
    Builder::new().prefix(".archive").tempfile_in(parent)
}

fn entry_options(path: &Utf8Path) -> io::Result<SimpleFileOptions> {
    Ok(SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(file_mode(path)?))
}

#[cfg(unix)]
fn file_mode(path: &Utf8Path) -> io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(path: &Utf8Path) -> io::Result<u32> {
    let readonly = fs::metadata(path)?.permissions().readonly();
    Ok(if readonly { 0o444 } else { 0o644 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetIdentifier;
    use rstest::{fixture, rstest};
    use std::collections::BTreeMap;
    use std::io::Read;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        layout: ReleaseLayout,
        staged: StagedRelease,
    }

    #[fixture]
    fn staged() -> Fixture {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let layout = ReleaseLayout::new(root, "baasha");
        let target = TargetIdentifier::from("x86_64-unknown-linux-gnu");
        let directory = layout.staging_dir(&target);
        fs::create_dir_all(&directory).expect("staging dir");
        fs::write(directory.join("baasha"), b"binary bytes").expect("binary");
        fs::write(directory.join("runtime.c"), b"/* runtime */").expect("runtime");

        let staged = StagedRelease {
            target,
            files: vec![directory.join("baasha"), directory.join("runtime.c")],
            directory,
        };
        Fixture {
            _dir: dir,
            layout,
            staged,
        }
    }

    fn read_archive(path: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
        let file = fs::File::open(path).expect("open archive");
        let mut archive = zip::ZipArchive::new(file).expect("read archive");
        let mut contents = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).expect("entry");
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).expect("read entry");
            contents.insert(entry.name().to_owned(), bytes);
        }
        contents
    }

    #[rstest]
    fn archive_contains_exactly_the_staged_files(staged: Fixture) {
        let archiver = Archiver::new(staged.layout.clone());
        let path = archiver.archive(&staged.staged).expect("archive");

        assert_eq!(path, staged.layout.archive_path(&staged.staged.target));
        let contents = read_archive(&path);
        assert_eq!(
            contents.keys().map(String::as_str).collect::<Vec<_>>(),
            ["baasha", "runtime.c"]
        );
        assert_eq!(contents["baasha"], b"binary bytes");
        assert_eq!(contents["runtime.c"], b"/* runtime */");
    }

    #[rstest]
    fn rearchiving_replaces_previous_archive(staged: Fixture) {
        let archiver = Archiver::new(staged.layout.clone());
        let path = archiver.archive(&staged.staged).expect("first archive");
        let first = fs::read(&path).expect("read first");

        fs::write(staged.staged.directory.join("baasha"), b"rebuilt").expect("rebuild");
        archiver.archive(&staged.staged).expect("second archive");

        assert_ne!(fs::read(&path).expect("read second"), first);
        assert_eq!(read_archive(&path)["baasha"], b"rebuilt");
    }

    #[rstest]
    fn identical_inputs_produce_identical_archives(staged: Fixture) {
        let archiver = Archiver::new(staged.layout.clone());
        let path = archiver.archive(&staged.staged).expect("first archive");
        let first = fs::read(&path).expect("read first");

        archiver.archive(&staged.staged).expect("second archive");
        assert_eq!(fs::read(&path).expect("read second"), first);
    }

    #[rstest]
    fn subdirectories_are_not_archived(staged: Fixture) {
        fs::create_dir(staged.staged.directory.join("nested")).expect("nested dir");
        let entries = archive_entries(&staged.staged.directory).expect("entries");
        assert_eq!(entries.len(), 2);
    }

    #[rstest]
    fn missing_staging_dir_is_an_archive_error(staged: Fixture) {
        fs::remove_dir_all(&staged.staged.directory).expect("remove staging");
        let archiver = Archiver::new(staged.layout.clone());

        let err = archiver.archive(&staged.staged).expect_err("archive should fail");
        assert!(matches!(err, PackagerError::ArchiveFailed { .. }));
        assert!(!staged.layout.archive_path(&staged.staged.target).exists());
    }

    #[cfg(unix)]
    #[rstest]
    fn executable_bit_survives_archiving(staged: Fixture) {
        use std::os::unix::fs::PermissionsExt;

        let binary = staged.staged.directory.join("baasha");
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).expect("chmod");
        let path = Archiver::new(staged.layout.clone())
            .archive(&staged.staged)
            .expect("archive");

        let mut archive = zip::ZipArchive::new(fs::File::open(&path).expect("open")).expect("zip");
        let entry = archive.by_name("baasha").expect("binary entry");
        assert_eq!(entry.unix_mode().map(|mode| mode & 0o777), Some(0o755));
    }

    #[cfg(unix)]
    #[rstest]
    fn archive_file_gets_default_create_mode(staged: Fixture) {
        use std::os::unix::fs::PermissionsExt;

        let path = Archiver::new(staged.layout.clone())
            .archive(&staged.staged)
            .expect("archive");
        let plain = staged.layout.root().join("plain.txt");
        fs::write(&plain, b"plain").expect("plain file");

        let mode = |p: &Utf8Path| fs::metadata(p).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&plain));
    }
}
