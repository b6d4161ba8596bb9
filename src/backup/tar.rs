use crate::backup::archive::ArchiveEntry;
use crate::backup::compress::{Compressor, CompressorBuilder, CompressorConfig};
use crate::backup::finish::Finish;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use getset::CopyGetters;
use std::fs::File;
use std::io::{BufWriter, IntoInnerError, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Two zero blocks `tar::Builder` appends when it finishes
const TAR_TRAILER_LEN: u64 = 1024;
/// Name prefix of staging files inside the run folder
pub static STAGING_PREFIX: &str = ".staging_";

type ArchiveStream = BufWriter<Compressor<BufWriter<File>>>;

/// Compressed tar stream writing to the archive file of one run
///
/// `finish` consumes the writer, so the stream is closed at most once.
pub struct ArchiveWriter {
    builder: tar::Builder<ArchiveStream>,
    entry_count: usize,
}

impl ArchiveWriter {
    /// Creates (or truncates) the archive file and stacks the compressor on top.
    pub fn create<P: AsRef<Path>>(path: P, compressor: &CompressorConfig) -> Result<Self> {
        let builder = File::create(path.as_ref())
            .map(BufWriter::new)
            .map_err(Error::from)
            .and_then(|f| compressor.build_compressor(f))
            .map(BufWriter::new)
            .map(tar::Builder::new)
            .with_msg(format!("Opening archive {:?} failed", path.as_ref()))?;

        Ok(Self {
            builder,
            entry_count: 0,
        })
    }

    /// Appends a fully staged item.
    ///
    /// The staged bytes are complete tar records, so copying them minus the
    /// staging trailer yields the same stream as appending entry by entry.
    pub fn splice(&mut self, staged: StagedItem) -> Result<()> {
        let StagedItem {
            mut file,
            len,
            entry_count,
        } = staged;
        let file = file.as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        let copied = std::io::copy(&mut file.take(len), self.builder.get_mut())?;
        if copied != len {
            return Err(Error::from(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("staged item truncated: copied {copied} of {len} bytes"),
            )));
        }
        self.entry_count += entry_count;
        Ok(())
    }

    /// Writes the tar trailer, finishes the compressor and flushes the file to disk.
    pub fn finish(self) -> Result<()> {
        tracing::info!("Processed {} archive entries", self.entry_count);
        self.builder
            .into_inner()?
            .into_inner()
            .map_err(IntoInnerError::into_error)?
            .finish()?
            .into_inner()
            .map_err(IntoInnerError::into_error)?
            .sync_all()?;
        Ok(())
    }
}

/// One source item written to a private uncompressed tar file
#[derive(CopyGetters)]
pub struct StagedItem {
    file: NamedTempFile,
    #[getset(get_copy = "pub")]
    len: u64,
    #[getset(get_copy = "pub")]
    entry_count: usize,
}

/// Result of staging one item when the staging file itself stayed healthy
pub enum StageOutcome {
    Staged(StagedItem),
    /// Walking or reading the source failed; the staging file is discarded
    SourceFailed(Error),
}

/// Staging file that remembers whether one of its own writes failed,
/// so a failed append can be blamed on the source or on the destination.
struct StagingWriter {
    inner: BufWriter<NamedTempFile>,
    failed: bool,
}

impl Write for StagingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf).inspect_err(|_| self.failed = true)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().inspect_err(|_| self.failed = true)
    }
}

/// Writes every entry of one source item into a staging tar file in `staging_dir`.
///
/// `Err` means the staging file could not be created or written, which is a
/// failure on the destination side. Errors from the walk or from reading an
/// entry come back as [`StageOutcome::SourceFailed`].
pub fn stage_item<P, I>(entries: I, staging_dir: P) -> Result<StageOutcome>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Result<ArchiveEntry>>,
{
    let file = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(staging_dir.as_ref())
        .map_err(Error::from)
        .with_msg(format!("Creating staging file in {:?} failed", staging_dir.as_ref()))?;
    let mut builder = tar::Builder::new(StagingWriter {
        inner: BufWriter::new(file),
        failed: false,
    });
    builder.follow_symlinks(false);

    let mut entry_count = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Ok(StageOutcome::SourceFailed(e)),
        };
        if is_unsupported_special_file(&entry.src) {
            tracing::warn!("{:?} is a socket, tar cannot store it and it will be skipped", entry.src);
            continue;
        }
        if let Err(e) = builder.append_path_with_name(&entry.src, &entry.dst) {
            let e = Error::from(e).with_msg(format!("Adding {:?} as {:?} failed", entry.src, entry.dst));
            if builder.get_ref().failed {
                return Err(e.with_msg("Writing staging file failed"));
            }
            return Ok(StageOutcome::SourceFailed(e));
        }
        entry_count += 1;
    }

    let file = builder
        .into_inner()?
        .inner
        .into_inner()
        .map_err(IntoInnerError::into_error)?;
    let len = file
        .as_file()
        .metadata()?
        .len()
        .checked_sub(TAR_TRAILER_LEN)
        .ok_or_else(|| Error::Other("staging tar is shorter than its trailer".to_string()))?;

    Ok(StageOutcome::Staged(StagedItem {
        file,
        len,
        entry_count,
    }))
}

#[cfg(unix)]
fn is_unsupported_special_file(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;
    std::fs::symlink_metadata(path)
        .map(|md| md.file_type().is_socket())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_unsupported_special_file(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::ArchiveEntryIterable;
    use crate::backup::archive::source_item::SourceItem;
    use flate2::read::GzDecoder;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn read_gz_archive(path: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let path = e.path().unwrap().to_path_buf();
                let mut data = Vec::new();
                e.read_to_end(&mut data).unwrap();
                (path, data)
            })
            .collect()
    }

    fn expect_staged(outcome: StageOutcome) -> StagedItem {
        match outcome {
            StageOutcome::Staged(staged) => staged,
            StageOutcome::SourceFailed(e) => panic!("Expected staged item, got {e}"),
        }
    }

    fn expect_source_failed(outcome: StageOutcome) -> Error {
        match outcome {
            StageOutcome::SourceFailed(e) => e,
            StageOutcome::Staged(_) => panic!("Expected source failure"),
        }
    }

    fn staging_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with(STAGING_PREFIX)
            })
            .count()
    }

    #[test]
    fn test_stage_item_counts_entries_and_strips_trailer() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, "hello").unwrap();

        let staged = expect_staged(
            stage_item(vec![Ok(ArchiveEntry::new(file, PathBuf::from("a.txt")))], temp_dir.path()).unwrap(),
        );
        assert_eq!(staged.entry_count(), 1);
        // one header block plus one data block
        assert_eq!(staged.len(), 1024);
    }

    #[test]
    fn test_stage_item_lives_in_staging_dir_until_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, "hello").unwrap();

        let staged = stage_item(vec![Ok(ArchiveEntry::new(file, PathBuf::from("a.txt")))], temp_dir.path()).unwrap();
        assert_eq!(staging_files(temp_dir.path()), 1);
        drop(staged);
        assert_eq!(staging_files(temp_dir.path()), 0);
    }

    #[test]
    fn test_walk_error_is_source_failure() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, "hello").unwrap();

        let entries = vec![
            Ok(ArchiveEntry::new(file, PathBuf::from("a.txt"))),
            Err(Error::Other("walk broke".to_string())),
        ];
        let error = expect_source_failed(stage_item(entries, temp_dir.path()).unwrap());
        assert_eq!(error.to_string(), "walk broke");
        assert_eq!(staging_files(temp_dir.path()), 0);
    }

    #[test]
    fn test_vanished_file_is_source_failure() {
        let temp_dir = TempDir::new().unwrap();
        let entries = vec![Ok(ArchiveEntry::new(
            temp_dir.path().join("gone.txt"),
            PathBuf::from("gone.txt"),
        ))];
        let error = expect_source_failed(stage_item(entries, temp_dir.path()).unwrap());
        assert_eq!(error.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_unusable_staging_dir_is_archive_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, "hello").unwrap();

        let result = stage_item(
            vec![Ok(ArchiveEntry::new(file, PathBuf::from("a.txt")))],
            temp_dir.path().join("no_such_dir"),
        );
        let error = result.err().unwrap();
        assert_eq!(error.io_kind(), Some(std::io::ErrorKind::NotFound));
        assert!(error.to_string().contains("Creating staging file"));
    }

    #[test]
    fn test_spliced_items_form_one_readable_archive() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        std::fs::create_dir_all(src.join("dir/nested")).unwrap();
        std::fs::write(src.join("dir/nested/deep.txt"), "deep").unwrap();
        std::fs::write(src.join("single.txt"), "single").unwrap();

        let archive_path = temp_dir.path().join("out.tar.gz");
        let mut writer = ArchiveWriter::create(&archive_path, &CompressorConfig::default()).unwrap();
        for item in [src.join("dir"), src.join("single.txt")] {
            let iter = SourceItem::new(item).archive_entry_iterator().unwrap();
            writer
                .splice(expect_staged(stage_item(iter, temp_dir.path()).unwrap()))
                .unwrap();
        }
        writer.finish().unwrap();

        let entries = read_gz_archive(&archive_path);
        let names: Vec<_> = entries.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("dir"),
                PathBuf::from("dir/nested"),
                PathBuf::from("dir/nested/deep.txt"),
                PathBuf::from("single.txt"),
            ]
        );
        assert_eq!(entries[2].1, b"deep");
        assert_eq!(entries[3].1, b"single");
    }

    #[test]
    fn test_empty_archive_is_still_valid() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("empty.tar.gz");
        ArchiveWriter::create(&archive_path, &CompressorConfig::default())
            .unwrap()
            .finish()
            .unwrap();

        assert!(read_gz_archive(&archive_path).is_empty());
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = ArchiveWriter::create(
            temp_dir.path().join("missing/out.tar.gz"),
            &CompressorConfig::default(),
        );
        assert_eq!(
            result.err().and_then(|e| e.io_kind()),
            Some(std::io::ErrorKind::NotFound)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let sock = temp_dir.path().join("s.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&sock).unwrap();

        let staged = expect_staged(
            stage_item(vec![Ok(ArchiveEntry::new(sock, PathBuf::from("s.sock")))], temp_dir.path()).unwrap(),
        );
        assert_eq!(staged.entry_count(), 0);
        assert_eq!(staged.len(), 0);
    }
}
