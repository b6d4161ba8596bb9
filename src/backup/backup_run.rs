use crate::backup::compress::CompressorConfig;
use crate::backup::file_ext::FileExtProvider;
use chrono::{DateTime, TimeZone};
use getset::Getters;
use itertools::Itertools;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Second resolution; two runs started in the same second share a name.
pub static TIME_FORMAT: &str = "%Y%m%d_%H%M%S";
pub static BACKUP_PREFIX: &str = "backup_";
static TAR_FILE_EXT: OnceLock<Arc<str>> = OnceLock::new();

/// Names and locations of one backup run, fixed at capture time
///
/// The subfolder and the archive file share a single formatted timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct BackupRun {
    timestamp: Arc<str>,
    subfolder: PathBuf,
    archive_path: PathBuf,
}

impl BackupRun {
    pub fn new<P, O, T>(destination_root: P, captured_at: DateTime<T>, compressor: &CompressorConfig) -> Self
    where
        P: AsRef<Path>,
        O: Display,
        T: TimeZone<Offset = O>,
    {
        let timestamp: Arc<str> = captured_at.format(TIME_FORMAT).to_string().into();
        let name = format!("{BACKUP_PREFIX}{timestamp}");
        let subfolder = destination_root.as_ref().join(&name);
        let archive_path = subfolder.join(format!("{}.{}", name, archive_file_ext(compressor)));

        Self {
            timestamp,
            subfolder,
            archive_path,
        }
    }
}

/// `tar` followed by the compressor's own extension, e.g. `tar.gz`.
pub fn archive_file_ext(compressor: &CompressorConfig) -> String {
    std::iter::once(TAR_FILE_EXT.get_or_init(|| "tar".into()).clone())
        .chain(compressor.file_ext())
        .join(".")
}
