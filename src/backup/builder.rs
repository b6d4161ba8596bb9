use crate::backup::archive::source_item::SourceItem;
use crate::backup::archive::{ArchiveEntry, ArchiveEntryIterable};
use crate::backup::backup_run::{BackupRun, BACKUP_PREFIX};
use crate::backup::compress::CompressorConfig;
use crate::backup::report::{ItemOutcome, ItemReport, RunReport};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::fatal::FatalError;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::tar::{stage_item, ArchiveWriter, StageOutcome, STAGING_PREFIX};
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::ffi::OsStr;
use std::path::Path;
use std::result;
use tracing::{error, info, warn};

/// Archives `items` under `destination_root` with gzip, timestamped now.
pub fn create_backup<P: AsRef<Path>>(
    items: &[SourceItem],
    destination_root: P,
) -> result::Result<RunReport, FatalError> {
    create_backup_at(items, destination_root, &CompressorConfig::default(), Local::now())
}

/// Runs one backup with an explicit capture time.
///
/// Missing and unreadable items are recorded in the report. Only failures of
/// the subfolder or of the archive stream itself abort the run. A partially
/// written archive is left on disk in that case.
pub fn create_backup_at<P, O, T>(
    items: &[SourceItem],
    destination_root: P,
    compressor: &CompressorConfig,
    captured_at: DateTime<T>,
) -> result::Result<RunReport, FatalError>
where
    P: AsRef<Path>,
    O: Display,
    T: TimeZone<Offset = O>,
{
    let run = BackupRun::new(destination_root, captured_at, compressor);
    info!("Starting backup {} of {} items", run.timestamp(), items.len());

    std::fs::create_dir_all(run.subfolder()).map_err(|e| FatalError::RunAborted {
        subfolder: run.subfolder().clone(),
        error: e.into(),
    })?;

    let mut writer = ArchiveWriter::create(run.archive_path(), compressor).map_err(FatalError::classify)?;
    let run_dir = std::fs::canonicalize(run.subfolder()).unwrap_or_else(|_| run.subfolder().clone());

    let mut reports = Vec::with_capacity(items.len());
    for item in items {
        match add_item(&mut writer, item, &run_dir) {
            Ok(outcome) => reports.push(ItemReport::new(item.clone(), outcome)),
            Err(e) => return Err(FatalError::classify(close_after_failure(writer, e))),
        }
    }

    writer
        .finish()
        .with_msg(format!("Closing archive {:?} failed", run.archive_path()))
        .map_err(FatalError::classify)?;

    let report = RunReport::new(run.archive_path().clone(), reports);
    info!("Backup created successfully: {}", report.archive_path().display());
    Ok(report)
}

/// `Ok` is the item's own outcome, `Err` means the archive side broke.
fn add_item(writer: &mut ArchiveWriter, item: &SourceItem, run_dir: &Path) -> Result<ItemOutcome> {
    if !item.exists() {
        warn!("{} does not exist and will be skipped.", item);
        return Ok(ItemOutcome::SkippedMissing);
    }

    match item.archive_entry_iterator() {
        Ok(entries) => include_entries(writer, item, entries, run_dir),
        Err(e) => Ok(item_failed(item, e)),
    }
}

/// Stages `entries` next to the archive and splices them in once complete.
fn include_entries<I>(writer: &mut ArchiveWriter, item: &SourceItem, entries: I, run_dir: &Path) -> Result<ItemOutcome>
where
    I: IntoIterator<Item = Result<ArchiveEntry>>,
{
    let entries = entries
        .into_iter()
        .filter(|res| !matches!(res, Ok(entry) if is_run_artifact(entry, run_dir)));

    let staged = match stage_item(entries, run_dir).with_msg(format!("Staging {} failed", item))? {
        StageOutcome::Staged(staged) => staged,
        StageOutcome::SourceFailed(e) => return Ok(item_failed(item, e)),
    };
    if staged.entry_count() == 0 {
        let e = Error::Other(format!("{} has nothing tar can store", item));
        return Ok(item_failed(item, e));
    }

    let entries = staged.entry_count();
    writer
        .splice(staged)
        .with_msg(format!("Writing {} into the archive failed", item))?;
    info!("Added {} ({} entries)", item, entries);
    Ok(ItemOutcome::Included { entries })
}

fn item_failed(item: &SourceItem, e: Error) -> ItemOutcome {
    error!(
        "Failed to back up {}, skipping it:\n{}",
        item,
        indent::indent_all_with("  ", e.to_string())
    );
    ItemOutcome::Failed(e)
}

/// The archive and staging files of this run, seen when a source contains the destination.
fn is_run_artifact(entry: &ArchiveEntry, run_dir: &Path) -> bool {
    entry
        .src
        .file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with(BACKUP_PREFIX) || name.starts_with(STAGING_PREFIX))
        && entry
            .src
            .parent()
            .and_then(|parent| std::fs::canonicalize(parent).ok())
            .is_some_and(|parent| parent == run_dir)
}

fn close_after_failure(writer: ArchiveWriter, error: Error) -> Error {
    match writer.finish() {
        Ok(()) => error,
        Err(close_error) => error.chain(close_error.with_msg("Closing archive after failure also failed")),
    }
}
