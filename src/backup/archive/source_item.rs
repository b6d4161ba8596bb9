use crate::backup::archive::{ArchiveEntry, ArchiveEntryIterable};
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithDebugObjectAndFnName;

use derive_more::{Display, From};
use dyn_iter::{DynIter, IntoDynIterator};
use function_name::named;
use getset::Getters;
use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One path requested for inclusion in a backup
///
/// Files become a single archive entry named after the file. Directories are
/// walked recursively and land under an entry named after the directory, with
/// their relative layout kept as is. Walk order is sorted by file name so the
/// same tree always produces the same archive layout.
#[derive(Clone, Debug, Display, From, Serialize, Deserialize, PartialEq, Eq, Getters)]
#[display("{}", path.display())]
#[serde(transparent)]
#[getset(get = "pub")]
pub struct SourceItem {
    path: PathBuf,
}

impl SourceItem {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Follows symlinks, so a dangling link counts as missing.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Last path component, used as the archive-root entry name.
    ///
    /// Paths like `.` or `dir/..` have no last component of their own and are
    /// resolved through the filesystem first. `/` has none at all.
    pub fn base_name(&self) -> Option<OsString> {
        match self.path.file_name() {
            Some(name) => Some(name.to_os_string()),
            None => std::fs::canonicalize(&self.path)
                .ok()?
                .file_name()
                .map(|name| name.to_os_string()),
        }
    }
}

impl ArchiveEntryIterable for SourceItem {
    #[named]
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>> {
        let root: Arc<Path> = self.path.as_path().into();
        let base_name = self.base_name().map(PathBuf::from).ok_or_else(|| {
            Error::Other(format!("{:?} has no base name to archive it under", root))
        })?;

        tracing::debug!("Walking {:?} as {:?}", root, base_name);

        let walk_root = root.clone();
        let entries = WalkDir::new(&self.path)
            .follow_links(false)
            .follow_root_links(false)
            .sort_by_file_name()
            .into_iter()
            .map(move |res| {
                res.map_err(Error::from)
                    .and_then(|de| to_archive_entry(de, &walk_root, &base_name))
            })
            .map(move |res| res.with_debug_object_and_fn_name(root.clone(), function_path!()));

        Ok(entries.into_dyn_iter())
    }
}

fn to_archive_entry<P1: AsRef<Path>, P2: AsRef<Path>>(
    de: DirEntry,
    root: P1,
    base_name: P2,
) -> Result<ArchiveEntry> {
    let relative = de.path().strip_prefix(root.as_ref())?;
    // joining an empty path would leave a trailing separator
    let dst = if relative.as_os_str().is_empty() {
        base_name.as_ref().to_path_buf()
    } else {
        base_name.as_ref().join(relative)
    };
    let entry = ArchiveEntry::new(de.into_path(), dst);
    tracing::trace!("Including: {:?} -> {:?}", entry.src, entry.dst);
    Ok(entry)
}
