pub mod source_item;

use crate::backup::result_error::result::Result;
use dyn_iter::DynIter;
use std::path::Path;
use std::sync::Arc;

/// Represents a single file, directory or link to be written into a backup archive
///
/// Contains the source path on disk and the path it gets inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Source path on the filesystem
    pub src: Arc<Path>,

    /// Destination path within the backup archive
    ///
    /// Always relative, rooted at the base name of the source item it came from.
    pub dst: Arc<Path>,
}

impl ArchiveEntry {
    pub fn new<A: Into<Arc<Path>>, B: Into<Arc<Path>>>(src: A, dst: B) -> ArchiveEntry {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }
}

/// Trait for generating archive entries from a backup source
///
/// The iterator yields Results so that a failure on one path (permission
/// denied on a subdirectory, a file vanishing mid-walk) reaches the caller,
/// which decides whether it poisons the whole source.
pub trait ArchiveEntryIterable {
    fn archive_entry_iterator<'a>(&self) -> Result<DynIter<'a, Result<ArchiveEntry>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_archive_entry_creation() {
        let src = PathBuf::from("/source/docs/file.txt");
        let dst = PathBuf::from("docs/file.txt");

        let entry = ArchiveEntry::new(src.clone(), dst.clone());
        assert_eq!(entry.src.as_ref(), src.as_path());
        assert_eq!(entry.dst.as_ref(), dst.as_path());
    }

    #[test]
    fn test_archive_entry_debug() {
        let entry = ArchiveEntry::new(PathBuf::from("/src"), PathBuf::from("dst"));
        let debug_str = format!("{:?}", entry);
        assert!(debug_str.contains("src"));
        assert!(debug_str.contains("dst"));
    }
}
