use crate::backup::archive::source_item::SourceItem;
use crate::backup::result_error::error::Error;
use getset::Getters;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// What happened to one source item during a run
#[derive(Debug)]
pub enum ItemOutcome {
    /// Written to the archive, with the number of entries it produced
    Included { entries: usize },
    SkippedMissing,
    /// Reading the item failed; none of its entries are in the archive
    Failed(Error),
}

impl ItemOutcome {
    pub fn is_included(&self) -> bool {
        matches!(self, ItemOutcome::Included { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ItemOutcome::SkippedMissing)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }
}

#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct ItemReport {
    item: SourceItem,
    outcome: ItemOutcome,
}

impl ItemReport {
    pub fn new(item: SourceItem, outcome: ItemOutcome) -> Self {
        Self { item, outcome }
    }
}

/// Summary of a completed run, in request order
#[derive(Debug, Getters)]
#[getset(get = "pub")]
pub struct RunReport {
    archive_path: PathBuf,
    items: Vec<ItemReport>,
}

impl RunReport {
    pub fn new(archive_path: PathBuf, items: Vec<ItemReport>) -> Self {
        Self {
            archive_path,
            items,
        }
    }

    pub fn included_count(&self) -> usize {
        self.count(ItemOutcome::is_included)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(ItemOutcome::is_skipped)
    }

    pub fn failed_count(&self) -> usize {
        self.count(ItemOutcome::is_failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&SourceItem, &Error)> {
        self.items.iter().filter_map(|r| match &r.outcome {
            ItemOutcome::Failed(e) => Some((&r.item, e)),
            _ => None,
        })
    }

    fn count(&self, predicate: fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}: {} included, {} skipped (missing), {} failed",
            self.archive_path,
            self.included_count(),
            self.skipped_count(),
            self.failed_count()
        )
    }
}
