//! Validation functions for configuration values.

use crate::backup::archive::source_item::SourceItem;
use validator::ValidationError;

use std::path::Path;

pub fn validate_destination<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        return Err(ValidationError::new("InvalidDestination")
            .with_message("destination must not be empty".into()));
    }
    if dir.is_file() {
        return Err(ValidationError::new("InvalidDestination")
            .with_message(format!("{:?} is a file, not a directory", dir).into()));
    }

    Ok(())
}

pub fn validate_sources(sources: &[SourceItem]) -> Result<(), ValidationError> {
    if let Some(idx) = sources
        .iter()
        .position(|s| s.path().as_os_str().is_empty())
    {
        return Err(ValidationError::new("InvalidSource")
            .with_message(format!("source #{} is an empty path", idx + 1).into()));
    }

    Ok(())
}
