//! Run-aborting errors.
//!
//! Everything that stops a backup run as a whole surfaces as a [`FatalError`].
//! Item-level problems never do: they stay plain [`Error`] values inside the
//! run report.

use crate::backup::result_error::error::Error;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FatalError {
    #[error("Permission denied. Please check your file and directory permissions:\n{}", indent::indent_all_with("  ", .0.to_string()))]
    PermissionFailure(Error),
    #[error("Could not create backup location {:?}:\n{}", path, indent::indent_all_with("  ", error.to_string()))]
    DestinationCreationFailure { path: PathBuf, error: Error },
    #[error("Backup run aborted, could not create {:?}:\n{}", subfolder, indent::indent_all_with("  ", error.to_string()))]
    RunAborted { subfolder: PathBuf, error: Error },
    #[error("OS error occurred:\n{}", indent::indent_all_with("  ", .0.to_string()))]
    OsFailure(Error),
    #[error("An unexpected error occurred:\n{}", indent::indent_all_with("  ", .0.to_string()))]
    UnexpectedFailure(Error),
    #[error("Invalid configuration:\n{}", indent::indent_all_with("  ", .0.to_string()))]
    InvalidConfig(Error),
}

impl FatalError {
    /// Sorts an archive-level error into permission, OS or unexpected failure.
    pub fn classify(error: Error) -> Self {
        match error.io_kind() {
            Some(ErrorKind::PermissionDenied) => FatalError::PermissionFailure(error),
            Some(_) => FatalError::OsFailure(error),
            None => FatalError::UnexpectedFailure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::result_error::WithMsg;

    fn io(kind: ErrorKind) -> Error {
        Error::from(std::io::Error::new(kind, "boom"))
    }

    #[test]
    fn test_classify_permission_denied() {
        let fatal = FatalError::classify(io(ErrorKind::PermissionDenied).with_msg("open"));
        assert!(matches!(fatal, FatalError::PermissionFailure(_)));
    }

    #[test]
    fn test_classify_other_io_is_os_failure() {
        let fatal = FatalError::classify(io(ErrorKind::NotFound));
        assert!(matches!(fatal, FatalError::OsFailure(_)));
    }

    #[test]
    fn test_classify_non_io_is_unexpected() {
        let fatal = FatalError::classify(Error::Other("weird".to_string()));
        assert!(matches!(fatal, FatalError::UnexpectedFailure(_)));
    }

    #[test]
    fn test_display_names_path_and_error() {
        let fatal = FatalError::DestinationCreationFailure {
            path: PathBuf::from("/nope/backups"),
            error: io(ErrorKind::Other),
        };
        let msg = fatal.to_string();
        assert!(msg.contains("/nope/backups"));
        assert!(msg.contains("  boom"));
    }
}
