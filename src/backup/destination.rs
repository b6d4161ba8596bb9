use crate::backup::result_error::error::Error;
use crate::backup::result_error::fatal::FatalError;
use crate::backup::result_error::WithMsg;
use std::io::ErrorKind;
use std::path::Path;

/// Makes sure the backup root exists as a directory, creating it with any
/// missing parents.
///
/// Nothing else is touched. Every failure is fatal to the run.
pub fn ensure_destination<P: AsRef<Path>>(path: P) -> Result<(), FatalError> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Ok(md) if md.is_dir() => {
            tracing::debug!("Destination {:?} exists", path);
            Ok(())
        }
        Ok(_) => Err(FatalError::DestinationCreationFailure {
            path: path.to_path_buf(),
            error: Error::from(std::io::Error::other("exists but is not a directory")),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("Creating destination {:?}", path);
            std::fs::create_dir_all(path).map_err(|e| creation_failure(path, e))
        }
        Err(e) => Err(creation_failure(path, e)),
    }
}

fn creation_failure(path: &Path, e: std::io::Error) -> FatalError {
    match e.kind() {
        ErrorKind::PermissionDenied => FatalError::PermissionFailure(
            Error::from(e).with_msg(format!("Could not create backup location {:?}", path)),
        ),
        _ => FatalError::DestinationCreationFailure {
            path: path.to_path_buf(),
            error: e.into(),
        },
    }
}
