use std::sync::Arc;

/// Supplies the file extension a pipeline stage contributes to the archive name.
pub trait FileExtProvider {
    fn file_ext(&self) -> Option<Arc<str>>;
}
