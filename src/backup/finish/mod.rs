use flate2::write::GzEncoder;
use liblzma::write::XzEncoder;
use std::io::{Error, Write};

/// Completes a streaming writer and hands back the inner writer.
///
/// Compressors only emit their trailing frame on `finish`, so every writer in
/// the archive pipeline goes through this exactly once.
pub trait Finish<O> {
    fn finish(self) -> Result<O, Error>;
}

impl<W: Write> Finish<W> for GzEncoder<W> {
    fn finish(self) -> Result<W, Error> {
        self.finish()
    }
}

impl<W: Write> Finish<W> for XzEncoder<W> {
    fn finish(self) -> Result<W, Error> {
        self.finish()
    }
}
