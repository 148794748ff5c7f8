use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::FrameSeqResult;

/// A readable, seekable byte stream handed out by a [`ByteSource`].
pub trait SeekableStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableStream for T {}

/// Reopenable origin of container bytes.
///
/// A playback session keeps its source alive for its whole lifetime: frame payloads are
/// stored as offsets and re-read on every tick.
pub trait ByteSource: Send + Sync {
    /// Open a fresh stream positioned at byte 0.
    fn open(&self) -> FrameSeqResult<Box<dyn SeekableStream>>;

    /// Short label for logs.
    fn describe(&self) -> String {
        "byte source".to_owned()
    }
}

/// Shared in-memory bytes.
#[derive(Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    /// Wrap owned bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Underlying bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySource")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ByteSource for MemorySource {
    fn open(&self) -> FrameSeqResult<Box<dyn SeekableStream>> {
        Ok(Box::new(Cursor::new(SharedBytes(self.bytes.clone()))))
    }

    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.bytes.len())
    }
}

struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A file on disk, reopened on every [`ByteSource::open`].
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Reference a file path. The file is not touched until opened.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path this source reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn open(&self) -> FrameSeqResult<Box<dyn SeekableStream>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/source.rs"]
mod tests;
