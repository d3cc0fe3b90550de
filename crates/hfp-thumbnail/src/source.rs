//! Byte sources: the two ways a host hands content to the pipeline.
//!
//! A host either gives a file path (which may be a cloud placeholder and is
//! materialized first) or an already-open seekable stream. Both end up as a
//! [`ByteSource`] that the pipeline reads once, from the start, with a size
//! bound.

use hfp_cloudfilter::Materializer;
use hfp_core::{HfpResult, MaterializationState};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything the host can hand over as a stream.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

pub enum ByteSource {
    /// A file opened by path, with the state it was classified with
    File {
        path: PathBuf,
        file: File,
        state: MaterializationState,
    },
    /// A host-provided stream
    Stream(Box<dyn ReadSeek>),
}

impl ByteSource {
    /// Open `path`, materializing it first if it is a cloud placeholder.
    ///
    /// # Errors
    /// Fails only with the unavailable-source errors of
    /// [`Materializer::ensure_available`].
    pub fn from_path(path: &Path, materializer: &Materializer) -> HfpResult<Self> {
        let opened = materializer.ensure_available(path)?;
        debug!(path = %path.display(), state = %opened.state, last_resort = opened.last_resort, "file stream created");
        Ok(ByteSource::File {
            path: path.to_path_buf(),
            file: opened.file,
            state: opened.state,
        })
    }

    pub fn from_stream(reader: impl Read + Seek + Send + 'static) -> Self {
        ByteSource::Stream(Box::new(reader))
    }

    /// Path the source was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ByteSource::File { path, .. } => Some(path),
            ByteSource::Stream(_) => None,
        }
    }

    /// Classification at open time; `NotCloud` for streams.
    pub fn state(&self) -> MaterializationState {
        match self {
            ByteSource::File { state, .. } => *state,
            ByteSource::Stream(_) => MaterializationState::NotCloud,
        }
    }

    fn reader(&mut self) -> &mut dyn ReadSeek {
        match self {
            ByteSource::File { file, .. } => file,
            ByteSource::Stream(stream) => stream.as_mut(),
        }
    }

    /// Total length in bytes. The read position is preserved.
    pub fn stat_len(&mut self) -> io::Result<u64> {
        let reader = self.reader();
        let pos = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }

    /// Read from the start, up to `limit` bytes.
    pub fn read_all(&mut self, limit: u64) -> io::Result<Vec<u8>> {
        let reader = self.reader();
        reader.rewind()?;
        let mut buf = Vec::new();
        reader.take(limit).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteSource::File { path, state, .. } => f
                .debug_struct("File")
                .field("path", path)
                .field("state", state)
                .finish(),
            ByteSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
