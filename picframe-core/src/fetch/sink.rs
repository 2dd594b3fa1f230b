//! Destinations a response body is streamed into

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use super::FetchError;

/// Growable byte buffer with amortized doubling.
///
/// Capacity grows to `max(2 * capacity, len + incoming)` and is never
/// shrunk. A failed reservation is reported instead of aborting.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with room for `hint` bytes, typically the declared Content-Length
    pub fn with_capacity_hint(hint: usize) -> Result<Self, FetchError> {
        let mut data = Vec::new();
        data.try_reserve_exact(hint)
            .map_err(|_| FetchError::OutOfMemory { requested: hint })?;
        Ok(Self { data })
    }

    /// Ensure room for `incoming` more bytes
    pub fn reserve_for(&mut self, incoming: usize) -> Result<(), FetchError> {
        let len = self.data.len();
        let needed = len
            .checked_add(incoming)
            .ok_or(FetchError::OutOfMemory { requested: usize::MAX })?;
        if needed <= self.data.capacity() {
            return Ok(());
        }

        let target = self.data.capacity().saturating_mul(2).max(needed);
        self.data
            .try_reserve_exact(target - len)
            .map_err(|_| FetchError::OutOfMemory { requested: target })
    }

    pub fn extend(&mut self, chunk: &[u8]) -> Result<(), FetchError> {
        self.reserve_for(chunk.len())?;
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// Temporary file next to the destination, renamed into place on commit.
///
/// Dropping an uncommitted sink deletes the temporary file.
pub struct FileSink {
    dest_path: PathBuf,
    temp: NamedTempFile,
    file: tokio::fs::File,
    written: u64,
}

impl FileSink {
    pub async fn create(dest_path: &Path) -> Result<Self, FetchError> {
        let dir = match dest_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source| FetchError::Io {
            path: dir.clone(),
            source,
        };

        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;
        let temp = tempfile::Builder::new()
            .prefix(".picframe-")
            .suffix(".part")
            .tempfile_in(&dir)
            .map_err(io_err)?;
        let file = temp.reopen().map_err(io_err)?;

        Ok(Self {
            dest_path: dest_path.to_path_buf(),
            temp,
            file: tokio::fs::File::from_std(file),
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), FetchError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|source| FetchError::Io {
                path: self.temp.path().to_path_buf(),
                source,
            })?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush to disk and atomically move the file onto the destination
    pub async fn commit(mut self) -> Result<u64, FetchError> {
        let temp_path = self.temp.path().to_path_buf();
        let io_err = |source| FetchError::Io {
            path: temp_path.clone(),
            source,
        };

        self.file.flush().await.map_err(io_err)?;
        self.file.sync_all().await.map_err(io_err)?;
        drop(self.file);

        self.temp
            .persist(&self.dest_path)
            .map_err(|e| FetchError::Io {
                path: self.dest_path.clone(),
                source: e.error,
            })?;

        Ok(self.written)
    }
}

/// Remove whatever sits at `path` after a failed fetch. A missing file is fine.
pub(crate) async fn remove_stale(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed stale download {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_buffer_doubles_and_never_shrinks() {
        let mut buffer = GrowableBuffer::new();
        buffer.extend(&[1u8; 10]).unwrap();
        assert!(buffer.capacity() >= 10);

        let before = buffer.capacity();
        buffer.extend(&[2u8; 1]).unwrap();
        assert!(buffer.capacity() >= before * 2);
        assert_eq!(buffer.len(), 11);

        // A chunk larger than double the capacity grows to exactly fit
        let mut buffer = GrowableBuffer::with_capacity_hint(4).unwrap();
        buffer.extend(&[0u8; 4]).unwrap();
        buffer.extend(&[0u8; 100]).unwrap();
        assert_eq!(buffer.len(), 104);
        assert!(buffer.capacity() >= 104);

        let cap = buffer.capacity();
        buffer.extend(&[]).unwrap();
        assert_eq!(buffer.capacity(), cap);
    }

    #[test]
    fn test_impossible_reservation_is_out_of_memory() {
        let mut buffer = GrowableBuffer::new();
        buffer.extend(b"abc").unwrap();

        let err = buffer.reserve_for(usize::MAX).unwrap_err();
        assert!(matches!(err, FetchError::OutOfMemory { .. }));
        // Existing contents are untouched
        assert_eq!(buffer.into_vec(), b"abc");
    }

    #[tokio::test]
    async fn test_file_sink_commit_moves_into_place() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("downloads/photo.png");

        let mut sink = FileSink::create(&dest).await.unwrap();
        sink.write_chunk(b"hello ").await.unwrap();
        sink.write_chunk(b"frame").await.unwrap();
        assert_eq!(sink.bytes_written(), 11);
        assert!(!dest.exists());

        let written = sink.commit().await.unwrap();
        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello frame");
    }

    #[tokio::test]
    async fn test_dropped_file_sink_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("photo.png");

        let mut sink = FileSink::create(&dest).await.unwrap();
        sink.write_chunk(b"partial").await.unwrap();
        drop(sink);

        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove_stale_ignores_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("old.png");
        remove_stale(&path).await;

        std::fs::write(&path, b"old").unwrap();
        remove_stale(&path).await;
        assert!(!path.exists());
    }
}
