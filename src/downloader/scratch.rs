//! Per-request scratch directories

use crate::utils::error::Result;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// A temporary directory owned by one request.
///
/// Removed on `release()` or, failing that, on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh directory under `root` (system temp dir when `None`)
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tubeserve-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        debug!("Created scratch dir {:?}", path);
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now, logging instead of failing
    pub fn release(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!("Removed scratch dir {:?}", self.path),
                Err(e) => warn!("Failed to remove scratch dir {:?}: {}", self.path, e),
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.release();
    }
}

/// Body stream over a file inside a scratch directory.
///
/// The directory is released as soon as the last chunk has been yielded, or
/// when the stream is dropped early (client went away).
pub struct ScratchFileStream {
    inner: ReaderStream<File>,
    scratch: Option<ScratchDir>,
}

impl ScratchFileStream {
    pub async fn open(path: &Path, scratch: ScratchDir) -> Result<Self> {
        let file = File::open(path).await?;
        Ok(Self {
            inner: ReaderStream::new(file),
            scratch: Some(scratch),
        })
    }
}

impl Stream for ScratchFileStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) | Poll::Ready(Some(Err(_))) = polled {
            if let Some(mut scratch) = self.scratch.take() {
                scratch.release();
            }
        }
        polled
    }
}
