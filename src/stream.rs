//! Streaming an artifact out of its workspace.
//!
//! [`ArtifactStream`] yields the output file in chunks and owns the request
//! workspace. The directory is removed when the stream is dropped: after the
//! last chunk has been sent, or early when the client disconnects and the
//! HTTP body is dropped mid-transfer.

use crate::pipeline::workspace::Workspace;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;

pub struct ArtifactStream {
    inner: ReaderStream<tokio::fs::File>,
    // Dropped after `inner`, so the file handle closes before the directory goes.
    _workspace: Workspace,
}

impl ArtifactStream {
    pub(crate) fn new(file: tokio::fs::File, workspace: Workspace) -> Self {
        Self {
            inner: ReaderStream::new(file),
            _workspace: workspace,
        }
    }
}

impl std::fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStream")
            .field("workspace", &self._workspace)
            .finish_non_exhaustive()
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
