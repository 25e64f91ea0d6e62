// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::keepalive;
use crate::client::Client;
use crate::model::{StreamingPullRequest, StreamingPullResponse};
use crate::stub::StreamingPullStream;
use crate::{Error, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// An open `StreamingPull` stream, with its keepalive task.
///
/// Dropping the stream stops the keepalives, which closes the request side of
/// the stream.
pub(super) struct Stream {
    inner: StreamingPullStream,
    _keepalive: DropGuard,
}

impl Stream {
    pub(super) async fn open(client: &Client, initial_req: StreamingPullRequest) -> Result<Self> {
        // The only other writes are keepalives, a buffer of one is enough.
        let (request_tx, request_rx) = mpsc::channel(1);
        request_tx.send(initial_req).await.map_err(Error::io)?;

        // Start the keepalives before opening the stream. Opening the stream
        // may not complete until the first response arrives, and the service
        // closes idle streams.
        let shutdown = CancellationToken::new();
        keepalive::spawn(request_tx, shutdown.clone());
        let guard = shutdown.drop_guard();

        let inner = client.streaming_pull(request_rx).await?;
        Ok(Self {
            inner,
            _keepalive: guard,
        })
    }

    /// The next response, `None` if the service closed the stream.
    pub(super) async fn next_message(&mut self) -> Option<Result<StreamingPullResponse>> {
        self.inner.next().await
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}
