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

use crate::model::StreamingPullRequest;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval_at};
use tokio_util::sync::CancellationToken;

/// The service closes streams idle for about 90 seconds.
pub(super) const KEEPALIVE_PERIOD: Duration = Duration::from_secs(30);

/// Sends an empty request on the stream every [KEEPALIVE_PERIOD].
///
/// The task exits when `shutdown` is cancelled, or when the stream stops
/// accepting requests.
pub(super) fn spawn(
    request_tx: Sender<StreamingPullRequest>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut keepalive = interval_at(Instant::now() + KEEPALIVE_PERIOD, KEEPALIVE_PERIOD);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = keepalive.tick() => {
                    if request_tx.send(StreamingPullRequest::default()).await.is_err() {
                        tracing::debug!("stream closed, stopping keepalives");
                        break;
                    }
                }
            }
        }
    })
}
