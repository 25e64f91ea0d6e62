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

use super::handler::{AckResult, Handler};
use super::lease_loop::LeaseLoop;
use super::lease_state::LeaseOptions;
use super::leaser::DefaultLeaser;
use super::stream::Stream;
use crate::client::Client;
use crate::config::ReceiveSettings;
use crate::model::{PubsubMessage, StreamingPullRequest};
use crate::{Error, Result};
use std::collections::VecDeque;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Represents an open subscribe session.
///
/// This is a stream-like struct for serving messages to an application. The
/// session manages the leases of the messages it serves, until the
/// application acknowledges or rejects them with the [Handler].
///
/// # Example
/// ```no_run
/// # use pubsub_bugbash::client::Client;
/// # use pubsub_bugbash::config::ReceiveSettings;
/// # use pubsub_bugbash::subscriber::session::Session;
/// # async fn sample(client: Client) -> anyhow::Result<()> {
/// let mut session = Session::new(
///     &client,
///     "projects/my-project/subscriptions/my-subscription",
///     &ReceiveSettings::default(),
/// );
/// while let Some((m, h)) = session.next().await.transpose()? {
///     println!("Received message m={m:?}");
///     h.ack();
/// }
/// session.close().await?;
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Session {
    client: Client,

    /// The initial request used to start a stream.
    initial_req: StreamingPullRequest,

    /// The bidirectional stream.
    ///
    /// Opened when the application asks for the first message. Opening the
    /// stream may block until the first response is available.
    stream: Option<Stream>,

    /// Each response may contain many messages, the application receives
    /// them one at a time, in order.
    pool: VecDeque<(PubsubMessage, Handler)>,

    /// New messages, sent to the lease management task.
    message_tx: UnboundedSender<String>,

    /// Each `Handler` holds a clone of this.
    ack_tx: UnboundedSender<AckResult>,

    lease_loop: JoinHandle<()>,
}

impl Session {
    /// Creates a session for `subscription`.
    ///
    /// No requests are made until the first call to [next][Session::next].
    /// This starts the lease management task, and must be called from
    /// within a tokio runtime.
    pub fn new<S>(client: &Client, subscription: S, settings: &ReceiveSettings) -> Self
    where
        S: Into<String>,
    {
        let subscription = subscription.into();
        let lease_deadline = settings.lease_deadline().as_secs() as i32;
        let leaser = DefaultLeaser::new(client.clone(), subscription.clone(), lease_deadline);
        let LeaseLoop {
            handle: lease_loop,
            message_tx,
            ack_tx,
        } = LeaseLoop::new(leaser, LeaseOptions::new(settings));

        let initial_req = StreamingPullRequest {
            subscription,
            stream_ack_deadline_seconds: settings.ack_deadline_seconds(),
            max_outstanding_messages: settings.max_outstanding_messages(),
            max_outstanding_bytes: settings.max_outstanding_bytes(),
            client_id: uuid::Uuid::new_v4().to_string(),
            // The client accepts heartbeats, empty responses, from the service.
            protocol_version: 1,
            ..Default::default()
        };

        Self {
            client: client.clone(),
            initial_req,
            stream: None,
            pool: VecDeque::new(),
            message_tx,
            ack_tx,
            lease_loop,
        }
    }

    /// Returns the next message received on this subscription.
    ///
    /// The message data is returned along with a [Handler] for acknowledging
    /// (ack) or rejecting (nack) the message.
    ///
    /// If the stream cannot be opened, or breaks, the error is returned. The
    /// session does not resume broken streams.
    ///
    /// `None` represents the end of a stream. In practice the service keeps
    /// the stream open until it is cancelled or fails.
    pub async fn next(&mut self) -> Option<Result<(PubsubMessage, Handler)>> {
        loop {
            if let Some(item) = self.pool.pop_front() {
                return Some(Ok(item));
            }
            if let Err(e) = self.stream_next().await? {
                return Some(Err(e));
            }
        }
    }

    /// Opens the stream, if it is not open already.
    ///
    /// Fails if the service rejects the stream, for example when the
    /// subscription does not exist. [next][Session::next] calls this as
    /// needed.
    pub async fn open(&mut self) -> Result<()> {
        if self.stream.is_none() {
            self.stream = Some(Stream::open(&self.client, self.initial_req.clone()).await?);
        }
        Ok(())
    }

    /// Closes the session.
    ///
    /// Closes the stream, then waits for the lease management task to send
    /// the pending acks and reject the messages still under lease.
    pub async fn close(self) -> Result<()> {
        drop(self.stream);
        drop(self.message_tx);
        self.lease_loop.await.map_err(Error::other)
    }

    async fn stream_next(&mut self) -> Option<Result<()>> {
        if let Err(e) = self.open().await {
            return Some(Err(e));
        }
        let stream = self.stream.as_mut()?;
        let response = match stream.next_message().await? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };

        for rm in response.received_messages {
            let Some(message) = rm.message else {
                // A corrupted response, or a service bug. Ignore the ack id.
                continue;
            };
            let _ = self.message_tx.send(rm.ack_id.clone());
            self.pool.push_back((
                message,
                Handler {
                    ack_id: rm.ack_id,
                    ack_tx: self.ack_tx.clone(),
                },
            ));
        }
        Some(Ok(()))
    }
}
