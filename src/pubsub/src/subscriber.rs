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

//! Receive messages with lease management.
//!
//! A [Session][session::Session] wraps a `StreamingPull` stream. It serves
//! messages one at a time, and extends their leases until the application
//! acknowledges them. [receive] drives a session for a bounded time.

/// Handlers for acknowledging or rejecting messages.
pub mod handler;

/// Defines the [Session][session::Session] type.
pub mod session;

mod keepalive;
mod lease_loop;
mod lease_state;
mod leaser;
mod stream;

use crate::Result;
use crate::client::Client;
use crate::config::ReceiveSettings;
use crate::model::PubsubMessage;
use handler::Handler;
use session::Session;
use tokio::time::{Duration, Instant};

/// Receives messages from `subscription` until `timeout` elapses.
///
/// Calls `callback` with each message and its handler, the callback is
/// expected to ack or nack the message. Returns the number of messages
/// delivered when the time runs out. Running out of time is not an error.
///
/// If the stream fails, for example because the subscription does not exist,
/// returns the error. In both cases the pending acks are sent before this
/// function returns.
///
/// The stream is opened before the deadline applies, so a missing
/// subscription is reported even when `timeout` is zero.
///
/// # Example
/// ```no_run
/// # use pubsub_bugbash::client::Client;
/// # use pubsub_bugbash::config::ReceiveSettings;
/// # use pubsub_bugbash::subscriber::receive;
/// # use std::time::Duration;
/// # async fn sample(client: Client) -> anyhow::Result<()> {
/// let count = receive(
///     &client,
///     "projects/my-project/subscriptions/my-subscription",
///     &ReceiveSettings::default(),
///     Duration::from_secs(10),
///     |m, h| {
///         println!("{:?}", m.data);
///         h.ack();
///     },
/// )
/// .await?;
/// println!("received {count} messages");
/// # Ok(()) }
/// ```
pub async fn receive<F>(
    client: &Client,
    subscription: &str,
    settings: &ReceiveSettings,
    timeout: Duration,
    mut callback: F,
) -> Result<usize>
where
    F: FnMut(PubsubMessage, Handler),
{
    let deadline = Instant::now() + timeout;
    let mut session = Session::new(client, subscription, settings);
    let mut count = 0_usize;
    let result = match session.open().await {
        Err(e) => Err(e),
        Ok(()) => loop {
            match tokio::time::timeout_at(deadline, session.next()).await {
                Err(_) => {
                    tracing::debug!(subscription, count, "receive deadline reached");
                    break Ok(count);
                }
                Ok(None) => {
                    tracing::debug!(subscription, count, "stream closed by the service");
                    break Ok(count);
                }
                Ok(Some(Err(e))) => break Err(e),
                Ok(Some(Ok((message, handler)))) => {
                    count += 1;
                    callback(message, handler);
                }
            }
        },
    };
    let closed = session.close().await;
    let count = result?;
    closed?;
    Ok(count)
}
