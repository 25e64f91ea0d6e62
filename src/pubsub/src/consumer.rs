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

//! Receive messages for a bounded time, creating the subscription if needed.

use crate::Result;
use crate::client::Client;
use crate::config::{Config, ReceiveSettings};
use crate::model::{PubsubMessage, Subscription};
use crate::optimistic::{Stage, with_create};
use crate::subscriber::handler::Handler;
use crate::subscriber::receive;
use std::time::Duration;

/// What happened while consuming messages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConsumeSummary {
    /// The number of messages received and acknowledged.
    pub received: usize,
    /// True if the subscription was created, and a second pull was made.
    pub created_subscription: bool,
}

/// Pulls messages from a single subscription.
///
/// Each message is logged and acknowledged. If the subscription does not
/// exist, the consumer creates it, bound to the configured topic, and pulls
/// again with a fresh time bound.
#[derive(Clone, Debug)]
pub struct Consumer {
    client: Client,
    subscription: String,
    topic: String,
    settings: ReceiveSettings,
}

impl Consumer {
    pub fn new(client: &Client, config: &Config) -> Self {
        Self {
            client: client.clone(),
            subscription: config.subscription_name(),
            topic: config.topic_name(),
            settings: config.receive_settings().clone(),
        }
    }

    /// The full name of the subscription.
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Pulls messages for `timeout`.
    ///
    /// Reaching the timeout is the normal way to finish. The only recovered
    /// error is `NOT_FOUND` on the first pull, any other error is returned,
    /// including errors from the pull after creating the subscription.
    pub async fn consume(&self, timeout: Duration) -> Result<ConsumeSummary> {
        let outcome = with_create(
            &self.subscription,
            |stage| self.pull(stage, timeout),
            || self.create_subscription(),
        )
        .await?;
        Ok(ConsumeSummary {
            received: outcome.value,
            created_subscription: outcome.created(),
        })
    }

    async fn pull(&self, stage: Stage, timeout: Duration) -> Result<usize> {
        let source = match stage {
            Stage::Try => "existing subscription",
            _ => "new subscriber",
        };
        receive(
            &self.client,
            &self.subscription,
            &self.settings,
            timeout,
            |message: PubsubMessage, handler: Handler| {
                let payload = String::from_utf8_lossy(&message.data);
                tracing::info!("Got from {source}: {payload:?}");
                handler.ack();
            },
        )
        .await
    }

    async fn create_subscription(&self) -> Result<Subscription> {
        self.client
            .create_subscription(Subscription {
                name: self.subscription.clone(),
                topic: self.topic.clone(),
                ..Default::default()
            })
            .await
    }
}

/// Pulls from the configured subscription for the configured time.
///
/// # Example
/// ```no_run
/// # async fn sample() -> anyhow::Result<()> {
/// use pubsub_bugbash::{client::Client, config::Config, consumer::consume_messages};
/// let config = Config::from_env();
/// let client = Client::builder(&config).build().await?;
/// let summary = consume_messages(&client, &config).await?;
/// println!("received {} messages", summary.received);
/// # Ok(()) }
/// ```
pub async fn consume_messages(client: &Client, config: &Config) -> Result<ConsumeSummary> {
    Consumer::new(client, config)
        .consume(config.receive_timeout())
        .await
}
