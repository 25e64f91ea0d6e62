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

//! Publish a message, creating the topic if needed.

use crate::client::Client;
use crate::config::Config;
use crate::model::{PublishRequest, PubsubMessage, Topic};
use crate::optimistic::{Stage, with_create};
use crate::{Error, Result};

/// The payload published by the exercise.
pub const SINGLE_MESSAGE: &str = "a single message";

/// The acknowledgment for a published message.
#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    /// The id assigned by the service.
    pub message_id: String,
    /// True if the topic was created before the message was published.
    pub created_topic: bool,
}

/// Publishes messages to a single topic.
///
/// The topic is not checked up front. If the service reports the topic is
/// missing, the producer creates it with the default configuration and
/// publishes once more.
#[derive(Clone, Debug)]
pub struct Producer {
    client: Client,
    topic: String,
}

impl Producer {
    pub fn new(client: &Client, config: &Config) -> Self {
        Self {
            client: client.clone(),
            topic: config.topic_name(),
        }
    }

    /// The full name of the topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publishes `payload` and waits for the service to acknowledge it.
    ///
    /// # Example
    /// ```no_run
    /// # use pubsub_bugbash::{client::Client, config::Config, producer::Producer};
    /// # async fn sample(client: Client, config: Config) -> anyhow::Result<()> {
    /// let producer = Producer::new(&client, &config);
    /// let receipt = producer.publish("hello").await?;
    /// println!("published {} (created topic: {})", receipt.message_id, receipt.created_topic);
    /// # Ok(()) }
    /// ```
    pub async fn publish<T: Into<Vec<u8>>>(&self, payload: T) -> Result<Receipt> {
        let message = PubsubMessage {
            data: payload.into(),
            ..Default::default()
        };
        let outcome = with_create(
            &self.topic,
            |stage| self.publish_once(stage, message.clone()),
            || self.create_topic(),
        )
        .await?;
        tracing::info!(
            topic = %self.topic,
            message_id = %outcome.value,
            "published message"
        );
        Ok(Receipt {
            created_topic: outcome.created(),
            message_id: outcome.value,
        })
    }

    async fn publish_once(&self, stage: Stage, message: PubsubMessage) -> Result<String> {
        tracing::debug!(topic = %self.topic, %stage, "publishing");
        let request = PublishRequest {
            topic: self.topic.clone(),
            messages: vec![message],
        };
        let response = self.client.publish(request).await?;
        response
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| Error::other("the publish response has no message ids"))
    }

    async fn create_topic(&self) -> Result<Topic> {
        self.client
            .create_topic(Topic {
                name: self.topic.clone(),
                ..Default::default()
            })
            .await
    }
}

/// Publishes [SINGLE_MESSAGE] to the configured topic.
pub async fn produce_message(client: &Client, config: &Config) -> Result<Receipt> {
    Producer::new(client, config).publish(SINGLE_MESSAGE).await
}
