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

//! The client shared by the exercises.

use crate::Result;
use crate::client_builder::ClientBuilder;
use crate::config::Config;
use crate::model::{
    AcknowledgeRequest, DeleteSubscriptionRequest, DeleteTopicRequest, GetSubscriptionRequest,
    GetTopicRequest, ModifyAckDeadlineRequest, PublishRequest, PublishResponse,
    StreamingPullRequest, Subscription, Topic, UpdateTopicRequest,
};
use crate::stub::{self, StreamingPullStream};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

/// Implements a client for the Pub/Sub publisher and subscriber services.
///
/// # Example
/// ```no_run
/// # async fn sample() -> anyhow::Result<()> {
/// # use pubsub_bugbash::client::Client;
/// # use pubsub_bugbash::config::Config;
/// # use pubsub_bugbash::model::GetTopicRequest;
/// let config = Config::from_env();
/// let client = Client::builder(&config).build().await?;
/// let topic = client
///     .get_topic(GetTopicRequest { topic: config.topic_name() })
///     .await?;
/// println!("{topic:?}");
/// # Ok(()) }
/// ```
///
/// # Pooling and Cloning
///
/// `Client` holds a connection pool internally, it is advised to create one
/// and then reuse it. You do not need to wrap `Client` in an [Rc](std::rc::Rc)
/// or [Arc] to reuse it, because it already uses an `Arc` internally. The
/// connection closes when the last clone is dropped.
#[derive(Clone, Debug)]
pub struct Client {
    publisher: Arc<dyn stub::Publisher>,
    subscriber: Arc<dyn stub::Subscriber>,
}

impl Client {
    /// Returns a builder for [Client], initialized from `config`.
    pub fn builder(config: &Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Creates a new client from the provided stubs.
    ///
    /// The most common case for calling this function is in tests mocking the
    /// client's behavior.
    pub fn from_stub(
        publisher: Arc<dyn stub::Publisher>,
        subscriber: Arc<dyn stub::Subscriber>,
    ) -> Self {
        Self {
            publisher,
            subscriber,
        }
    }

    /// Creates the given topic with the given name.
    pub async fn create_topic(&self, req: Topic) -> Result<Topic> {
        self.publisher.create_topic(req).await
    }

    /// Updates the fields listed in the update mask of an existing topic.
    pub async fn update_topic(&self, req: UpdateTopicRequest) -> Result<Topic> {
        self.publisher.update_topic(req).await
    }

    /// Adds one or more messages to the topic.
    ///
    /// Returns `NOT_FOUND` if the topic does not exist.
    pub async fn publish(&self, req: PublishRequest) -> Result<PublishResponse> {
        self.publisher.publish(req).await
    }

    /// Gets the configuration of a topic.
    pub async fn get_topic(&self, req: GetTopicRequest) -> Result<Topic> {
        self.publisher.get_topic(req).await
    }

    /// Deletes the topic.
    ///
    /// Existing subscriptions to this topic are not deleted, but their `topic`
    /// field is set to `_deleted-topic_`.
    pub async fn delete_topic(&self, req: DeleteTopicRequest) -> Result<()> {
        self.publisher.delete_topic(req).await
    }

    /// Creates a subscription to a given topic.
    pub async fn create_subscription(&self, req: Subscription) -> Result<Subscription> {
        self.subscriber.create_subscription(req).await
    }

    /// Gets the configuration details of a subscription.
    pub async fn get_subscription(&self, req: GetSubscriptionRequest) -> Result<Subscription> {
        self.subscriber.get_subscription(req).await
    }

    /// Deletes an existing subscription.
    pub async fn delete_subscription(&self, req: DeleteSubscriptionRequest) -> Result<()> {
        self.subscriber.delete_subscription(req).await
    }

    pub async fn acknowledge(&self, req: AcknowledgeRequest) -> Result<()> {
        self.subscriber.acknowledge(req).await
    }

    pub async fn modify_ack_deadline(&self, req: ModifyAckDeadlineRequest) -> Result<()> {
        self.subscriber.modify_ack_deadline(req).await
    }

    /// Opens a streaming pull.
    ///
    /// Most applications should use [Session][crate::subscriber::session::Session],
    /// which manages the stream, keepalives, and leases.
    pub async fn streaming_pull(
        &self,
        request_rx: Receiver<StreamingPullRequest>,
    ) -> Result<StreamingPullStream> {
        self.subscriber.streaming_pull(request_rx).await
    }
}
