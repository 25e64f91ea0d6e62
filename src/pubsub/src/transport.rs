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

use crate::client_builder::Error as BuilderError;
use crate::model::publisher_client::PublisherClient;
use crate::model::subscriber_client::SubscriberClient;
use crate::model::{
    AcknowledgeRequest, DeleteSubscriptionRequest, DeleteTopicRequest, GetSubscriptionRequest,
    GetTopicRequest, ModifyAckDeadlineRequest, PublishRequest, PublishResponse,
    StreamingPullRequest, Subscription, Topic, UpdateTopicRequest,
};
use crate::stub::{self, StreamingPullStream};
use crate::{Error, Result};
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, Endpoint};

/// Implements the stubs using the generated gRPC clients.
///
/// Both clients share one channel. The channel closes when the last clone of
/// this struct is dropped.
#[derive(Clone, Debug)]
pub(crate) struct Transport {
    publisher: PublisherClient<Channel>,
    subscriber: SubscriberClient<Channel>,
}

impl Transport {
    pub(crate) async fn connect(
        endpoint: &str,
        connect_timeout: Option<Duration>,
    ) -> std::result::Result<Self, BuilderError> {
        let mut endpoint =
            Endpoint::from_shared(endpoint.to_string()).map_err(BuilderError::endpoint)?;
        if let Some(timeout) = connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        let channel = endpoint.connect().await.map_err(BuilderError::transport)?;
        tracing::debug!(uri = %endpoint.uri(), "connected");
        Ok(Self {
            publisher: PublisherClient::new(channel.clone()),
            subscriber: SubscriberClient::new(channel),
        })
    }
}

#[async_trait::async_trait]
impl stub::Publisher for Transport {
    async fn create_topic(&self, req: Topic) -> Result<Topic> {
        let response = self.publisher.clone().create_topic(req).await?;
        Ok(response.into_inner())
    }

    async fn update_topic(&self, req: UpdateTopicRequest) -> Result<Topic> {
        let response = self.publisher.clone().update_topic(req).await?;
        Ok(response.into_inner())
    }

    async fn publish(&self, req: PublishRequest) -> Result<PublishResponse> {
        let response = self.publisher.clone().publish(req).await?;
        Ok(response.into_inner())
    }

    async fn get_topic(&self, req: GetTopicRequest) -> Result<Topic> {
        let response = self.publisher.clone().get_topic(req).await?;
        Ok(response.into_inner())
    }

    async fn delete_topic(&self, req: DeleteTopicRequest) -> Result<()> {
        self.publisher.clone().delete_topic(req).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl stub::Subscriber for Transport {
    async fn create_subscription(&self, req: Subscription) -> Result<Subscription> {
        let response = self.subscriber.clone().create_subscription(req).await?;
        Ok(response.into_inner())
    }

    async fn get_subscription(&self, req: GetSubscriptionRequest) -> Result<Subscription> {
        let response = self.subscriber.clone().get_subscription(req).await?;
        Ok(response.into_inner())
    }

    async fn delete_subscription(&self, req: DeleteSubscriptionRequest) -> Result<()> {
        self.subscriber.clone().delete_subscription(req).await?;
        Ok(())
    }

    async fn acknowledge(&self, req: AcknowledgeRequest) -> Result<()> {
        self.subscriber.clone().acknowledge(req).await?;
        Ok(())
    }

    async fn modify_ack_deadline(&self, req: ModifyAckDeadlineRequest) -> Result<()> {
        self.subscriber.clone().modify_ack_deadline(req).await?;
        Ok(())
    }

    async fn streaming_pull(
        &self,
        request_rx: Receiver<StreamingPullRequest>,
    ) -> Result<StreamingPullStream> {
        let request = ReceiverStream::new(request_rx);
        let stream = self
            .subscriber
            .clone()
            .streaming_pull(request)
            .await?
            .into_inner();
        Ok(stream.map_err(Error::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PubsubMessage, ReceivedMessage};
    use crate::stub::{Publisher as _, Subscriber as _};
    use pubsub_fake::FakeServer;

    const TOPIC: &str = "projects/p/topics/t";
    const SUBSCRIPTION: &str = "projects/p/subscriptions/s";

    async fn test_transport(server: &FakeServer) -> anyhow::Result<Transport> {
        Ok(Transport::connect(&server.endpoint(), None).await?)
    }

    fn topic() -> Topic {
        Topic {
            name: TOPIC.to_string(),
            ..Default::default()
        }
    }

    fn subscription() -> Subscription {
        Subscription {
            name: SUBSCRIPTION.to_string(),
            topic: TOPIC.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn topic_lifecycle() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let transport = test_transport(&server).await?;

        let created = transport.create_topic(topic()).await?;
        assert_eq!(created.name, TOPIC);

        let got = transport
            .get_topic(GetTopicRequest {
                topic: TOPIC.to_string(),
            })
            .await?;
        assert_eq!(got.name, TOPIC);

        let response = transport
            .publish(PublishRequest {
                topic: TOPIC.to_string(),
                messages: vec![PubsubMessage {
                    data: b"hello".to_vec(),
                    ..Default::default()
                }],
            })
            .await?;
        assert_eq!(response.message_ids.len(), 1, "{response:?}");

        transport
            .delete_topic(DeleteTopicRequest {
                topic: TOPIC.to_string(),
            })
            .await?;
        let err = transport
            .get_topic(GetTopicRequest {
                topic: TOPIC.to_string(),
            })
            .await
            .expect_err("topic was deleted");
        assert!(err.is_not_found(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn subscription_lifecycle() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let transport = test_transport(&server).await?;

        let err = transport
            .create_subscription(subscription())
            .await
            .expect_err("the topic does not exist");
        assert!(err.is_not_found(), "{err:?}");

        transport.create_topic(topic()).await?;
        let created = transport.create_subscription(subscription()).await?;
        assert_eq!(created.topic, TOPIC);
        let got = transport
            .get_subscription(GetSubscriptionRequest {
                subscription: SUBSCRIPTION.to_string(),
            })
            .await?;
        assert_eq!(got.name, SUBSCRIPTION);

        transport
            .delete_subscription(DeleteSubscriptionRequest {
                subscription: SUBSCRIPTION.to_string(),
            })
            .await?;
        let err = transport
            .delete_subscription(DeleteSubscriptionRequest {
                subscription: SUBSCRIPTION.to_string(),
            })
            .await
            .expect_err("subscription was deleted");
        assert!(err.is_not_found(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn streaming_pull() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let transport = test_transport(&server).await?;
        transport.create_topic(topic()).await?;
        transport.create_subscription(subscription()).await?;
        server.publish(TOPIC, "hello", &[])?;

        let (request_tx, request_rx) = tokio::sync::mpsc::channel(1);
        request_tx
            .send(StreamingPullRequest {
                subscription: SUBSCRIPTION.to_string(),
                stream_ack_deadline_seconds: 10,
                ..Default::default()
            })
            .await?;
        let mut stream = transport.streaming_pull(request_rx).await?;
        let response = stream.next().await.transpose()?.expect("a response");
        let messages: Vec<Vec<u8>> = response
            .received_messages
            .iter()
            .filter_map(|m: &ReceivedMessage| m.message.as_ref())
            .map(|m| m.data.clone())
            .collect();
        assert_eq!(messages, vec![b"hello".to_vec()]);

        let ack_ids = response
            .received_messages
            .into_iter()
            .map(|m| m.ack_id)
            .collect();
        transport
            .acknowledge(AcknowledgeRequest {
                subscription: SUBSCRIPTION.to_string(),
                ack_ids,
            })
            .await?;
        assert_eq!(server.acknowledged(SUBSCRIPTION).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn streaming_pull_missing_subscription() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let transport = test_transport(&server).await?;

        let (request_tx, request_rx) = tokio::sync::mpsc::channel(1);
        request_tx
            .send(StreamingPullRequest {
                subscription: SUBSCRIPTION.to_string(),
                stream_ack_deadline_seconds: 10,
                ..Default::default()
            })
            .await?;
        // Depending on timing, the error arrives when opening the stream or
        // as the first item.
        let err = match transport.streaming_pull(request_rx).await {
            Err(e) => e,
            Ok(mut stream) => stream
                .next()
                .await
                .expect("an item")
                .expect_err("the subscription does not exist"),
        };
        assert!(err.is_not_found(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn modify_ack_deadline() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let transport = test_transport(&server).await?;
        let err = transport
            .modify_ack_deadline(ModifyAckDeadlineRequest {
                subscription: SUBSCRIPTION.to_string(),
                ack_deadline_seconds: 0,
                ack_ids: vec!["unknown".to_string()],
            })
            .await
            .expect_err("the subscription does not exist");
        assert!(err.is_not_found(), "{err:?}");
        Ok(())
    }
}
