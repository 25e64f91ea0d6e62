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

//! An in-memory fake for the `google.pubsub.v1.Publisher` and
//! `google.pubsub.v1.Subscriber` gRPC services.
//!
//! Use this crate in tests. [FakeServer::start] serves both services on a
//! random local port. The tests point the client library at
//! [FakeServer::endpoint], inject messages with [FakeServer::publish], and
//! inspect the results with [FakeServer::acknowledged] and friends.
//!
//! # Example
//! ```
//! use pubsub_fake::FakeServer;
//! # async fn test() -> anyhow::Result<()> {
//! let server = FakeServer::start().await?;
//! let _id = server.publish("projects/p/topics/my-topic", "hello", &[("k", "v")])?;
//! assert_eq!(server.published("projects/p/topics/my-topic").len(), 1);
//! // Use `server.endpoint()` to configure a client.
//! # Ok(()) }
//! ```

mod service;
mod state;

use pubsub_bugbash_proto::google::pubsub::v1::{
    PubsubMessage, Subscription, Topic, publisher_server::PublisherServer,
    subscriber_server::SubscriberServer,
};
use service::{Service, lock};
use state::State;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

pub use state::DELETED_TOPIC;

/// A running fake service.
///
/// Dropping the server stops accepting new calls.
#[derive(Debug)]
pub struct FakeServer {
    endpoint: String,
    state: Arc<Mutex<State>>,
    server: JoinHandle<()>,
}

impl FakeServer {
    /// Starts a fake service on `127.0.0.1` and a random port.
    pub async fn start() -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(Mutex::new(State::default()));
        let service = Service::new(state.clone());
        let server = tokio::spawn(async move {
            let stream = tokio_stream::wrappers::TcpListenerStream::new(listener);

            let _ = tonic::transport::Server::builder()
                .add_service(PublisherServer::new(service.clone()))
                .add_service(SubscriberServer::new(service))
                .serve_with_incoming(stream)
                .await;
        });

        Ok(Self {
            endpoint: to_uri(addr),
            state,
            server,
        })
    }

    /// The endpoint for the client library, such as `http://127.0.0.1:1234`.
    pub fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    /// Publishes a message directly, bypassing the gRPC layer.
    ///
    /// Creates the topic if it does not exist. Returns the message id.
    pub fn publish<T: Into<Vec<u8>>>(
        &self,
        topic: &str,
        data: T,
        attributes: &[(&str, &str)],
    ) -> Result<String, tonic::Status> {
        let message = PubsubMessage {
            data: data.into(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        };
        lock(&self.state).inject(topic, message)
    }

    /// Returns the topic, if it exists.
    pub fn topic(&self, name: &str) -> Option<Topic> {
        lock(&self.state).topic(name)
    }

    /// Returns the subscription, if it exists.
    pub fn subscription(&self, name: &str) -> Option<Subscription> {
        lock(&self.state).subscription(name)
    }

    /// All the messages published to `topic`, in order.
    pub fn published(&self, topic: &str) -> Vec<PubsubMessage> {
        lock(&self.state).published(topic)
    }

    /// The ids of the messages acknowledged in `subscription`, in order.
    pub fn acknowledged(&self, subscription: &str) -> Vec<String> {
        lock(&self.state).acknowledged(subscription)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn to_uri(addr: SocketAddr) -> String {
    if addr.is_ipv6() {
        format!("http://[{}]:{}", addr.ip(), addr.port())
    } else {
        format!("http://{}:{}", addr.ip(), addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsub_bugbash_proto::google::pubsub::v1::{
        AcknowledgeRequest, GetTopicRequest, PublishRequest, StreamingPullRequest,
        publisher_client::PublisherClient, subscriber_client::SubscriberClient,
    };
    use tokio_stream::wrappers::ReceiverStream;
    use tonic::Code;
    use tonic::transport::Channel;

    const TOPIC: &str = "projects/p/topics/topic-a";
    const SUBSCRIPTION: &str = "projects/p/subscriptions/sub-a";

    async fn clients(
        server: &FakeServer,
    ) -> anyhow::Result<(PublisherClient<Channel>, SubscriberClient<Channel>)> {
        let channel = Channel::from_shared(server.endpoint())?.connect().await?;
        Ok((
            PublisherClient::new(channel.clone()),
            SubscriberClient::new(channel),
        ))
    }

    fn pull_request() -> StreamingPullRequest {
        StreamingPullRequest {
            subscription: SUBSCRIPTION.to_string(),
            stream_ack_deadline_seconds: 10,
            ..Default::default()
        }
    }

    #[test]
    fn uri() {
        let v4: SocketAddr = "127.0.0.1:1234".parse().unwrap();
        assert_eq!(to_uri(v4), "http://127.0.0.1:1234");
        let v6: SocketAddr = "[::1]:1234".parse().unwrap();
        assert_eq!(to_uri(v6), "http://[::1]:1234");
    }

    #[tokio::test]
    async fn publish_and_inspect() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        assert!(server.endpoint().starts_with("http://127.0.0.1:"));
        let id = server.publish(TOPIC, "hello", &[("k", "v")])?;

        let topic = server.topic(TOPIC).expect("topic was created");
        assert_eq!(topic.name, TOPIC);
        let published = server.published(TOPIC);
        assert_eq!(published.len(), 1, "{published:?}");
        assert_eq!(published[0].message_id, id);
        assert_eq!(published[0].data, b"hello");
        assert_eq!(published[0].attributes.get("k").map(String::as_str), Some("v"));
        assert!(server.subscription(SUBSCRIPTION).is_none());
        assert!(server.acknowledged(SUBSCRIPTION).is_empty());

        let err = server.publish("invalid", "hello", &[]).unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        Ok(())
    }

    #[tokio::test]
    async fn unary_rpcs() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let (mut publisher, mut subscriber) = clients(&server).await?;

        let status = publisher
            .get_topic(GetTopicRequest {
                topic: TOPIC.to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        publisher
            .create_topic(Topic {
                name: TOPIC.to_string(),
                ..Default::default()
            })
            .await?;
        subscriber
            .create_subscription(Subscription {
                name: SUBSCRIPTION.to_string(),
                topic: TOPIC.to_string(),
                ..Default::default()
            })
            .await?;
        let response = publisher
            .publish(PublishRequest {
                topic: TOPIC.to_string(),
                messages: vec![PubsubMessage {
                    data: b"hello".to_vec(),
                    ..Default::default()
                }],
            })
            .await?
            .into_inner();
        assert_eq!(response.message_ids.len(), 1, "{response:?}");

        let status = publisher
            .publish(PublishRequest {
                topic: TOPIC.to_string(),
                messages: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        Ok(())
    }

    #[tokio::test]
    async fn streaming_pull_delivers_and_acks() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let (mut publisher, mut subscriber) = clients(&server).await?;
        publisher
            .create_topic(Topic {
                name: TOPIC.to_string(),
                ..Default::default()
            })
            .await?;
        subscriber
            .create_subscription(Subscription {
                name: SUBSCRIPTION.to_string(),
                topic: TOPIC.to_string(),
                ..Default::default()
            })
            .await?;
        let id = server.publish(TOPIC, "hello", &[])?;

        let (request_tx, request_rx) = tokio::sync::mpsc::channel(4);
        request_tx.send(pull_request()).await?;
        let mut stream = subscriber
            .streaming_pull(ReceiverStream::new(request_rx))
            .await?
            .into_inner();
        let response = stream.message().await?.expect("a response");
        assert_eq!(response.received_messages.len(), 1, "{response:?}");
        let ack_id = response.received_messages[0].ack_id.clone();

        // Acks sent on the stream are applied asynchronously.
        request_tx
            .send(StreamingPullRequest {
                ack_ids: vec![ack_id],
                ..Default::default()
            })
            .await?;
        for _ in 0..100 {
            if !server.acknowledged(SUBSCRIPTION).is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(server.acknowledged(SUBSCRIPTION), vec![id]);
        Ok(())
    }

    #[tokio::test]
    async fn streaming_pull_missing_subscription() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let (_, mut subscriber) = clients(&server).await?;

        let (request_tx, request_rx) = tokio::sync::mpsc::channel(1);
        request_tx.send(pull_request()).await?;
        let status = match subscriber
            .streaming_pull(ReceiverStream::new(request_rx))
            .await
        {
            Err(status) => status,
            Ok(response) => response
                .into_inner()
                .message()
                .await
                .expect_err("the subscription does not exist"),
        };
        assert_eq!(status.code(), Code::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn unary_acknowledge() -> anyhow::Result<()> {
        let server = FakeServer::start().await?;
        let (_, mut subscriber) = clients(&server).await?;
        let status = subscriber
            .acknowledge(AcknowledgeRequest {
                subscription: SUBSCRIPTION.to_string(),
                ack_ids: vec!["unknown".to_string()],
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
        Ok(())
    }
}
