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

//! Traits to mock the clients in this crate.
//!
//! Application developers may need to mock the clients in this crate to test
//! how their application works with different (and sometimes hard to
//! trigger) error conditions. The [Client][crate::client::Client] wraps these
//! traits, see [Client::from_stub][crate::client::Client::from_stub].
//!
//! The default implementation sends the requests to the service using gRPC.

use crate::Result;
use crate::model::{
    AcknowledgeRequest, DeleteSubscriptionRequest, DeleteTopicRequest, GetSubscriptionRequest,
    GetTopicRequest, ModifyAckDeadlineRequest, PublishRequest, PublishResponse,
    StreamingPullRequest, StreamingPullResponse, Subscription, Topic, UpdateTopicRequest,
};
use futures::stream::BoxStream;
use tokio::sync::mpsc::Receiver;

/// The stream of responses returned by [Subscriber::streaming_pull].
pub type StreamingPullStream = BoxStream<'static, Result<StreamingPullResponse>>;

/// The admin and publish operations on topics.
#[async_trait::async_trait]
pub trait Publisher: std::fmt::Debug + Send + Sync {
    async fn create_topic(&self, req: Topic) -> Result<Topic>;

    async fn update_topic(&self, req: UpdateTopicRequest) -> Result<Topic>;

    async fn publish(&self, req: PublishRequest) -> Result<PublishResponse>;

    async fn get_topic(&self, req: GetTopicRequest) -> Result<Topic>;

    async fn delete_topic(&self, req: DeleteTopicRequest) -> Result<()>;
}

/// The admin and receive operations on subscriptions.
#[async_trait::async_trait]
pub trait Subscriber: std::fmt::Debug + Send + Sync {
    async fn create_subscription(&self, req: Subscription) -> Result<Subscription>;

    async fn get_subscription(&self, req: GetSubscriptionRequest) -> Result<Subscription>;

    async fn delete_subscription(&self, req: DeleteSubscriptionRequest) -> Result<()>;

    async fn acknowledge(&self, req: AcknowledgeRequest) -> Result<()>;

    async fn modify_ack_deadline(&self, req: ModifyAckDeadlineRequest) -> Result<()>;

    /// Opens a bidirectional stream.
    ///
    /// The caller feeds requests through `request_rx`, the first request must
    /// name the subscription. Dropping the sender half closes the stream.
    async fn streaming_pull(
        &self,
        request_rx: Receiver<StreamingPullRequest>,
    ) -> Result<StreamingPullStream>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    mockall::mock! {
        #[derive(Debug)]
        pub(crate) Publisher {}
        #[async_trait::async_trait]
        impl Publisher for Publisher {
            async fn create_topic(&self, req: Topic) -> Result<Topic>;
            async fn update_topic(&self, req: UpdateTopicRequest) -> Result<Topic>;
            async fn publish(&self, req: PublishRequest) -> Result<PublishResponse>;
            async fn get_topic(&self, req: GetTopicRequest) -> Result<Topic>;
            async fn delete_topic(&self, req: DeleteTopicRequest) -> Result<()>;
        }
    }

    mockall::mock! {
        #[derive(Debug)]
        pub(crate) Subscriber {}
        #[async_trait::async_trait]
        impl Subscriber for Subscriber {
            async fn create_subscription(&self, req: Subscription) -> Result<Subscription>;
            async fn get_subscription(&self, req: GetSubscriptionRequest) -> Result<Subscription>;
            async fn delete_subscription(&self, req: DeleteSubscriptionRequest) -> Result<()>;
            async fn acknowledge(&self, req: AcknowledgeRequest) -> Result<()>;
            async fn modify_ack_deadline(&self, req: ModifyAckDeadlineRequest) -> Result<()>;
            async fn streaming_pull(
                &self,
                request_rx: Receiver<StreamingPullRequest>,
            ) -> Result<StreamingPullStream>;
        }
    }

    /// A stream that yields the responses sent on `rx`, ending when all the
    /// senders are dropped.
    pub(crate) fn mock_stream(
        rx: Receiver<Result<StreamingPullResponse>>,
    ) -> StreamingPullStream {
        use futures::StreamExt;
        tokio_stream::wrappers::ReceiverStream::new(rx).boxed()
    }
}
