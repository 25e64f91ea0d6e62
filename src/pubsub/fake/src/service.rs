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

use crate::state::State;
use pubsub_bugbash_proto::google::pubsub::v1::{
    AcknowledgeRequest, DeleteSubscriptionRequest, DeleteTopicRequest, GetSubscriptionRequest,
    GetTopicRequest, ModifyAckDeadlineRequest, PublishRequest, PublishResponse,
    StreamingPullRequest, StreamingPullResponse, Subscription, Topic, UpdateTopicRequest,
    publisher_server::Publisher, subscriber_server::Subscriber,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

/// How often open streams check for new messages.
const POLL_PERIOD: Duration = Duration::from_millis(10);

type PullResult = Result<StreamingPullResponse, Status>;

/// Implements both gRPC services over the shared state.
#[derive(Clone, Debug)]
pub(crate) struct Service {
    state: Arc<Mutex<State>>,
}

impl Service {
    pub fn new(state: Arc<Mutex<State>>) -> Self {
        Self { state }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

pub(crate) fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().expect("fake server state is poisoned")
}

#[tonic::async_trait]
impl Publisher for Service {
    async fn create_topic(&self, request: Request<Topic>) -> Result<Response<Topic>, Status> {
        self.lock()
            .create_topic(request.into_inner())
            .map(Response::new)
    }

    async fn update_topic(
        &self,
        request: Request<UpdateTopicRequest>,
    ) -> Result<Response<Topic>, Status> {
        self.lock()
            .update_topic(request.into_inner())
            .map(Response::new)
    }

    async fn publish(
        &self,
        request: Request<PublishRequest>,
    ) -> Result<Response<PublishResponse>, Status> {
        let request = request.into_inner();
        let message_ids = self.lock().publish(&request.topic, request.messages)?;
        Ok(Response::new(PublishResponse { message_ids }))
    }

    async fn get_topic(&self, request: Request<GetTopicRequest>) -> Result<Response<Topic>, Status> {
        self.lock()
            .get_topic(&request.into_inner().topic)
            .map(Response::new)
    }

    async fn delete_topic(
        &self,
        request: Request<DeleteTopicRequest>,
    ) -> Result<Response<()>, Status> {
        self.lock()
            .delete_topic(&request.into_inner().topic)
            .map(Response::new)
    }
}

#[tonic::async_trait]
impl Subscriber for Service {
    type StreamingPullStream = ReceiverStream<PullResult>;

    async fn create_subscription(
        &self,
        request: Request<Subscription>,
    ) -> Result<Response<Subscription>, Status> {
        self.lock()
            .create_subscription(request.into_inner())
            .map(Response::new)
    }

    async fn get_subscription(
        &self,
        request: Request<GetSubscriptionRequest>,
    ) -> Result<Response<Subscription>, Status> {
        self.lock()
            .get_subscription(&request.into_inner().subscription)
            .map(Response::new)
    }

    async fn delete_subscription(
        &self,
        request: Request<DeleteSubscriptionRequest>,
    ) -> Result<Response<()>, Status> {
        self.lock()
            .delete_subscription(&request.into_inner().subscription)
            .map(Response::new)
    }

    async fn modify_ack_deadline(
        &self,
        request: Request<ModifyAckDeadlineRequest>,
    ) -> Result<Response<()>, Status> {
        self.lock()
            .modify_ack_deadline(request.into_inner())
            .map(Response::new)
    }

    async fn acknowledge(
        &self,
        request: Request<AcknowledgeRequest>,
    ) -> Result<Response<()>, Status> {
        self.lock()
            .acknowledge(request.into_inner())
            .map(Response::new)
    }

    async fn streaming_pull(
        &self,
        request: Request<Streaming<StreamingPullRequest>>,
    ) -> Result<Response<Self::StreamingPullStream>, Status> {
        let mut requests = request.into_inner();
        let first = requests
            .message()
            .await?
            .ok_or_else(|| Status::invalid_argument("missing initial request"))?;
        let subscription = first.subscription.clone();
        let lease = self.lock().open_stream(first)?;

        let (tx, rx) = tokio::sync::mpsc::channel(16);
        tokio::spawn(pull_loop(
            self.state.clone(),
            subscription,
            lease,
            requests,
            tx,
        ));
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Serves one `StreamingPull` call until the client goes away.
async fn pull_loop(
    state: Arc<Mutex<State>>,
    subscription: String,
    lease: Duration,
    mut requests: Streaming<StreamingPullRequest>,
    tx: Sender<PullResult>,
) {
    let mut poll = tokio::time::interval(POLL_PERIOD);
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            request = requests.message() => {
                let request = match request {
                    Ok(Some(r)) => r,
                    // The client closed its side of the stream.
                    Ok(None) | Err(_) => break,
                };
                let result = lock(&state).stream_request(&subscription, request);
                if let Err(status) = result {
                    let _ = tx.send(Err(status)).await;
                    break;
                }
            },
            _ = poll.tick() => {
                let result = lock(&state).pull(&subscription, lease);
                let response = match result {
                    Ok(None) => continue,
                    Ok(Some(r)) => Ok(r),
                    Err(status) => Err(status),
                };
                let done = response.is_err();
                if tx.send(response).await.is_err() || done {
                    break;
                }
            },
        }
    }
}
