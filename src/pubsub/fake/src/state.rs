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

//! The in-memory state of the fake service.
//!
//! All the operations are synchronous, the gRPC handlers lock the state, call
//! one of these functions, and release the lock before any `.await`.

use pubsub_bugbash_proto::google::pubsub::v1::{
    AcknowledgeRequest, ModifyAckDeadlineRequest, PubsubMessage, ReceivedMessage,
    StreamingPullRequest, StreamingPullResponse, Subscription, Topic, UpdateTopicRequest,
    streaming_pull_response::SubscriptionProperties,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant, SystemTime};
use tonic::Status;

/// The topic name given to subscriptions when their topic is deleted.
pub const DELETED_TOPIC: &str = "_deleted-topic_";

const DEFAULT_ACK_DEADLINE_SECONDS: i32 = 10;
const MAX_ACK_DEADLINE_SECONDS: i32 = 600;
const TOPIC_STATE_ACTIVE: i32 = 1;
const SUBSCRIPTION_STATE_ACTIVE: i32 = 1;

#[derive(Debug, Default)]
pub(crate) struct State {
    topics: BTreeMap<String, Topic>,
    subscriptions: BTreeMap<String, SubscriptionState>,
    published: HashMap<String, Vec<PubsubMessage>>,
    next_message_id: u64,
    next_ack_id: u64,
}

#[derive(Debug)]
struct SubscriptionState {
    config: Subscription,
    pending: VecDeque<Pending>,
    leases: HashMap<String, Lease>,
    acknowledged: Vec<String>,
}

#[derive(Debug)]
struct Pending {
    message: PubsubMessage,
    attempts: i32,
}

#[derive(Debug)]
struct Lease {
    message: PubsubMessage,
    attempts: i32,
    deadline: Instant,
}

impl State {
    pub fn create_topic(&mut self, mut topic: Topic) -> Result<Topic, Status> {
        validate_name(&topic.name, "topics")?;
        if self.topics.contains_key(&topic.name) {
            return Err(Status::already_exists(format!(
                "Topic already exists: {}",
                topic.name
            )));
        }
        topic.state = TOPIC_STATE_ACTIVE;
        self.topics.insert(topic.name.clone(), topic.clone());
        Ok(topic)
    }

    pub fn get_topic(&self, name: &str) -> Result<Topic, Status> {
        validate_name(name, "topics")?;
        self.topics.get(name).cloned().ok_or_else(|| topic_not_found(name))
    }

    pub fn update_topic(&mut self, request: UpdateTopicRequest) -> Result<Topic, Status> {
        let update = request
            .topic
            .ok_or_else(|| Status::invalid_argument("missing topic"))?;
        let paths = request.update_mask.map(|m| m.paths).unwrap_or_default();
        if paths.is_empty() {
            return Err(Status::invalid_argument("empty update_mask"));
        }
        validate_name(&update.name, "topics")?;
        let topic = self
            .topics
            .get_mut(&update.name)
            .ok_or_else(|| topic_not_found(&update.name))?;
        let mut updated = topic.clone();
        for path in paths {
            match path.as_str() {
                "labels" => updated.labels = update.labels.clone(),
                "message_storage_policy" => {
                    updated.message_storage_policy = update.message_storage_policy.clone()
                }
                "kms_key_name" => updated.kms_key_name = update.kms_key_name.clone(),
                "message_retention_duration" => {
                    updated.message_retention_duration = update.message_retention_duration.clone()
                }
                "ingestion_data_source_settings" => {
                    updated.ingestion_data_source_settings = update
                        .ingestion_data_source_settings
                        .clone()
                        .filter(|s| s.source.is_some())
                }
                _ => {
                    return Err(Status::invalid_argument(format!(
                        "unknown field name {path:?} in update_mask"
                    )));
                }
            }
        }
        *topic = updated.clone();
        Ok(updated)
    }

    pub fn delete_topic(&mut self, name: &str) -> Result<(), Status> {
        validate_name(name, "topics")?;
        self.topics
            .remove(name)
            .ok_or_else(|| topic_not_found(name))?;
        self.subscriptions
            .values_mut()
            .filter(|s| s.config.topic == name)
            .for_each(|s| s.config.topic = DELETED_TOPIC.to_string());
        Ok(())
    }

    /// Publishes to an existing topic, returning the new message ids.
    pub fn publish(
        &mut self,
        topic: &str,
        messages: Vec<PubsubMessage>,
    ) -> Result<Vec<String>, Status> {
        validate_name(topic, "topics")?;
        if !self.topics.contains_key(topic) {
            return Err(topic_not_found(topic));
        }
        if messages.is_empty() {
            return Err(Status::invalid_argument("The request contains no messages"));
        }
        let mut ids = Vec::with_capacity(messages.len());
        for mut message in messages {
            self.next_message_id += 1;
            message.message_id = self.next_message_id.to_string();
            message.publish_time = Some(SystemTime::now().into());
            ids.push(message.message_id.clone());
            self.subscriptions
                .values_mut()
                .filter(|s| s.config.topic == topic)
                .for_each(|s| {
                    s.pending.push_back(Pending {
                        message: message.clone(),
                        attempts: 0,
                    })
                });
            self.published
                .entry(topic.to_string())
                .or_default()
                .push(message);
        }
        Ok(ids)
    }

    /// Publishes a single message, creating the topic if needed.
    pub fn inject(
        &mut self,
        topic: &str,
        message: PubsubMessage,
    ) -> Result<String, Status> {
        if !self.topics.contains_key(topic) {
            self.create_topic(Topic {
                name: topic.to_string(),
                ..Default::default()
            })?;
        }
        let ids = self.publish(topic, vec![message])?;
        ids.into_iter()
            .next()
            .ok_or_else(|| Status::internal("publish returned no message ids"))
    }

    pub fn create_subscription(
        &mut self,
        mut subscription: Subscription,
    ) -> Result<Subscription, Status> {
        validate_name(&subscription.name, "subscriptions")?;
        validate_name(&subscription.topic, "topics")?;
        if self.subscriptions.contains_key(&subscription.name) {
            return Err(Status::already_exists(format!(
                "Subscription already exists: {}",
                subscription.name
            )));
        }
        if !self.topics.contains_key(&subscription.topic) {
            return Err(topic_not_found(&subscription.topic));
        }
        subscription.ack_deadline_seconds = match subscription.ack_deadline_seconds {
            0 => DEFAULT_ACK_DEADLINE_SECONDS,
            s @ DEFAULT_ACK_DEADLINE_SECONDS..=MAX_ACK_DEADLINE_SECONDS => s,
            s => {
                return Err(Status::invalid_argument(format!(
                    "invalid ack_deadline_seconds {s}"
                )));
            }
        };
        subscription.state = SUBSCRIPTION_STATE_ACTIVE;
        self.subscriptions.insert(
            subscription.name.clone(),
            SubscriptionState {
                config: subscription.clone(),
                pending: VecDeque::new(),
                leases: HashMap::new(),
                acknowledged: Vec::new(),
            },
        );
        Ok(subscription)
    }

    pub fn get_subscription(&self, name: &str) -> Result<Subscription, Status> {
        self.subscription_state(name).map(|s| s.config.clone())
    }

    pub fn delete_subscription(&mut self, name: &str) -> Result<(), Status> {
        validate_name(name, "subscriptions")?;
        self.subscriptions
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| subscription_not_found(name))
    }

    pub fn acknowledge(&mut self, request: AcknowledgeRequest) -> Result<(), Status> {
        if request.ack_ids.is_empty() {
            return Err(Status::invalid_argument("no ack ids"));
        }
        let state = self.subscription_state_mut(&request.subscription)?;
        state.acknowledge(request.ack_ids);
        Ok(())
    }

    pub fn modify_ack_deadline(&mut self, request: ModifyAckDeadlineRequest) -> Result<(), Status> {
        let seconds = validate_deadline(request.ack_deadline_seconds)?;
        let state = self.subscription_state_mut(&request.subscription)?;
        state.modify(request.ack_ids, seconds, Instant::now());
        Ok(())
    }

    /// Validates the first request in a `StreamingPull` call.
    ///
    /// Returns the lease duration for messages delivered on the stream.
    pub fn open_stream(&mut self, request: StreamingPullRequest) -> Result<Duration, Status> {
        let seconds = match request.stream_ack_deadline_seconds {
            s @ DEFAULT_ACK_DEADLINE_SECONDS..=MAX_ACK_DEADLINE_SECONDS => s,
            s => {
                return Err(Status::invalid_argument(format!(
                    "invalid stream_ack_deadline_seconds {s}"
                )));
            }
        };
        let subscription = request.subscription.clone();
        self.subscription_state_mut(&subscription)?;
        self.stream_request(&subscription, request)?;
        Ok(Duration::from_secs(seconds as u64))
    }

    /// Applies the acks and deadline changes sent on an open stream.
    pub fn stream_request(
        &mut self,
        subscription: &str,
        request: StreamingPullRequest,
    ) -> Result<(), Status> {
        if request.modify_deadline_ack_ids.len() != request.modify_deadline_seconds.len() {
            return Err(Status::invalid_argument(
                "modify_deadline_ack_ids and modify_deadline_seconds have different lengths",
            ));
        }
        for seconds in &request.modify_deadline_seconds {
            validate_deadline(*seconds)?;
        }
        let now = Instant::now();
        let state = self.subscription_state_mut(subscription)?;
        state.acknowledge(request.ack_ids);
        for (ack_id, seconds) in request
            .modify_deadline_ack_ids
            .into_iter()
            .zip(request.modify_deadline_seconds)
        {
            state.modify(vec![ack_id], seconds as u64, now);
        }
        Ok(())
    }

    /// Leases any available messages to a stream.
    ///
    /// Returns `None` when there is nothing to deliver.
    pub fn pull(
        &mut self,
        subscription: &str,
        lease: Duration,
    ) -> Result<Option<StreamingPullResponse>, Status> {
        let now = Instant::now();
        let mut next_ack_id = self.next_ack_id;
        let state = self.subscription_state_mut(subscription)?;
        state.expire(now);
        if state.pending.is_empty() {
            return Ok(None);
        }
        let mut received_messages = Vec::with_capacity(state.pending.len());
        while let Some(Pending { message, attempts }) = state.pending.pop_front() {
            next_ack_id += 1;
            let ack_id = format!("{subscription}/ack/{next_ack_id}");
            let attempts = attempts + 1;
            received_messages.push(ReceivedMessage {
                ack_id: ack_id.clone(),
                message: Some(message.clone()),
                delivery_attempt: attempts,
            });
            state.leases.insert(
                ack_id,
                Lease {
                    message,
                    attempts,
                    deadline: now + lease,
                },
            );
        }
        let properties = SubscriptionProperties {
            exactly_once_delivery_enabled: state.config.enable_exactly_once_delivery,
            message_ordering_enabled: state.config.enable_message_ordering,
        };
        self.next_ack_id = next_ack_id;
        Ok(Some(StreamingPullResponse {
            received_messages,
            subscription_properties: Some(properties),
        }))
    }

    pub fn topic(&self, name: &str) -> Option<Topic> {
        self.topics.get(name).cloned()
    }

    pub fn subscription(&self, name: &str) -> Option<Subscription> {
        self.subscriptions.get(name).map(|s| s.config.clone())
    }

    pub fn published(&self, topic: &str) -> Vec<PubsubMessage> {
        self.published.get(topic).cloned().unwrap_or_default()
    }

    pub fn acknowledged(&self, subscription: &str) -> Vec<String> {
        self.subscriptions
            .get(subscription)
            .map(|s| s.acknowledged.clone())
            .unwrap_or_default()
    }

    fn subscription_state(&self, name: &str) -> Result<&SubscriptionState, Status> {
        validate_name(name, "subscriptions")?;
        self.subscriptions
            .get(name)
            .ok_or_else(|| subscription_not_found(name))
    }

    fn subscription_state_mut(&mut self, name: &str) -> Result<&mut SubscriptionState, Status> {
        validate_name(name, "subscriptions")?;
        self.subscriptions
            .get_mut(name)
            .ok_or_else(|| subscription_not_found(name))
    }
}

impl SubscriptionState {
    fn acknowledge(&mut self, ack_ids: Vec<String>) {
        for ack_id in ack_ids {
            // Unknown or expired ack ids are ignored.
            if let Some(lease) = self.leases.remove(&ack_id) {
                self.acknowledged.push(lease.message.message_id);
            }
        }
    }

    fn modify(&mut self, ack_ids: Vec<String>, seconds: u64, now: Instant) {
        for ack_id in ack_ids {
            if seconds == 0 {
                if let Some(Lease {
                    message, attempts, ..
                }) = self.leases.remove(&ack_id)
                {
                    self.pending.push_back(Pending { message, attempts });
                }
                continue;
            }
            if let Some(lease) = self.leases.get_mut(&ack_id) {
                lease.deadline = now + Duration::from_secs(seconds);
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .leases
            .iter()
            .filter(|(_, lease)| lease.deadline <= now)
            .map(|(ack_id, _)| ack_id.clone())
            .collect();
        for ack_id in expired {
            if let Some(Lease {
                message, attempts, ..
            }) = self.leases.remove(&ack_id)
            {
                self.pending.push_back(Pending { message, attempts });
            }
        }
    }
}

fn validate_deadline(seconds: i32) -> Result<u64, Status> {
    if !(0..=MAX_ACK_DEADLINE_SECONDS).contains(&seconds) {
        return Err(Status::invalid_argument(format!(
            "invalid ack deadline {seconds}"
        )));
    }
    Ok(seconds as u64)
}

/// Validates names such as `projects/{project}/topics/{topic}`.
fn validate_name(name: &str, collection: &str) -> Result<(), Status> {
    let invalid = || Status::invalid_argument(format!("invalid resource name {name:?}"));
    let id = match name.split('/').collect::<Vec<_>>()[..] {
        ["projects", project, c, id] if !project.is_empty() && c == collection => id,
        _ => return Err(invalid()),
    };
    if !(3..=255).contains(&id.len()) || id.starts_with("goog") {
        return Err(invalid());
    }
    let mut chars = id.chars();
    let first = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest = chars.all(|c| c.is_ascii_alphanumeric() || "-_.~+%".contains(c));
    if !(first && rest) {
        return Err(invalid());
    }
    Ok(())
}

fn topic_not_found(name: &str) -> Status {
    Status::not_found(format!("Topic not found: {name}"))
}

fn subscription_not_found(name: &str) -> Status {
    Status::not_found(format!("Subscription does not exist: {name}"))
}
