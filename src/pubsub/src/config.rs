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

//! Configuration shared by the exercises.
//!
//! The exercises need a project, a topic, a subscription and an endpoint.
//! [Config] holds these values, plus the bounds used while receiving
//! messages. Applications start from [Config::from_env] or
//! [Config::default] and override values with the `with_*` methods.

use std::time::Duration;

const PROJECT_VAR: &str = "GOOGLE_CLOUD_PROJECT";
const EMULATOR_VAR: &str = "PUBSUB_EMULATOR_HOST";

/// The project used when `GOOGLE_CLOUD_PROJECT` is not set.
pub const DEFAULT_PROJECT_ID: &str = "fake-gcp-project";
/// The topic used by all the exercises, unless overridden.
pub const DEFAULT_TOPIC_ID: &str = "bugbash-topic";
/// The subscription used by all the exercises, unless overridden.
pub const DEFAULT_SUBSCRIPTION_ID: &str = "bugbash-sub";
/// The production endpoint for the service.
pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";
/// How long the consumer waits for messages on each pull.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

const MIB: i64 = 1024 * 1024;
const MIN_ACK_DEADLINE: Duration = Duration::from_secs(10);
const MAX_ACK_DEADLINE: Duration = Duration::from_secs(600);

/// Identifiers and connection settings for the exercises.
///
/// # Example
/// ```
/// # use pubsub_bugbash::config::Config;
/// # use std::time::Duration;
/// let config = Config::default()
///     .with_project_id("my-project")
///     .with_receive_timeout(Duration::from_secs(30));
/// assert_eq!(config.topic_name(), "projects/my-project/topics/bugbash-topic");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub(crate) project_id: String,
    pub(crate) topic_id: String,
    pub(crate) subscription_id: String,
    pub(crate) endpoint: String,
    pub(crate) receive_timeout: Duration,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) receive_settings: ReceiveSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            topic_id: DEFAULT_TOPIC_ID.to_string(),
            subscription_id: DEFAULT_SUBSCRIPTION_ID.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            connect_timeout: None,
            receive_settings: ReceiveSettings::default(),
        }
    }
}

impl Config {
    /// Creates a configuration using the process environment.
    ///
    /// `GOOGLE_CLOUD_PROJECT` overrides the project id. If
    /// `PUBSUB_EMULATOR_HOST` is set, its `host:port` value becomes a
    /// plaintext endpoint.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(project) = std::env::var(PROJECT_VAR).ok().filter(|v| !v.is_empty()) {
            config.project_id = project;
        }
        if let Some(host) = std::env::var(EMULATOR_VAR).ok().filter(|v| !v.is_empty()) {
            config.endpoint = emulator_endpoint(&host);
        }
        config
    }

    /// Sets the project id.
    pub fn with_project_id<T: Into<String>>(mut self, v: T) -> Self {
        self.project_id = v.into();
        self
    }

    /// Sets the topic id.
    pub fn with_topic_id<T: Into<String>>(mut self, v: T) -> Self {
        self.topic_id = v.into();
        self
    }

    /// Sets the subscription id.
    pub fn with_subscription_id<T: Into<String>>(mut self, v: T) -> Self {
        self.subscription_id = v.into();
        self
    }

    /// Sets the endpoint, for example `http://localhost:8085`.
    pub fn with_endpoint<T: Into<String>>(mut self, v: T) -> Self {
        self.endpoint = v.into();
        self
    }

    /// Sets how long each pull waits for messages.
    pub fn with_receive_timeout(mut self, v: Duration) -> Self {
        self.receive_timeout = v;
        self
    }

    /// Sets a timeout to establish the connection.
    pub fn with_connect_timeout(mut self, v: Duration) -> Self {
        self.connect_timeout = Some(v);
        self
    }

    /// Sets the lease management and flow control parameters.
    pub fn with_receive_settings(mut self, v: ReceiveSettings) -> Self {
        self.receive_settings = v;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn receive_settings(&self) -> &ReceiveSettings {
        &self.receive_settings
    }

    /// The full resource name of the topic, `projects/{project}/topics/{topic}`.
    pub fn topic_name(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.topic_id)
    }

    /// The full resource name of the subscription,
    /// `projects/{project}/subscriptions/{subscription}`.
    pub fn subscription_name(&self) -> String {
        format!(
            "projects/{}/subscriptions/{}",
            self.project_id, self.subscription_id
        )
    }
}

fn emulator_endpoint(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }
    format!("http://{host}")
}

/// Lease management and flow control for receiving messages.
///
/// Messages received by a subscriber are leased: the service will not
/// redeliver them while the lease is valid. The subscriber extends the lease
/// of each message until the application acknowledges it, or until the
/// message has been held for [max_extension][ReceiveSettings::max_extension].
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiveSettings {
    pub(crate) max_extension: Duration,
    pub(crate) min_extension_period: Duration,
    pub(crate) max_extension_period: Duration,
    pub(crate) max_outstanding_messages: i64,
    pub(crate) max_outstanding_bytes: i64,
    pub(crate) ack_deadline_seconds: i32,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            max_extension: Duration::from_secs(30 * 60),
            min_extension_period: Duration::from_secs(60),
            max_extension_period: Duration::from_secs(5 * 60),
            max_outstanding_messages: 1000,
            max_outstanding_bytes: 100 * MIB,
            ack_deadline_seconds: 10,
        }
    }
}

impl ReceiveSettings {
    /// The maximum time a message stays under lease management.
    ///
    /// The default is 30 minutes.
    pub fn set_max_extension(mut self, v: Duration) -> Self {
        self.max_extension = v;
        self
    }

    /// The lower bound for each lease renewal.
    ///
    /// The default is 1 minute. If larger than the upper bound, the upper
    /// bound is raised to match.
    pub fn set_min_extension_period(mut self, v: Duration) -> Self {
        self.min_extension_period = v;
        self.max_extension_period = self.max_extension_period.max(v);
        self
    }

    /// The upper bound for each lease renewal.
    ///
    /// The default is 5 minutes. If smaller than the lower bound, the lower
    /// bound is reduced to match.
    pub fn set_max_extension_period(mut self, v: Duration) -> Self {
        self.max_extension_period = v;
        self.min_extension_period = self.min_extension_period.min(v);
        self
    }

    /// Flow control: the maximum number of messages not yet acknowledged.
    ///
    /// Use a value `<= 0` for no limit. The default is 1000 messages.
    pub fn set_max_outstanding_messages<T: Into<i64>>(mut self, v: T) -> Self {
        self.max_outstanding_messages = v.into();
        self
    }

    /// Flow control: the maximum number of bytes not yet acknowledged.
    ///
    /// Use a value `<= 0` for no limit. The default is 100 MiB.
    pub fn set_max_outstanding_bytes<T: Into<i64>>(mut self, v: T) -> Self {
        self.max_outstanding_bytes = v.into();
        self
    }

    /// The ack deadline requested when the stream is opened.
    ///
    /// The service accepts values between 10 and 600 seconds. The default is
    /// 10 seconds.
    pub fn set_ack_deadline_seconds<T: Into<i32>>(mut self, v: T) -> Self {
        self.ack_deadline_seconds = v.into();
        self
    }

    pub fn max_extension(&self) -> Duration {
        self.max_extension
    }

    pub fn min_extension_period(&self) -> Duration {
        self.min_extension_period
    }

    pub fn max_extension_period(&self) -> Duration {
        self.max_extension_period
    }

    pub fn max_outstanding_messages(&self) -> i64 {
        self.max_outstanding_messages
    }

    pub fn max_outstanding_bytes(&self) -> i64 {
        self.max_outstanding_bytes
    }

    pub fn ack_deadline_seconds(&self) -> i32 {
        self.ack_deadline_seconds
    }

    /// The deadline requested on each lease renewal.
    ///
    /// Starts from the stream ack deadline, bounded by the extension periods,
    /// and clamped into the range accepted by the service.
    pub fn lease_deadline(&self) -> Duration {
        let ack_deadline = Duration::from_secs(self.ack_deadline_seconds.max(0) as u64);
        ack_deadline
            .clamp(self.min_extension_period, self.max_extension_period)
            .clamp(MIN_ACK_DEADLINE, MAX_ACK_DEADLINE)
    }
}
