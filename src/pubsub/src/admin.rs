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

//! Provision, modify, and delete a topic and a subscription.
//!
//! The [Administrator] exercises the admin RPCs with non-default
//! configuration. None of the steps are idempotent: running [setup_admin]
//! twice without cleaning up fails with `ALREADY_EXISTS`.

use crate::Result;
use crate::client::Client;
use crate::config::Config;
use crate::model::ingestion_data_source_settings::{AwsKinesis, Source};
use crate::model::{
    BigQueryConfig, DeleteSubscriptionRequest, DeleteTopicRequest, IngestionDataSourceSettings,
    MessageStoragePolicy, Subscription, Topic, UpdateTopicRequest,
};
use prost_types::{Duration, FieldMask};

/// The only region where the topic stores messages.
pub const PERSISTENCE_REGION: &str = "us-central1";
/// How long the topic retains messages.
pub const RETENTION_SECONDS: i64 = 24 * 60 * 60;
/// The BigQuery table where the subscription exports messages.
pub const BIGQUERY_TABLE: &str = "fake-project.fake-dataset.fake-table-id";

const INGESTION_MASK: &str = "ingestion_data_source_settings";

/// Runs the admin RPCs against one topic and one subscription.
#[derive(Clone, Debug)]
pub struct Administrator {
    client: Client,
    topic: String,
    subscription: String,
}

impl Administrator {
    pub fn new(client: &Client, config: &Config) -> Self {
        Self {
            client: client.clone(),
            topic: config.topic_name(),
            subscription: config.subscription_name(),
        }
    }

    /// Creates the topic with a storage policy, a retention period, and an
    /// AWS Kinesis ingestion source.
    pub async fn create_topic(&self) -> Result<Topic> {
        let topic = Topic {
            name: self.topic.clone(),
            message_storage_policy: Some(MessageStoragePolicy {
                allowed_persistence_regions: vec![PERSISTENCE_REGION.to_string()],
                ..Default::default()
            }),
            message_retention_duration: Some(Duration {
                seconds: RETENTION_SECONDS,
                nanos: 0,
            }),
            ingestion_data_source_settings: Some(IngestionDataSourceSettings {
                source: Some(Source::AwsKinesis(AwsKinesis {
                    stream_arn: "fake-stream-arn".to_string(),
                    consumer_arn: "fake-consumer-arn".to_string(),
                    aws_role_arn: "fake-aws-role-arn".to_string(),
                    gcp_service_account: "fake-service-account".to_string(),
                    ..Default::default()
                })),
            }),
            ..Default::default()
        };
        let topic = self.client.create_topic(topic).await?;
        tracing::info!("created topic {}", topic.name);
        Ok(topic)
    }

    /// Creates an exactly-once subscription that exports to BigQuery.
    pub async fn create_subscription(&self) -> Result<Subscription> {
        let subscription = Subscription {
            name: self.subscription.clone(),
            topic: self.topic.clone(),
            enable_exactly_once_delivery: true,
            bigquery_config: Some(BigQueryConfig {
                table: BIGQUERY_TABLE.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let subscription = self.client.create_subscription(subscription).await?;
        tracing::info!("created subscription {}", subscription.name);
        Ok(subscription)
    }

    /// Removes the ingestion source, turning the topic into a plain topic.
    pub async fn clear_ingestion(&self) -> Result<Topic> {
        let request = UpdateTopicRequest {
            topic: Some(Topic {
                name: self.topic.clone(),
                ingestion_data_source_settings: Some(IngestionDataSourceSettings::default()),
                ..Default::default()
            }),
            update_mask: Some(FieldMask {
                paths: vec![INGESTION_MASK.to_string()],
            }),
        };
        let topic = self.client.update_topic(request).await?;
        tracing::info!("cleared the ingestion source in {}", topic.name);
        Ok(topic)
    }

    pub async fn delete_subscription(&self) -> Result<()> {
        self.client
            .delete_subscription(DeleteSubscriptionRequest {
                subscription: self.subscription.clone(),
            })
            .await?;
        tracing::info!("deleted subscription {}", self.subscription);
        Ok(())
    }

    pub async fn delete_topic(&self) -> Result<()> {
        self.client
            .delete_topic(DeleteTopicRequest {
                topic: self.topic.clone(),
            })
            .await?;
        tracing::info!("deleted topic {}", self.topic);
        Ok(())
    }

    /// Runs every step in order, stopping at the first error.
    ///
    /// Resources created before the failing step are not cleaned up.
    pub async fn provision(&self) -> Result<()> {
        self.create_topic().await?;
        self.create_subscription().await?;
        self.clear_ingestion().await?;
        self.delete_subscription().await?;
        self.delete_topic().await?;
        Ok(())
    }
}

/// Provisions and removes the configured topic and subscription.
///
/// # Example
/// ```no_run
/// # async fn sample() -> anyhow::Result<()> {
/// use pubsub_bugbash::{admin::setup_admin, client::Client, config::Config};
/// let config = Config::from_env();
/// let client = Client::builder(&config).build().await?;
/// setup_admin(&client, &config).await?;
/// # Ok(()) }
/// ```
pub async fn setup_admin(client: &Client, config: &Config) -> Result<()> {
    Administrator::new(client, config).provision().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::error::rpc::{Code, Status};
    use crate::stub::tests::{MockPublisher, MockSubscriber};
    use mockall::Sequence;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const TOPIC: &str = "projects/fake-gcp-project/topics/bugbash-topic";
    const SUBSCRIPTION: &str = "projects/fake-gcp-project/subscriptions/bugbash-sub";

    fn error(code: Code) -> Error {
        Error::service(Status::default().set_code(code))
    }

    fn test_admin(publisher: MockPublisher, subscriber: MockSubscriber) -> Administrator {
        let client = Client::from_stub(Arc::new(publisher), Arc::new(subscriber));
        Administrator::new(&client, &Config::default())
    }

    #[tokio::test]
    async fn create_topic() -> anyhow::Result<()> {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_create_topic()
            .times(1)
            .returning(|t| Ok(t));
        let admin = test_admin(publisher, MockSubscriber::new());

        let topic = admin.create_topic().await?;
        assert_eq!(topic.name, TOPIC);
        assert_eq!(
            topic.message_storage_policy,
            Some(MessageStoragePolicy {
                allowed_persistence_regions: vec!["us-central1".to_string()],
                enforce_in_transit: false,
            })
        );
        assert_eq!(
            topic.message_retention_duration,
            Some(Duration {
                seconds: 86400,
                nanos: 0
            })
        );
        let kinesis = match topic.ingestion_data_source_settings.and_then(|s| s.source) {
            Some(Source::AwsKinesis(k)) => k,
            None => panic!("missing ingestion source"),
        };
        assert_eq!(kinesis.stream_arn, "fake-stream-arn");
        assert_eq!(kinesis.consumer_arn, "fake-consumer-arn");
        assert_eq!(kinesis.aws_role_arn, "fake-aws-role-arn");
        assert_eq!(kinesis.gcp_service_account, "fake-service-account");
        Ok(())
    }

    #[tokio::test]
    async fn create_subscription() -> anyhow::Result<()> {
        let mut subscriber = MockSubscriber::new();
        subscriber
            .expect_create_subscription()
            .times(1)
            .returning(|s| Ok(s));
        let admin = test_admin(MockPublisher::new(), subscriber);

        let subscription = admin.create_subscription().await?;
        assert_eq!(subscription.name, SUBSCRIPTION);
        assert_eq!(subscription.topic, TOPIC);
        assert!(subscription.enable_exactly_once_delivery);
        assert_eq!(
            subscription.bigquery_config.map(|c| c.table),
            Some("fake-project.fake-dataset.fake-table-id".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn clear_ingestion() -> anyhow::Result<()> {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_update_topic()
            .times(1)
            .withf(|r| {
                r.update_mask.as_ref().map(|m| m.paths.clone())
                    == Some(vec!["ingestion_data_source_settings".to_string()])
            })
            .returning(|r| Ok(r.topic.unwrap_or_default()));
        let admin = test_admin(publisher, MockSubscriber::new());

        let topic = admin.clear_ingestion().await?;
        assert_eq!(topic.name, TOPIC);
        assert_eq!(
            topic.ingestion_data_source_settings,
            Some(IngestionDataSourceSettings::default())
        );
        Ok(())
    }

    #[tokio::test]
    async fn provision_runs_in_order() -> anyhow::Result<()> {
        let mut seq = Sequence::new();
        let mut publisher = MockPublisher::new();
        let mut subscriber = MockSubscriber::new();
        publisher
            .expect_create_topic()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|t| Ok(t));
        subscriber
            .expect_create_subscription()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|s| Ok(s));
        publisher
            .expect_update_topic()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|r| Ok(r.topic.unwrap_or_default()));
        subscriber
            .expect_delete_subscription()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.subscription == SUBSCRIPTION)
            .returning(|_| Ok(()));
        publisher
            .expect_delete_topic()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.topic == TOPIC)
            .returning(|_| Ok(()));

        let admin = test_admin(publisher, subscriber);
        admin.provision().await?;
        Ok(())
    }

    #[tokio::test]
    async fn already_exists_stops_at_first_step() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_create_topic()
            .times(1)
            .returning(|_| Err(error(Code::AlreadyExists)));
        publisher.expect_update_topic().never();
        publisher.expect_delete_topic().never();
        let mut subscriber = MockSubscriber::new();
        subscriber.expect_create_subscription().never();
        subscriber.expect_delete_subscription().never();

        let client = Client::from_stub(Arc::new(publisher), Arc::new(subscriber));
        let err = setup_admin(&client, &Config::default())
            .await
            .expect_err("the topic already exists");
        assert!(err.is_already_exists(), "{err:?}");
    }

    #[tokio::test]
    async fn failure_skips_remaining_steps() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_create_topic()
            .times(1)
            .returning(|t| Ok(t));
        publisher
            .expect_update_topic()
            .times(1)
            .returning(|_| Err(error(Code::InvalidArgument)));
        publisher.expect_delete_topic().never();
        let mut subscriber = MockSubscriber::new();
        subscriber
            .expect_create_subscription()
            .times(1)
            .returning(|s| Ok(s));
        subscriber.expect_delete_subscription().never();

        let err = test_admin(publisher, subscriber)
            .provision()
            .await
            .expect_err("the update fails");
        assert_eq!(err.status().map(|s| s.code), Some(Code::InvalidArgument));
    }
}
