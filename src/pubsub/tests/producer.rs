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

#[cfg(test)]
mod tests {
    use pubsub_bugbash::client::Client;
    use pubsub_bugbash::config::Config;
    use pubsub_bugbash::model::Topic;
    use pubsub_bugbash::producer::{Producer, SINGLE_MESSAGE, produce_message};
    use pubsub_bugbash_test_utils::resource_names::random_topic_id;
    use pubsub_bugbash_test_utils::tracing::enable_tracing;
    use pubsub_fake::FakeServer;

    async fn setup() -> anyhow::Result<(FakeServer, Config, Client)> {
        let server = FakeServer::start().await?;
        let config = Config::default()
            .with_endpoint(server.endpoint())
            .with_topic_id(random_topic_id());
        let client = Client::builder(&config).build().await?;
        Ok((server, config, client))
    }

    #[tokio::test]
    async fn existing_topic() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        let (server, config, client) = setup().await?;
        client
            .create_topic(Topic {
                name: config.topic_name(),
                ..Default::default()
            })
            .await?;

        let receipt = produce_message(&client, &config).await?;
        assert!(!receipt.created_topic, "{receipt:?}");
        let published = server.published(&config.topic_name());
        assert_eq!(published.len(), 1, "{published:?}");
        assert_eq!(published[0].message_id, receipt.message_id);
        assert_eq!(published[0].data, SINGLE_MESSAGE.as_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn missing_topic_is_created() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        let (server, config, client) = setup().await?;
        assert!(server.topic(&config.topic_name()).is_none());

        let receipt = produce_message(&client, &config).await?;
        assert!(receipt.created_topic, "{receipt:?}");
        assert!(server.topic(&config.topic_name()).is_some());
        let published = server.published(&config.topic_name());
        assert_eq!(published.len(), 1, "{published:?}");
        assert_eq!(published[0].message_id, receipt.message_id);
        Ok(())
    }

    #[tokio::test]
    async fn topic_is_created_once() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        let (server, config, client) = setup().await?;
        let producer = Producer::new(&client, &config);

        let first = producer.publish("m1").await?;
        let second = producer.publish("m2").await?;
        assert!(first.created_topic, "{first:?}");
        assert!(!second.created_topic, "{second:?}");
        let data: Vec<_> = server
            .published(producer.topic())
            .into_iter()
            .map(|m| m.data)
            .collect();
        assert_eq!(data, vec![b"m1".to_vec(), b"m2".to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_topic_is_not_created() -> anyhow::Result<()> {
        let _guard = enable_tracing();
        let (server, config, client) = setup().await?;
        let config = config.with_topic_id("1-invalid");

        let err = produce_message(&client, &config)
            .await
            .expect_err("the topic id is invalid");
        assert!(err.status().is_some(), "{err:?}");
        assert!(server.topic(&config.topic_name()).is_none());
        Ok(())
    }
}
