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

use clap::{Parser, Subcommand};
use humantime::parse_duration;
use pubsub_bugbash::config::Config;
use std::time::Duration;

/// Command line arguments.
///
/// Unset flags keep the value from the environment, or the default.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = super::DESCRIPTION)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// The project containing the topic and subscription.
    #[arg(long, global = true)]
    pub project_id: Option<String>,

    /// The topic id, without the `projects/*/topics/` prefix.
    #[arg(long, global = true)]
    pub topic_id: Option<String>,

    /// The subscription id, without the `projects/*/subscriptions/` prefix.
    #[arg(long, global = true)]
    pub subscription_id: Option<String>,

    /// The service endpoint, for example `http://localhost:8085`.
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// How long each pull waits for messages.
    #[arg(long, global = true, value_parser = parse_duration)]
    pub receive_timeout: Option<Duration>,

    /// How long to wait for the connection to the service.
    #[arg(long, global = true, value_parser = parse_duration)]
    pub connect_timeout: Option<Duration>,
}

/// The exercises.
#[derive(Clone, Copy, Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Publish a single message, creating the topic if needed.
    Produce,
    /// Pull and acknowledge messages, creating the subscription if needed.
    Consume,
    /// Create, update, and delete a topic and a subscription.
    Admin,
}

impl Args {
    /// Applies the flags on top of `config`.
    pub fn apply(&self, config: Config) -> Config {
        let mut config = config;
        if let Some(v) = &self.project_id {
            config = config.with_project_id(v);
        }
        if let Some(v) = &self.topic_id {
            config = config.with_topic_id(v);
        }
        if let Some(v) = &self.subscription_id {
            config = config.with_subscription_id(v);
        }
        if let Some(v) = &self.endpoint {
            config = config.with_endpoint(v);
        }
        if let Some(v) = self.receive_timeout {
            config = config.with_receive_timeout(v);
        }
        if let Some(v) = self.connect_timeout {
            config = config.with_connect_timeout(v);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&["program", "produce"], Command::Produce)]
    #[test_case(&["program", "consume"], Command::Consume)]
    #[test_case(&["program", "admin"], Command::Admin)]
    #[test_case(&["program", "--project-id=p", "admin"], Command::Admin; "global before")]
    fn commands(input: &[&str], want: Command) -> anyhow::Result<()> {
        let args = Args::try_parse_from(input)?;
        assert_eq!(args.command, want);
        Ok(())
    }

    #[test_case(&["program"]; "missing command")]
    #[test_case(&["program", "publish"]; "unknown command")]
    #[test_case(&["program", "consume", "--receive-timeout=soon"]; "bad duration")]
    fn errors(input: &[&str]) {
        let got = Args::try_parse_from(input);
        assert!(got.is_err(), "{got:?}");
    }

    #[test]
    fn defaults_are_kept() -> anyhow::Result<()> {
        let args = Args::try_parse_from(["program", "produce"])?;
        let config = args.apply(Config::default());
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn flags_override() -> anyhow::Result<()> {
        let args = Args::try_parse_from([
            "program",
            "consume",
            "--project-id=my-project",
            "--topic-id=my-topic",
            "--subscription-id=my-sub",
            "--endpoint=http://localhost:8085",
            "--receive-timeout=30s",
            "--connect-timeout=500ms",
        ])?;
        let config = args.apply(Config::default());
        assert_eq!(config.project_id(), "my-project");
        assert_eq!(config.topic_name(), "projects/my-project/topics/my-topic");
        assert_eq!(
            config.subscription_name(),
            "projects/my-project/subscriptions/my-sub"
        );
        assert_eq!(config.endpoint(), "http://localhost:8085");
        assert_eq!(config.receive_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Some(Duration::from_millis(500)));
        Ok(())
    }
}
