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

//! Runs the Pub/Sub bug-bash exercises.

const DESCRIPTION: &str = concat!(
    "Runs one of the Pub/Sub bug-bash exercises against the service, or against",
    " an emulator when PUBSUB_EMULATOR_HOST is set. The producer publishes a",
    " single message, the consumer pulls messages for a bounded time, and the",
    " administrator provisions and then deletes a topic and a subscription.",
    " Set RUST_LOG to change the log level."
);

mod args;

use args::{Args, Command};
use clap::Parser;
use pubsub_bugbash::client::Client;
use pubsub_bugbash::config::Config;
use pubsub_bugbash::{admin, consumer, producer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    enable_tracing()?;

    let args = Args::parse();
    let config = args.apply(Config::from_env());
    tracing::info!("Configuration: {config:?}");

    let client = Client::builder(&config).build().await?;
    match args.command {
        Command::Produce => {
            let receipt = producer::produce_message(&client, &config).await?;
            tracing::info!(
                "published message {} (created topic: {})",
                receipt.message_id,
                receipt.created_topic
            );
        }
        Command::Consume => {
            let summary = consumer::consume_messages(&client, &config).await?;
            tracing::info!(
                "received {} messages (created subscription: {})",
                summary.received,
                summary.created_subscription
            );
        }
        Command::Admin => {
            admin::setup_admin(&client, &config).await?;
            tracing::info!("DONE");
        }
    }
    Ok(())
}

/// Logs to stderr, filtered by `RUST_LOG`.
fn enable_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
