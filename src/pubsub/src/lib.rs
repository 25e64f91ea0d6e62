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

//! Pub/Sub bug-bash exercises.
//!
//! This crate contains three small programs that exercise a
//! [Pub/Sub] deployment, or an emulator running locally:
//!
//! * [producer]: publish a single message, creating the topic on demand.
//! * [consumer]: pull messages for a bounded time and acknowledge each one,
//!   creating the subscription on demand.
//! * [admin]: provision a topic and a subscription with non-default
//!   configuration, modify the topic, then delete both resources.
//!
//! All the programs share a [Client][client::Client], configured from a
//! [Config][config::Config].
//!
//! # Example
//! ```no_run
//! # async fn sample() -> anyhow::Result<()> {
//! use pubsub_bugbash::client::Client;
//! use pubsub_bugbash::config::Config;
//! let config = Config::from_env();
//! let client = Client::builder(&config).build().await?;
//! let receipt = pubsub_bugbash::producer::produce_message(&client, &config).await?;
//! println!("published {}", receipt.message_id);
//! # Ok(()) }
//! ```
//!
//! [pub/sub]: https://cloud.google.com/pubsub

pub mod admin;
pub mod client;
pub mod client_builder;
pub mod config;
pub mod consumer;
pub mod error;
pub mod optimistic;
pub mod producer;
pub mod stub;
pub mod subscriber;
mod transport;

pub use error::Error;

/// The result type returned by all the operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The messages exchanged with the service.
pub mod model {
    pub use pubsub_bugbash_proto::google::pubsub::v1::*;
}

