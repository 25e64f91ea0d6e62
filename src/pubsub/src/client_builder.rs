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

//! Configure and create a [Client].

use crate::client::Client;
use crate::config::Config;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// An error creating a [Client].
///
/// Creating a client validates the endpoint and opens a connection to it.
/// The exercises report these errors to their caller, they are never fatal.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// If true, the endpoint is not a valid URI.
    pub fn is_endpoint(&self) -> bool {
        matches!(&self.0, ErrorKind::Endpoint(_))
    }

    /// If true, the client could not connect to the endpoint.
    pub fn is_transport(&self) -> bool {
        matches!(&self.0, ErrorKind::Transport(_))
    }

    pub(crate) fn endpoint<T: Into<BoxError>>(source: T) -> Self {
        Self(ErrorKind::Endpoint(source.into()))
    }

    pub(crate) fn transport<T: Into<BoxError>>(source: T) -> Self {
        Self(ErrorKind::Transport(source.into()))
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("invalid endpoint")]
    Endpoint(#[source] BoxError),
    #[error("could not initialize transport client")]
    Transport(#[source] BoxError),
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A builder for [Client].
///
/// ```no_run
/// # async fn sample() -> anyhow::Result<()> {
/// # use pubsub_bugbash::client::Client;
/// # use pubsub_bugbash::config::Config;
/// let config = Config::default();
/// let client = Client::builder(&config)
///     .with_endpoint("http://localhost:8085")
///     .build()
///     .await?;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct ClientBuilder {
    endpoint: String,
    connect_timeout: Option<Duration>,
}

impl ClientBuilder {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint().to_string(),
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Creates a new client, connecting to the configured endpoint.
    ///
    /// The connection is established eagerly. An unreachable endpoint is
    /// reported here, and not on the first request.
    pub async fn build(self) -> Result<Client> {
        let transport = Transport::connect(&self.endpoint, self.connect_timeout).await?;
        let transport = Arc::new(transport);
        Ok(Client::from_stub(transport.clone(), transport))
    }

    /// Sets the endpoint.
    ///
    /// Use `http://host:port` to connect to an emulator. The default comes
    /// from the [Config].
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.endpoint = v.into();
        self
    }

    /// Sets a timeout to establish the connection.
    pub fn with_connect_timeout(mut self, v: Duration) -> Self {
        self.connect_timeout = Some(v);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn error_predicates() {
        let error = Error::endpoint("bad uri");
        assert!(error.is_endpoint(), "{error:?}");
        assert!(!error.is_transport(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");

        let error = Error::transport("connection refused");
        assert!(error.is_transport(), "{error:?}");
        assert!(!error.is_endpoint(), "{error:?}");
        assert!(error.to_string().contains("transport"), "{error}");
    }

    #[test]
    fn builder() {
        let config = Config::default().with_connect_timeout(Duration::from_secs(5));
        let builder = ClientBuilder::new(&config);
        assert_eq!(builder.endpoint, "https://pubsub.googleapis.com");
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(5)));

        let builder = builder
            .with_endpoint("http://localhost:8085")
            .with_connect_timeout(Duration::from_secs(1));
        assert_eq!(builder.endpoint, "http://localhost:8085");
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn invalid_endpoint() {
        let config = Config::default().with_endpoint("not a uri");
        let err = ClientBuilder::new(&config)
            .build()
            .await
            .expect_err("invalid endpoints are rejected");
        assert!(err.is_endpoint(), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_endpoint() -> anyhow::Result<()> {
        // Reserve a port, then release it, so nothing listens on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let config = Config::default()
            .with_endpoint(format!("http://{addr}"))
            .with_connect_timeout(Duration::from_secs(1));
        let err = ClientBuilder::new(&config)
            .build()
            .await
            .expect_err("nothing listens on the endpoint");
        assert!(err.is_transport(), "{err:?}");
        Ok(())
    }
}
