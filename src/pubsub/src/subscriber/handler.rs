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

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, PartialEq)]
pub(super) enum AckResult {
    Ack(String),
    Nack(String),
}

/// Acknowledges or rejects a single message.
///
/// Each message returned by a [Session][super::session::Session] comes with
/// a `Handler`. Consuming the handler informs the lease management task,
/// which batches the acknowledgements and sends them to the service.
///
/// Dropping a handler without calling either method leaves the message under
/// lease management until the session closes, when it is rejected.
#[derive(Debug)]
pub struct Handler {
    pub(super) ack_id: String,
    pub(super) ack_tx: UnboundedSender<AckResult>,
}

impl Handler {
    /// Acknowledge the message associated with this handler.
    ///
    /// Note that the acknowledgement is best effort. The message may still be
    /// redelivered to this client, or another client.
    pub fn ack(self) {
        let _ = self.ack_tx.send(AckResult::Ack(self.ack_id));
    }

    /// Rejects the message associated with this handler.
    ///
    /// The message is removed from lease management and the service will
    /// redeliver it, possibly to another client.
    pub fn nack(self) {
        let _ = self.ack_tx.send(AckResult::Nack(self.ack_id));
    }

    /// The id used by the service to track this delivery.
    pub fn ack_id(&self) -> &str {
        &self.ack_id
    }
}
