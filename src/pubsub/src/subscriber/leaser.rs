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

use crate::client::Client;
use crate::model::{AcknowledgeRequest, ModifyAckDeadlineRequest};

/// The lease operations, as a trait to test the lease management.
#[async_trait::async_trait]
pub(crate) trait Leaser: Send + Sync {
    /// Acknowledge a batch of messages.
    async fn ack(&self, ack_ids: Vec<String>);
    /// Negatively acknowledge a batch of messages.
    async fn nack(&self, ack_ids: Vec<String>);
    /// Extend lease deadlines for a batch of messages.
    async fn extend(&self, ack_ids: Vec<String>);
}

/// Sends the lease operations to the service.
///
/// The operations are best effort. Failures are logged and otherwise
/// ignored, the service redelivers any message whose lease expires.
#[derive(Clone, Debug)]
pub(super) struct DefaultLeaser {
    client: Client,
    subscription: String,
    lease_deadline_seconds: i32,
}

impl DefaultLeaser {
    pub(super) fn new(client: Client, subscription: String, lease_deadline_seconds: i32) -> Self {
        Self {
            client,
            subscription,
            lease_deadline_seconds,
        }
    }

    async fn modify_ack_deadline(&self, ack_ids: Vec<String>, seconds: i32) {
        let count = ack_ids.len();
        let request = ModifyAckDeadlineRequest {
            subscription: self.subscription.clone(),
            ack_deadline_seconds: seconds,
            ack_ids,
        };
        if let Err(e) = self.client.modify_ack_deadline(request).await {
            tracing::warn!(
                subscription = %self.subscription,
                count,
                seconds,
                "cannot modify ack deadlines: {e}"
            );
        }
    }
}

#[async_trait::async_trait]
impl Leaser for DefaultLeaser {
    async fn ack(&self, ack_ids: Vec<String>) {
        let count = ack_ids.len();
        let request = AcknowledgeRequest {
            subscription: self.subscription.clone(),
            ack_ids,
        };
        match self.client.acknowledge(request).await {
            Ok(()) => tracing::debug!(subscription = %self.subscription, count, "acknowledged"),
            Err(e) => tracing::warn!(
                subscription = %self.subscription,
                count,
                "cannot acknowledge messages: {e}"
            ),
        }
    }

    async fn nack(&self, ack_ids: Vec<String>) {
        self.modify_ack_deadline(ack_ids, 0).await
    }

    async fn extend(&self, ack_ids: Vec<String>) {
        self.modify_ack_deadline(ack_ids, self.lease_deadline_seconds)
            .await
    }
}
