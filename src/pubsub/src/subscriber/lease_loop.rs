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

use super::handler::AckResult;
use super::lease_state::{LeaseEvent, LeaseOptions, LeaseState};
use super::leaser::Leaser;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

/// The lease management task, and the channels feeding it.
pub(super) struct LeaseLoop {
    /// Completes after the final flush.
    pub(super) handle: JoinHandle<()>,
    /// New ack ids, from the stream. Dropping it starts the shutdown.
    pub(super) message_tx: UnboundedSender<String>,
    /// Acks and nacks, from the application handlers.
    pub(super) ack_tx: UnboundedSender<AckResult>,
}

impl LeaseLoop {
    pub(super) fn new<L>(leaser: L, options: LeaseOptions) -> Self
    where
        L: Leaser + 'static,
    {
        let (message_tx, message_rx) = unbounded_channel();
        let (ack_tx, ack_rx) = unbounded_channel();
        let state = LeaseState::new(leaser, options);
        let handle = tokio::spawn(run(state, message_rx, ack_rx));
        LeaseLoop {
            handle,
            message_tx,
            ack_tx,
        }
    }
}

async fn run<L>(
    mut state: LeaseState<L>,
    mut message_rx: UnboundedReceiver<String>,
    mut ack_rx: UnboundedReceiver<AckResult>,
) where
    L: Leaser,
{
    loop {
        // New messages must be under lease before their acks are processed,
        // hence `biased`.
        tokio::select! {
            biased;
            event = state.next_event() => {
                match event {
                    LeaseEvent::Flush => state.flush().await,
                    LeaseEvent::Extend => state.extend().await,
                }
            },
            message = message_rx.recv() => {
                match message {
                    None => break shutdown(state, ack_rx).await,
                    Some(ack_id) => state.add(ack_id),
                }
            },
            ack = ack_rx.recv() => {
                match ack {
                    // Unreachable while `LeaseLoop::ack_tx` is alive.
                    None => break,
                    Some(AckResult::Ack(ack_id)) => state.ack(ack_id),
                    Some(AckResult::Nack(ack_id)) => state.nack(ack_id),
                }
            },
        }
    }
}

/// Processes the acks already sent by the application, then flushes.
///
/// Nacks are not processed, all messages still under lease are nacked.
async fn shutdown<L>(mut state: LeaseState<L>, mut ack_rx: UnboundedReceiver<AckResult>)
where
    L: Leaser,
{
    while let Ok(r) = ack_rx.try_recv() {
        if let AckResult::Ack(ack_id) = r {
            state.ack(ack_id);
        }
    }
    tracing::debug!("lease management shutting down");
    state.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::super::lease_state::tests::{sorted, test_id, test_ids};
    use super::super::leaser::tests::MockLeaser;
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tokio::time::{Duration, Instant};

    // Run the lease loop until it blocks on its timers or channels.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flush_acks_nacks_on_interval() -> anyhow::Result<()> {
        const FLUSH_PERIOD: Duration = Duration::from_secs(1);
        const FLUSH_START: Duration = Duration::from_millis(200);

        let mock = Arc::new(Mutex::new(MockLeaser::new()));
        let options = LeaseOptions {
            flush_period: FLUSH_PERIOD,
            flush_start: FLUSH_START,
            // Keep extensions out of this test.
            extend_start: Duration::from_secs(900),
            ..Default::default()
        };
        let lease_loop = LeaseLoop::new(mock.clone(), options);
        settle().await;

        for i in 0..30 {
            lease_loop.message_tx.send(test_id(i))?;
        }
        for i in 0..10 {
            lease_loop.ack_tx.send(AckResult::Ack(test_id(i)))?;
        }

        // First flush: only acks.
        mock.lock()
            .await
            .expect_ack()
            .times(1)
            .withf(|v| sorted(v) == test_ids(0..10))
            .returning(|_| ());
        tokio::time::advance(FLUSH_START).await;
        settle().await;
        mock.lock().await.checkpoint();

        // Second flush: only nacks.
        for i in 10..20 {
            lease_loop.ack_tx.send(AckResult::Nack(test_id(i)))?;
        }
        mock.lock()
            .await
            .expect_nack()
            .times(1)
            .withf(|v| sorted(v) == test_ids(10..20))
            .returning(|_| ());
        tokio::time::advance(FLUSH_PERIOD).await;
        settle().await;
        mock.lock().await.checkpoint();

        // Third flush: both.
        for i in 20..25 {
            lease_loop.ack_tx.send(AckResult::Ack(test_id(i)))?;
        }
        for i in 25..30 {
            lease_loop.ack_tx.send(AckResult::Nack(test_id(i)))?;
        }
        {
            let mut guard = mock.lock().await;
            guard
                .expect_ack()
                .times(1)
                .withf(|v| sorted(v) == test_ids(20..25))
                .returning(|_| ());
            guard
                .expect_nack()
                .times(1)
                .withf(|v| sorted(v) == test_ids(25..30))
                .returning(|_| ());
        }
        tokio::time::advance(FLUSH_PERIOD).await;
        settle().await;
        mock.lock().await.checkpoint();

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn extend_on_interval() -> anyhow::Result<()> {
        const EXTEND_PERIOD: Duration = Duration::from_secs(1);
        const EXTEND_START: Duration = Duration::from_millis(200);

        let mock = Arc::new(Mutex::new(MockLeaser::new()));
        let options = LeaseOptions {
            flush_start: Duration::from_secs(900),
            extend_period: EXTEND_PERIOD,
            extend_start: EXTEND_START,
            ..Default::default()
        };
        let lease_loop = LeaseLoop::new(mock.clone(), options);
        settle().await;

        for i in 0..30 {
            lease_loop.message_tx.send(test_id(i))?;
        }

        mock.lock()
            .await
            .expect_extend()
            .times(1)
            .withf(|v| sorted(v) == test_ids(0..30))
            .returning(|_| ());
        tokio::time::advance(EXTEND_START).await;
        settle().await;
        mock.lock().await.checkpoint();

        // Acked messages are no longer extended.
        for i in 0..10 {
            lease_loop.ack_tx.send(AckResult::Ack(test_id(i)))?;
        }
        mock.lock()
            .await
            .expect_extend()
            .times(1)
            .withf(|v| sorted(v) == test_ids(10..30))
            .returning(|_| ());
        tokio::time::advance(EXTEND_PERIOD).await;
        settle().await;
        mock.lock().await.checkpoint();

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn drop_does_not_wait_for_pending_operations() -> anyhow::Result<()> {
        let start = Instant::now();
        let mut mock = MockLeaser::new();
        mock.expect_ack().returning(|_| ());
        mock.expect_nack().returning(|_| ());
        let lease_loop = LeaseLoop::new(Arc::new(Mutex::new(mock)), LeaseOptions::default());
        settle().await;

        for i in 0..30 {
            lease_loop.message_tx.send(test_id(i))?;
        }
        for i in 0..10 {
            lease_loop.ack_tx.send(AckResult::Ack(test_id(i)))?;
        }
        drop(lease_loop);

        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_flush() -> anyhow::Result<()> {
        const EXPECTED_SLEEP: Duration = Duration::from_millis(100);

        #[derive(Clone)]
        struct SlowLeaser;
        #[async_trait::async_trait]
        impl Leaser for SlowLeaser {
            async fn ack(&self, mut ack_ids: Vec<String>) {
                ack_ids.sort();
                assert_eq!(ack_ids, test_ids(0..10));
                tokio::time::sleep(EXPECTED_SLEEP).await;
            }
            async fn nack(&self, mut ack_ids: Vec<String>) {
                ack_ids.sort();
                assert_eq!(ack_ids, test_ids(10..30));
            }
            async fn extend(&self, _ack_ids: Vec<String>) {}
        }

        let start = Instant::now();
        let lease_loop = LeaseLoop::new(SlowLeaser, LeaseOptions::default());
        for i in 0..30 {
            lease_loop.message_tx.send(test_id(i))?;
        }
        for i in 0..10 {
            lease_loop.ack_tx.send(AckResult::Ack(test_id(i)))?;
        }
        // Nacks sent before the shutdown are covered by the final nack.
        lease_loop.ack_tx.send(AckResult::Nack(test_id(15)))?;

        drop(lease_loop.message_tx);
        lease_loop.handle.await?;
        assert_eq!(start.elapsed(), EXPECTED_SLEEP);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn no_add_and_ack_race() -> anyhow::Result<()> {
        // Run enough times to trigger a race, if `biased` were missing.
        for _ in 0..1000 {
            let mock = Arc::new(Mutex::new(MockLeaser::new()));
            let options = LeaseOptions {
                flush_start: Duration::from_millis(100),
                extend_start: Duration::from_millis(200),
                ..Default::default()
            };
            let lease_loop = LeaseLoop::new(mock.clone(), options);
            settle().await;

            lease_loop.message_tx.send(test_id(1))?;
            lease_loop.ack_tx.send(AckResult::Ack(test_id(1)))?;

            mock.lock()
                .await
                .expect_ack()
                .times(1)
                .withf(|v| *v == vec![test_id(1)])
                .returning(|_| ());
            tokio::time::advance(Duration::from_millis(100)).await;
            settle().await;
            mock.lock().await.checkpoint();

            // The acked message is not under lease.
            mock.lock().await.expect_extend().never();
            tokio::time::advance(Duration::from_millis(100)).await;
            settle().await;
            mock.lock().await.checkpoint();
        }
        Ok(())
    }
}
