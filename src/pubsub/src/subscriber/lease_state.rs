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

use super::leaser::Leaser;
use crate::config::ReceiveSettings;
use std::collections::HashMap;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at};

/// Extend leases this long before they expire.
const GRACE_PERIOD: Duration = Duration::from_secs(5);
const MIN_EXTEND_PERIOD: Duration = Duration::from_secs(1);
const FLUSH_PERIOD: Duration = Duration::from_millis(100);

/// Timing parameters for the lease management task.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct LeaseOptions {
    /// How often acks and nacks are sent to the service.
    pub(super) flush_period: Duration,
    /// The delay before the first flush.
    pub(super) flush_start: Duration,
    /// How often the leases are extended.
    pub(super) extend_period: Duration,
    /// The delay before the first extension.
    pub(super) extend_start: Duration,
    /// Messages held longer than this are dropped from lease management.
    pub(super) max_extension: Duration,
}

impl LeaseOptions {
    /// Derives the timing from the receive settings.
    ///
    /// Messages arrive with the stream ack deadline, later extensions use
    /// the lease deadline. Extending a little before the shorter of the two
    /// keeps every lease valid.
    pub(super) fn new(settings: &ReceiveSettings) -> Self {
        let stream_deadline = Duration::from_secs(settings.ack_deadline_seconds().max(0) as u64);
        let extend_period = stream_deadline
            .min(settings.lease_deadline())
            .saturating_sub(GRACE_PERIOD)
            .max(MIN_EXTEND_PERIOD);
        Self {
            flush_period: FLUSH_PERIOD,
            flush_start: FLUSH_PERIOD,
            extend_period,
            extend_start: extend_period,
            max_extension: settings.max_extension(),
        }
    }
}

impl Default for LeaseOptions {
    fn default() -> Self {
        Self::new(&ReceiveSettings::default())
    }
}

#[derive(Debug, PartialEq)]
pub(super) enum LeaseEvent {
    /// Send the pending acks and nacks.
    Flush,
    /// Extend the leases of the messages held by the application.
    Extend,
}

#[derive(Debug)]
pub(super) struct LeaseState<L>
where
    L: Leaser,
{
    /// The ack ids under lease management, and when they were received.
    under_lease: HashMap<String, Instant>,
    to_ack: Vec<String>,
    to_nack: Vec<String>,
    leaser: L,
    max_extension: Duration,
    flush_interval: Interval,
    extend_interval: Interval,
}

impl<L> LeaseState<L>
where
    L: Leaser,
{
    pub(super) fn new(leaser: L, options: LeaseOptions) -> Self {
        let now = Instant::now();
        let mut flush_interval = interval_at(now + options.flush_start, options.flush_period);
        flush_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut extend_interval = interval_at(now + options.extend_start, options.extend_period);
        extend_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            under_lease: HashMap::new(),
            to_ack: Vec::new(),
            to_nack: Vec::new(),
            leaser,
            max_extension: options.max_extension,
            flush_interval,
            extend_interval,
        }
    }

    /// Waits for the next timer event.
    ///
    /// This is cancel safe, it can be used as a branch in `tokio::select!`.
    pub(super) async fn next_event(&mut self) -> LeaseEvent {
        tokio::select! {
            _ = self.flush_interval.tick() => LeaseEvent::Flush,
            _ = self.extend_interval.tick() => LeaseEvent::Extend,
        }
    }

    /// Accept a new ack ID under lease management
    pub(super) fn add(&mut self, ack_id: String) {
        self.under_lease.insert(ack_id, Instant::now());
    }

    /// Process an ack from the application
    pub(super) fn ack(&mut self, ack_id: String) {
        self.under_lease.remove(&ack_id);
        // Acks for expired leases are still sent, the service may accept them.
        self.to_ack.push(ack_id);
    }

    /// Process a nack from the application
    pub(super) fn nack(&mut self, ack_id: String) {
        // Expired leases need no action, the service redelivers them anyway.
        if self.under_lease.remove(&ack_id).is_some() {
            self.to_nack.push(ack_id);
        }
    }

    /// Flush pending acks/nacks
    pub(super) async fn flush(&mut self) {
        let to_ack = std::mem::take(&mut self.to_ack);
        let to_nack = std::mem::take(&mut self.to_nack);
        send_batches(&self.leaser, to_ack, to_nack).await;
    }

    /// Extends leases for messages under lease management
    ///
    /// Drops messages held for longer than the maximum extension.
    pub(super) async fn extend(&mut self) {
        let now = Instant::now();
        let max_extension = self.max_extension;
        let before = self.under_lease.len();
        self.under_lease
            .retain(|_, received| now.duration_since(*received) < max_extension);
        let expired = before - self.under_lease.len();
        if expired > 0 {
            tracing::debug!(expired, "stopped extending leases past the max extension");
        }
        if self.under_lease.is_empty() {
            return;
        }
        let ack_ids = self.under_lease.keys().cloned().collect();
        self.leaser.extend(ack_ids).await;
    }

    /// Shutdown the leaser
    ///
    /// This flushes all pending acks and nacks all other messages.
    pub(super) async fn shutdown(self) {
        let mut to_nack = self.to_nack;
        to_nack.extend(self.under_lease.into_keys());
        send_batches(&self.leaser, self.to_ack, to_nack).await;
    }
}

async fn send_batches<L>(leaser: &L, to_ack: Vec<String>, to_nack: Vec<String>)
where
    L: Leaser,
{
    let acks = async {
        if !to_ack.is_empty() {
            leaser.ack(to_ack).await;
        }
    };
    let nacks = async {
        if !to_nack.is_empty() {
            leaser.nack(to_nack).await;
        }
    };
    tokio::join!(acks, nacks);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::super::leaser::tests::MockLeaser;
    use super::*;

    pub(crate) fn test_id(v: i32) -> String {
        format!("{v:03}")
    }

    pub(crate) fn test_ids(range: std::ops::Range<i32>) -> Vec<String> {
        range.map(test_id).collect()
    }

    pub(crate) fn sorted(v: &[String]) -> Vec<String> {
        let mut s = v.to_owned();
        s.sort();
        s
    }

    type Snapshot = (Vec<String>, Vec<String>, Vec<String>);

    fn snapshot<L: Leaser>(state: &LeaseState<L>) -> Snapshot {
        let under_lease: Vec<String> = state.under_lease.keys().cloned().collect();
        (sorted(&under_lease), state.to_ack.clone(), state.to_nack.clone())
    }

    fn want<const U: usize, const A: usize, const N: usize>(
        under_lease: [&str; U],
        to_ack: [&str; A],
        to_nack: [&str; N],
    ) -> Snapshot {
        fn owned(v: &[&str]) -> Vec<String> {
            v.iter().map(|s| s.to_string()).collect()
        }
        (owned(&under_lease), owned(&to_ack), owned(&to_nack))
    }

    #[test]
    fn options_from_settings() {
        let options = LeaseOptions::default();
        assert_eq!(options.flush_period, FLUSH_PERIOD);
        assert_eq!(options.extend_period, Duration::from_secs(5));
        assert_eq!(options.extend_start, Duration::from_secs(5));
        assert_eq!(options.max_extension, Duration::from_secs(1800));

        let settings = ReceiveSettings::default()
            .set_ack_deadline_seconds(120)
            .set_max_extension(Duration::from_secs(600));
        let options = LeaseOptions::new(&settings);
        assert_eq!(options.extend_period, Duration::from_secs(115));
        assert_eq!(options.max_extension, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn basic_add_ack_nack() {
        let mut state = LeaseState::new(MockLeaser::new(), LeaseOptions::default());
        assert_eq!(snapshot(&state), want([], [], []));

        state.add("1".to_string());
        state.add("2".to_string());
        state.add("3".to_string());
        assert_eq!(snapshot(&state), want(["1", "2", "3"], [], []));

        state.ack("1".to_string());
        assert_eq!(snapshot(&state), want(["2", "3"], ["1"], []));

        state.nack("2".to_string());
        assert_eq!(snapshot(&state), want(["3"], ["1"], ["2"]));

        state.add("4".to_string());
        state.ack("4".to_string());
        assert_eq!(snapshot(&state), want(["3"], ["1", "4"], ["2"]));

        state.nack("3".to_string());
        assert_eq!(snapshot(&state), want([], ["1", "4"], ["2", "3"]));
    }

    #[tokio::test]
    async fn ack_out_of_lease_included() {
        let mut state = LeaseState::new(MockLeaser::new(), LeaseOptions::default());
        state.ack("1".to_string());
        assert_eq!(snapshot(&state), want([], ["1"], []));
    }

    #[tokio::test]
    async fn nack_out_of_lease_ignored() {
        let mut state = LeaseState::new(MockLeaser::new(), LeaseOptions::default());
        state.nack("1".to_string());
        assert_eq!(snapshot(&state), want([], [], []));
    }

    #[tokio::test]
    async fn flush() {
        let mut mock = MockLeaser::new();
        mock.expect_ack()
            .times(1)
            .withf(|v| sorted(v) == test_ids(0..10))
            .returning(|_| ());
        mock.expect_nack()
            .times(1)
            .withf(|v| sorted(v) == test_ids(10..20))
            .returning(|_| ());

        let mut state = LeaseState::new(mock, LeaseOptions::default());
        for i in 0..100 {
            state.add(test_id(i));
        }
        for i in 0..10 {
            state.ack(test_id(i));
        }
        for i in 10..20 {
            state.nack(test_id(i));
        }
        state.flush().await;
        let (under_lease, to_ack, to_nack) = snapshot(&state);
        assert_eq!(under_lease, test_ids(20..100));
        assert!(to_ack.is_empty(), "{to_ack:?}");
        assert!(to_nack.is_empty(), "{to_nack:?}");
    }

    #[tokio::test]
    async fn flush_skips_empty_batches() {
        let mut mock = MockLeaser::new();
        mock.expect_ack().never();
        mock.expect_nack().never();
        let mut state = LeaseState::new(mock, LeaseOptions::default());
        state.add(test_id(1));
        state.flush().await;
    }

    #[tokio::test]
    async fn extend() {
        let mut seq = mockall::Sequence::new();
        let mut mock = MockLeaser::new();
        mock.expect_extend()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|v| sorted(v) == test_ids(0..10))
            .returning(|_| ());
        mock.expect_extend()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|v| sorted(v) == test_ids(0..20))
            .returning(|_| ());
        mock.expect_extend()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|v| sorted(v) == test_ids(10..20))
            .returning(|_| ());

        let mut state = LeaseState::new(mock, LeaseOptions::default());
        for i in 0..10 {
            state.add(test_id(i));
        }
        state.extend().await;

        for i in 10..20 {
            state.add(test_id(i));
        }
        state.extend().await;

        // Neither acked nor nacked messages are extended.
        for i in 0..5 {
            state.ack(test_id(i));
        }
        for i in 5..10 {
            state.nack(test_id(i));
        }
        state.extend().await;

        // Nothing left to extend.
        for i in 10..20 {
            state.ack(test_id(i));
        }
        state.extend().await;
    }

    #[tokio::test(start_paused = true)]
    async fn extend_drops_expired_messages() {
        const MAX_EXTENSION: Duration = Duration::from_secs(60);

        let mut seq = mockall::Sequence::new();
        let mut mock = MockLeaser::new();
        mock.expect_extend()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|v| sorted(v) == test_ids(0..20))
            .returning(|_| ());
        mock.expect_extend()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|v| sorted(v) == test_ids(10..20))
            .returning(|_| ());

        let options = LeaseOptions {
            max_extension: MAX_EXTENSION,
            ..Default::default()
        };
        let mut state = LeaseState::new(mock, options);
        for i in 0..10 {
            state.add(test_id(i));
        }
        tokio::time::advance(MAX_EXTENSION / 2).await;
        for i in 10..20 {
            state.add(test_id(i));
        }
        state.extend().await;

        tokio::time::advance(MAX_EXTENSION / 2).await;
        state.extend().await;
        assert_eq!(snapshot(&state).0, test_ids(10..20));

        // Expired messages are not nacked either.
        state.nack(test_id(1));
        assert_eq!(snapshot(&state).2, Vec::<String>::new());
    }

    #[tokio::test]
    async fn shutdown() {
        let mut mock = MockLeaser::new();
        mock.expect_ack()
            .times(1)
            .withf(|v| sorted(v) == test_ids(0..10))
            .returning(|_| ());
        mock.expect_nack()
            .times(1)
            .withf(|v| sorted(v) == test_ids(10..30))
            .returning(|_| ());

        let mut state = LeaseState::new(mock, LeaseOptions::default());
        for i in 0..30 {
            state.add(test_id(i));
        }
        for i in 0..10 {
            state.ack(test_id(i));
        }
        for i in 10..20 {
            state.nack(test_id(i));
        }
        state.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn next_event() {
        let options = LeaseOptions {
            flush_start: Duration::from_millis(100),
            flush_period: Duration::from_millis(100),
            extend_start: Duration::from_millis(250),
            extend_period: Duration::from_secs(10),
            ..Default::default()
        };
        let start = Instant::now();
        let mut state = LeaseState::new(MockLeaser::new(), options);
        assert_eq!(state.next_event().await, LeaseEvent::Flush);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert_eq!(state.next_event().await, LeaseEvent::Flush);
        assert_eq!(state.next_event().await, LeaseEvent::Extend);
        assert_eq!(start.elapsed(), Duration::from_millis(250));
        assert_eq!(state.next_event().await, LeaseEvent::Flush);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }
}
