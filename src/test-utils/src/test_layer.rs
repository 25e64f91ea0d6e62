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

use std::collections::HashMap;
use std::sync::{Mutex, Once};
use tracing::{Event, Level, Subscriber, field, span};
use tracing_subscriber::{self, Layer, layer::Context, prelude::*, registry::SpanRef};

/// Represents a captured tracing event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    /// The event level.
    pub level: Level,
    /// The event target, by default the module path where the event happened.
    pub target: String,
    /// The formatted message, if any.
    pub message: String,
    /// The remaining fields, formatted as strings.
    pub fields: HashMap<String, String>,
    /// The test ID associated with this event, if captured via `TestLayer::initialize`.
    pub test_id: Option<String>,
}

/// Extracts field key-value pairs from events and spans.
struct TestVisitor<'a>(&'a mut HashMap<String, String>);

impl<'a> field::Visit for TestVisitor<'a> {
    fn record_str(&mut self, field: &field::Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_i64(&mut self, field: &field::Field, value: i64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &field::Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &field::Field, value: bool) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

/// A thread-safe log to store `CapturedEvent` instances.
struct CapturedEventLog {
    events: Mutex<Vec<CapturedEvent>>,
}

impl CapturedEventLog {
    const fn new() -> Self {
        CapturedEventLog {
            events: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, event: CapturedEvent) {
        self.events
            .lock()
            .expect("event log is poisoned")
            .push(event);
    }

    /// Retrieves and removes all events associated with a given `test_id`.
    fn take_by_test_id(&self, test_id: &str) -> Vec<CapturedEvent> {
        let mut events = self.events.lock().expect("event log is poisoned");
        let (taken, kept): (Vec<_>, Vec<_>) = events
            .drain(..)
            .partition(|e| e.test_id.as_deref() == Some(test_id));
        *events = kept;
        taken
    }

    /// Removes all events associated with a given `test_id`.
    fn clear_by_test_id(&self, test_id: &str) {
        self.events
            .lock()
            .expect("event log is poisoned")
            .retain(|e| e.test_id.as_deref() != Some(test_id));
    }
}

static EVENT_LOG: CapturedEventLog = CapturedEventLog::new();
static INIT: Once = Once::new();

/// The name of the span marking the scope of a test.
const TEST_SPAN: &str = "test_layer";

/// A wrapper type to store the test ID in span extensions.
#[derive(Clone, Debug)]
struct TestId(String);

/// Finds the test ID by traversing up the span tree.
fn find_test_id<S: Subscriber + for<'b> tracing_subscriber::registry::LookupSpan<'b>>(
    mut span_ref: SpanRef<'_, S>,
) -> Option<String> {
    loop {
        if span_ref.name() == TEST_SPAN {
            return span_ref.extensions().get::<TestId>().map(|t| t.0.clone());
        }
        span_ref = span_ref.parent()?;
    }
}

/// A tracing layer for capturing and inspecting log events within tests.
///
/// The layer is installed as the global subscriber. It isolates captured
/// events by a `test_id`, allowing tests to run in parallel without
/// interfering with each other.
///
/// # Usage
///
/// 1.  **Initialize:** call `TestLayer::initialize()` with a unique `TEST_ID`.
///     This returns an RAII guard, events are captured while the guard is in
///     scope.
/// 2.  **Execute Code:** run the code under test.
/// 3.  **Capture Events:** call `TestLayer::capture()` with the same `TEST_ID`.
/// 4.  **Assert:** make assertions on the captured events.
///
/// # Example
///
/// ```rust
/// use pubsub_bugbash_test_utils::test_layer::*;
///
/// #[tokio::test]
/// async fn my_tracing_test() {
///     const TEST_ID: &str = "my_tracing_test";
///     let _guard = TestLayer::initialize(TEST_ID);
///
///     tracing::info!(foo = "bar", "Doing something important");
///
///     let captured = TestLayer::capture(TEST_ID);
///     assert_eq!(captured.len(), 1);
///     assert_eq!(captured[0].message, "Doing something important");
///     assert_eq!(captured[0].fields.get("foo"), Some(&"bar".to_string()));
/// }
/// ```
#[derive(Clone, Default)]
pub struct TestLayer;

impl TestLayer {
    /// Initializes the TestLayer for the current test scope.
    ///
    /// Installs the `TestLayer` as a global subscriber if it hasn't been already.
    /// It clears any previously captured events for the given `test_id`.
    pub fn initialize(test_id: &'static str) -> tracing::span::EnteredSpan {
        INIT.call_once(|| {
            let subscriber = tracing_subscriber::registry().with(TestLayer);
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set global default subscriber");
        });
        EVENT_LOG.clear_by_test_id(test_id);
        tracing::span!(Level::INFO, TEST_SPAN, test_id = test_id).entered()
    }

    /// Retrieves and removes all events captured for the given `test_id`.
    pub fn capture(test_id: &str) -> Vec<CapturedEvent> {
        EVENT_LOG.take_by_test_id(test_id)
    }
}

impl<S> Layer<S> for TestLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != TEST_SPAN {
            return;
        }
        let mut fields = HashMap::new();
        attrs.record(&mut TestVisitor(&mut fields));
        if let (Some(span_ref), Some(test_id)) = (ctx.span(id), fields.remove("test_id")) {
            span_ref.extensions_mut().insert(TestId(test_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut TestVisitor(&mut fields));
        let message = fields.remove("message").unwrap_or_default();
        let metadata = event.metadata();
        EVENT_LOG.push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message,
            fields,
            test_id: ctx.event_span(event).and_then(find_test_id),
        });
    }
}
