//! Purpose: End-to-end tests for the call relay over an in-memory transport.
//! Role: Validate correlation, the error-message contract, silence rules, and
//! overlapping in-flight calls.
//! Invariants: Bounded waits avoid test flakiness.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;

use ykbridge::core::capability::{CallError, Capability};
use ykbridge::core::error::{Error, ErrorKind};
use ykbridge::core::wire::CallResponse;
use ykbridge::relay::{Bridge, CALLS_TOPIC, RESULTS_TOPIC};
use ykbridge::transport::{Inbound, Publish};

struct FakePublisher {
    tx: mpsc::UnboundedSender<(String, Bytes)>,
}

#[async_trait]
impl Publish for FakePublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), Error> {
        self.tx
            .send((topic.to_string(), payload))
            .map_err(|_| Error::new(ErrorKind::Transport).with_message("result channel closed"))
    }
}

struct ScriptedInbound {
    rx: mpsc::UnboundedReceiver<(String, Bytes)>,
}

#[async_trait]
impl Inbound for ScriptedInbound {
    async fn next_message(&mut self) -> Result<Option<(String, Bytes)>, Error> {
        Ok(self.rx.recv().await)
    }
}

struct Harness {
    calls: mpsc::UnboundedSender<(String, Bytes)>,
    results: mpsc::UnboundedReceiver<(String, Bytes)>,
}

impl Harness {
    fn start(root: Capability) -> Self {
        let (calls_tx, calls_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let bridge = Bridge::new(Arc::new(root), Arc::new(FakePublisher { tx: results_tx }));
        tokio::spawn(async move { bridge.run(ScriptedInbound { rx: calls_rx }).await });
        Self {
            calls: calls_tx,
            results: results_rx,
        }
    }

    fn send(&self, payload: &str) {
        self.send_on(CALLS_TOPIC, payload);
    }

    fn send_on(&self, topic: &str, payload: &str) {
        self.calls
            .send((topic.to_string(), Bytes::copy_from_slice(payload.as_bytes())))
            .expect("inbound channel open");
    }

    async fn next_response(&mut self) -> CallResponse {
        let (topic, payload) = timeout(Duration::from_secs(2), self.results.recv())
            .await
            .expect("response within deadline")
            .expect("result channel open");
        assert_eq!(topic, RESULTS_TOPIC);
        serde_json::from_slice(&payload).expect("decode response")
    }

    async fn expect_silence(&mut self) {
        let outcome = timeout(Duration::from_millis(200), self.results.recv()).await;
        assert!(outcome.is_err(), "expected no response, got {outcome:?}");
    }
}

fn demo_root() -> Capability {
    Capability::object([
        (
            "math",
            Capability::object([(
                "add",
                Capability::method(|args: Vec<Value>| {
                    let sum = args.iter().filter_map(Value::as_i64).sum::<i64>();
                    std::future::ready(Ok(json!(sum)))
                }),
            )]),
        ),
        (
            "broken",
            Capability::object([(
                "thrower",
                Capability::method(|_args| {
                    std::future::ready(Err(CallError::new("boom").with_code("E_X")))
                }),
            )]),
        ),
        (
            "slow",
            Capability::object([(
                "wait",
                Capability::method(|_args| async {
                    tokio::time::sleep(Duration::from_millis(250)).await;
                    Ok(json!("slow"))
                }),
            )]),
        ),
        (
            "fast",
            Capability::object([(
                "ping",
                Capability::method(|_args| std::future::ready(Ok(json!("fast")))),
            )]),
        ),
    ])
}

#[tokio::test]
async fn valid_call_gets_exactly_one_correlated_response() {
    let mut harness = Harness::start(demo_root());
    harness.send(r#"{"id":"1","path":"math.add","args":[2,3]}"#);

    let response = harness.next_response().await;
    assert_eq!(
        serde_json::to_value(&response).expect("encode"),
        json!({"id": "1", "ok": true, "result": 5})
    );
    harness.expect_silence().await;
}

#[tokio::test]
async fn unresolvable_target_reports_the_offending_path() {
    let mut harness = Harness::start(demo_root());
    harness.send(r#"{"id":"2","path":"math.nonexistent"}"#);

    let response = harness.next_response().await;
    assert_eq!(response.id, "2");
    assert!(!response.ok);
    assert_eq!(
        response.error.as_deref(),
        Some("Target at path 'math.nonexistent' is not a function")
    );
}

#[tokio::test]
async fn invocation_failure_surfaces_message_and_code() {
    let mut harness = Harness::start(demo_root());
    harness.send(r#"{"id":"3","path":"broken.thrower"}"#);

    let response = harness.next_response().await;
    assert_eq!(
        serde_json::to_value(&response).expect("encode"),
        json!({"id": "3", "ok": false, "error": "boom", "code": "E_X"})
    );
}

#[tokio::test]
async fn empty_id_or_path_never_answers() {
    let mut harness = Harness::start(demo_root());
    harness.send(r#"{"id":"","path":"math.add","args":[1,1]}"#);
    harness.send(r#"{"id":"4","path":""}"#);
    harness.expect_silence().await;
}

#[tokio::test]
async fn malformed_bodies_never_answer() {
    let mut harness = Harness::start(demo_root());
    harness.send("not json at all");
    harness.send(r#"["an","array"]"#);
    harness.expect_silence().await;
}

#[tokio::test]
async fn messages_on_other_topics_are_ignored() {
    let mut harness = Harness::start(demo_root());
    harness.send_on("some-other-topic", r#"{"id":"5","path":"math.add","args":[1,1]}"#);
    harness.expect_silence().await;
}

#[tokio::test]
async fn fast_call_overtakes_a_slower_earlier_one() {
    let mut harness = Harness::start(demo_root());
    harness.send(r#"{"id":"slow","path":"slow.wait"}"#);
    harness.send(r#"{"id":"fast","path":"fast.ping"}"#);

    let first = harness.next_response().await;
    let second = harness.next_response().await;
    assert_eq!(first.id, "fast");
    assert_eq!(first.result, Some(json!("fast")));
    assert_eq!(second.id, "slow");
    assert_eq!(second.result, Some(json!("slow")));
}
