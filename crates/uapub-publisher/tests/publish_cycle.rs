#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use uapub_core::error::{PubSubError, Result};
use uapub_core::{DataSetPayload, NetworkMessage, ReaderSettings, Variant};
use uapub_publisher::app_state::AppState;
use uapub_publisher::config;
use uapub_publisher::transport::{ChannelTransport, Transport};
use uapub_publisher::writer::{DataSource, SimulatedSource};

const CFG: &str = r#"
version: 1
publisher:
  publisher_id: "plant-7"
transport:
  kind: log
writer_groups:
  - name: "line-a"
    publishing_interval_ms: 20
    network_content_mask: [NetworkMessageHeader, DataSetMessageHeader, PublisherId]
    writers:
      - id: 1
        name: "boiler"
        dataset_content_mask: [SequenceNumber, Timestamp, DataSetWriterName]
        fields:
          - { name: "count", signal: counter }
          - { name: "on", signal: toggle }
      - id: 2
        fields:
          - { name: "mode", signal: text, text: "auto" }
"#;

fn state_with(transport: Arc<dyn Transport>, source: Arc<dyn DataSource>) -> AppState {
    let cfg = config::load_from_str(CFG).unwrap();
    AppState::new(cfg, transport, source).unwrap()
}

fn reader(state: &AppState) -> ReaderSettings {
    let g = &state.groups()[0];
    ReaderSettings {
        network_content_mask: g.network_mask(),
        data_set_content_mask: g.writers()[0].dataset_mask,
        field_content_mask: g.writers()[0].field_mask,
    }
}

#[tokio::test]
async fn publish_once_ships_a_decodable_message() {
    let cfg = config::load_from_str(CFG).unwrap();
    let source = Arc::new(SimulatedSource::from_config(&cfg));
    let (tx, mut rx) = ChannelTransport::new(8);
    let state = state_with(Arc::new(tx), source);
    let group = &state.groups()[0];

    let n1 = group.publish_once(state.source(), state.transport(), state.metrics()).await.unwrap();
    group.publish_once(state.source(), state.transport(), state.metrics()).await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.group, "line-a");
    assert_eq!(first.bytes.len(), n1);

    let text = std::str::from_utf8(&first.bytes).unwrap();
    let msg = NetworkMessage::decode_json(text, &reader(&state)).unwrap();
    assert_eq!(msg.publisher_id.as_deref(), Some("plant-7"));
    assert_eq!(msg.messages.len(), 2);
    let boiler = &msg.messages[0];
    assert_eq!(boiler.writer_id, 1);
    assert_eq!(boiler.writer_name.as_deref(), Some("boiler"));
    assert_eq!(boiler.sequence_number, 1);
    assert_eq!(boiler.payload.get("count").unwrap().value, Variant::UInt32(0));
    assert_eq!(boiler.payload.get("on").unwrap().value, Variant::Boolean(false));

    let second = rx.recv().await.unwrap();
    let text = std::str::from_utf8(&second.bytes).unwrap();
    let msg2 = NetworkMessage::decode_json(text, &reader(&state)).unwrap();
    assert_ne!(msg2.message_id, msg.message_id);
    assert_eq!(msg2.messages[0].sequence_number, 2);
    assert_eq!(msg2.messages[0].payload.get("count").unwrap().value, Variant::UInt32(1));

    assert_eq!(state.metrics().messages_published.get(&[("group", "line-a")]), 2);
    assert_eq!(state.metrics().encode_duration.count(&[("group", "line-a")]), 2);
}

struct DuplicatingSource;

#[async_trait]
impl DataSource for DuplicatingSource {
    async fn sample(&self, _group: &str, _writer_id: u16, _cycle: u64) -> Result<DataSetPayload> {
        DataSetPayload::from_pairs([("x", Variant::Int32(1)), ("x", Variant::Int32(2))])
    }
}

#[tokio::test]
async fn sampling_errors_are_counted_and_nothing_is_sent() {
    let (tx, mut rx) = ChannelTransport::new(8);
    let state = state_with(Arc::new(tx), Arc::new(DuplicatingSource));
    let group = &state.groups()[0];

    let err = group
        .publish_once(state.source(), state.transport(), state.metrics())
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "DUPLICATE_FIELD");
    assert_eq!(
        state.metrics().sample_errors.get(&[("group", "line-a"), ("code", "DUPLICATE_FIELD")]),
        1
    );
    assert!(rx.try_recv().is_err());
}

struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn send(&self, _group: &str, _frame: bytes::Bytes) -> Result<()> {
        Err(PubSubError::Transport("link down".into()))
    }
}

#[tokio::test]
async fn send_errors_are_counted() {
    let cfg = config::load_from_str(CFG).unwrap();
    let state = state_with(Arc::new(FailingTransport), Arc::new(SimulatedSource::from_config(&cfg)));
    let group = &state.groups()[0];

    let err = group
        .publish_once(state.source(), state.transport(), state.metrics())
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "TRANSPORT");
    assert_eq!(state.metrics().send_errors.get(&[("group", "line-a"), ("transport", "failing")]), 1);
    assert_eq!(state.metrics().messages_published.get(&[("group", "line-a")]), 0);
}

#[tokio::test]
async fn run_publishes_until_shutdown_then_drains() {
    let cfg = config::load_from_str(CFG).unwrap();
    let source = Arc::new(SimulatedSource::from_config(&cfg));
    let (tx, mut rx) = ChannelTransport::new(64);
    let state = state_with(Arc::new(tx), source);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(uapub_publisher::publisher::run(state.clone(), async move {
        let _ = stop_rx.await;
    }));

    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no frame within timeout")
        .unwrap();
    assert_eq!(frame.group, "line-a");
    assert!(!state.is_draining());

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not stop")
        .unwrap()
        .unwrap();

    assert!(state.is_draining());
    assert_eq!(state.metrics().groups_running.get(&[("group", "line-a")]), 0);
    let text = state.metrics().render(&state.metrics_extra());
    assert!(text.contains("uapub_draining 1"));
    assert!(text.contains("uapub_writer_groups 1"));
}

#[tokio::test]
async fn shutdown_is_not_held_up_by_a_full_transport() {
    let cfg = config::load_from_str(CFG).unwrap();
    let source = Arc::new(SimulatedSource::from_config(&cfg));
    // Capacity one and a receiver that is never read: the second send blocks.
    let (tx, _rx) = ChannelTransport::new(1);
    let state = state_with(Arc::new(tx), source);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(uapub_publisher::publisher::run(state.clone(), async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(200)).await;
    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(3), handle)
        .await
        .expect("run blocked on a full transport")
        .unwrap()
        .unwrap();
    assert_eq!(state.metrics().groups_running.get(&[("group", "line-a")]), 0);
    assert_eq!(state.metrics().messages_published.get(&[("group", "line-a")]), 1);
}

/// Fails writer 2 on the first cycle only.
struct FlakySecondWriter {
    inner: SimulatedSource,
}

#[async_trait]
impl DataSource for FlakySecondWriter {
    async fn sample(&self, group: &str, writer_id: u16, cycle: u64) -> Result<DataSetPayload> {
        if writer_id == 2 && cycle == 0 {
            return Err(PubSubError::Internal("sensor offline".into()));
        }
        self.inner.sample(group, writer_id, cycle).await
    }
}

#[tokio::test]
async fn failed_sample_does_not_consume_sequence_numbers() {
    let cfg = config::load_from_str(CFG).unwrap();
    let source = Arc::new(FlakySecondWriter {
        inner: SimulatedSource::from_config(&cfg),
    });
    let (tx, mut rx) = ChannelTransport::new(8);
    let state = state_with(Arc::new(tx), source);
    let group = &state.groups()[0];

    assert!(group.publish_once(state.source(), state.transport(), state.metrics()).await.is_err());
    assert!(rx.try_recv().is_err());
    group.publish_once(state.source(), state.transport(), state.metrics()).await.unwrap();

    let frame = rx.recv().await.unwrap();
    let text = std::str::from_utf8(&frame.bytes).unwrap();
    let msg = NetworkMessage::decode_json(text, &reader(&state)).unwrap();
    assert_eq!(msg.messages[0].sequence_number, 1);
    assert_eq!(group.writers()[1].next_sequence(), 2);
}

#[test]
fn app_state_validates_configs_built_in_code() {
    let mut cfg = config::load_from_str(CFG).unwrap();
    cfg.writer_groups[0].publishing_interval_ms = 0;
    let source = Arc::new(SimulatedSource::from_config(&cfg));
    let (tx, _rx) = ChannelTransport::new(1);
    match AppState::new(cfg, Arc::new(tx), source) {
        Ok(_) => panic!("zero publishing interval accepted"),
        Err(e) => assert_eq!(e.code().as_str(), "BAD_CONFIG"),
    }
}
