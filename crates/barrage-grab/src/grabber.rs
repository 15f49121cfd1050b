//! Pipeline facade.
//!
//! [`BarrageGrab`] wires the allow-list, wire codec, inflater, registry,
//! dedup cache and dispatcher into one ingestion call, and owns the
//! `Idle → Running → Stopped` lifecycle.
//!
//! ## Frame Processing
//!
//! ```text
//! RawFrame → running? → allow-list → non-empty?
//!                                        │
//!              ┌─────────────────────────┴─────────────────────────┐
//!              │ socket stream                                     │ http response
//!              ▼                                                   ▼
//!   decompress && byte[0] != 0x08 → drop                 JSON object?
//!   decode_outer                                          │yes            │no
//!   compress_type=gzip? (else drop)                 decode_json_pack  decode_inner
//!   inflate (if flagged) → decode_inner                   │               │
//!              │                                     decode_event     per record
//!              ▼                                          ▼               ▼
//!   per record: registry decode → dedup admit → emit   dedup admit → emit
//! ```
//!
//! No frame outcome is ever propagated as an error: envelope and inflate
//! failures are logged at `warn` and drop that frame only.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use barrage_core::{
    decode_inner, decode_json_pack, decode_outer, default_registry, looks_like_json,
    BarrageMsgPack, DedupCache, FrameError, GzipInflater, Inflate, MessageRegistry, PolicyDrop,
    RecordBatch, GZIP_FRAME_TAG,
};

use crate::capture::{CaptureSource, FrameSink, FrameSource, RawFrame};
use crate::config::GrabConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{GrabError, Result};
use crate::event::GrabEvent;
use crate::filter::ProcessFilter;
use crate::stats::{GrabStats, StatsSnapshot};

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GrabState {
    Idle = 0,
    Running = 1,
    /// Terminal; a stopped pipeline cannot be restarted.
    Stopped = 2,
}

impl GrabState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => GrabState::Idle,
            1 => GrabState::Running,
            _ => GrabState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrabState::Idle => "idle",
            GrabState::Running => "running",
            GrabState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for GrabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one ingested frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Discarded by policy; not a fault.
    Dropped(PolicyDrop),
    /// Envelope or inflate failure; the frame was discarded.
    Failed(FrameError),
    /// Decoded. `records` counts records in the frame, `emitted` the events
    /// that survived decoding and dedup.
    Processed { records: usize, emitted: usize },
}

impl FrameOutcome {
    /// Returns the number of emitted events.
    pub fn emitted(&self) -> usize {
        match self {
            FrameOutcome::Processed { emitted, .. } => *emitted,
            _ => 0,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, FrameOutcome::Dropped(_))
    }
}

/// Shared pipeline state; this is what the capture source feeds.
struct Pipeline {
    state: AtomicU8,
    filter: Arc<dyn ProcessFilter>,
    registry: Arc<MessageRegistry>,
    inflater: Arc<dyn Inflate>,
    dedup: DedupCache,
    dispatcher: Arc<Dispatcher>,
    stats: GrabStats,
}

impl Pipeline {
    fn state(&self) -> GrabState {
        GrabState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn ingest(&self, frame: RawFrame) -> FrameOutcome {
        self.stats.frame_received();

        let outcome = if self.state() != GrabState::Running {
            FrameOutcome::Dropped(PolicyDrop::Stopped)
        } else if !self.filter.is_enabled(&frame.process) {
            FrameOutcome::Dropped(PolicyDrop::DisabledProcess)
        } else if frame.payload.is_empty() {
            FrameOutcome::Dropped(PolicyDrop::EmptyPayload)
        } else {
            let result = match frame.source {
                FrameSource::SocketStream => self.process_socket(&frame),
                FrameSource::HttpResponse => self.process_http(&frame),
            };
            result.unwrap_or_else(FrameOutcome::Failed)
        };

        match &outcome {
            FrameOutcome::Dropped(reason) => {
                self.stats.frame_dropped();
                trace!(process = %frame.process, %reason, "frame dropped");
            }
            FrameOutcome::Failed(error) => {
                self.stats.frame_failed();
                warn!(
                    process = %frame.process,
                    source = ?frame.source,
                    len = frame.payload.len(),
                    "Dropping frame: {}",
                    error
                );
            }
            FrameOutcome::Processed { .. } => {}
        }

        outcome
    }

    fn process_socket(&self, frame: &RawFrame) -> std::result::Result<FrameOutcome, FrameError> {
        if frame.decompress && frame.payload.first() != Some(&GZIP_FRAME_TAG) {
            return Ok(FrameOutcome::Dropped(PolicyDrop::BadMagic));
        }

        let outer = decode_outer(&frame.payload)?;
        if !outer.is_gzip() {
            return Ok(FrameOutcome::Dropped(PolicyDrop::MissingCompressHeader));
        }

        let batch = if frame.decompress {
            decode_inner(&self.inflater.inflate(&outer.payload)?)?
        } else {
            decode_inner(&outer.payload)?
        };

        Ok(self.dispatch_batch(&frame.process, batch))
    }

    fn process_http(&self, frame: &RawFrame) -> std::result::Result<FrameOutcome, FrameError> {
        if looks_like_json(&frame.payload) {
            match decode_json_pack(&frame.payload) {
                Ok(pack) => return Ok(self.dispatch_pack(&frame.process, pack)),
                Err(json_error) => {
                    // Binary batches can sniff as JSON.
                    let Ok(batch) = decode_inner(&frame.payload) else {
                        return Err(json_error.into());
                    };
                    trace!(process = %frame.process, "JSON-shaped payload decoded as batch");
                    return Ok(self.dispatch_batch(&frame.process, batch));
                }
            }
        }

        let batch = decode_inner(&frame.payload)?;
        Ok(self.dispatch_batch(&frame.process, batch))
    }

    fn dispatch_batch(&self, process: &str, batch: RecordBatch) -> FrameOutcome {
        let records = batch.messages.len();
        let mut emitted = 0;

        for record in batch.messages {
            let message = match self.registry.decode(&record) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    trace!(method = %record.method, "no decoder registered");
                    continue;
                }
                Err(e) => {
                    self.stats.record_failed();
                    debug!(process, msg_id = record.msg_id, "Dropping record: {}", e);
                    continue;
                }
            };
            self.stats.record_decoded();

            if !self.dedup.admit(&record.method, record.msg_id) {
                self.stats.duplicate();
                continue;
            }

            self.emit(GrabEvent::barrage(process, message));
            emitted += 1;
        }

        FrameOutcome::Processed { records, emitted }
    }

    fn dispatch_pack(&self, frame_process: &str, pack: BarrageMsgPack) -> FrameOutcome {
        let event = match pack.decode_event() {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!(kind = %pack.kind, "pack without payload");
                return FrameOutcome::Processed {
                    records: 0,
                    emitted: 0,
                };
            }
            Err(e) => {
                self.stats.record_failed();
                debug!(process = frame_process, "Dropping pack: {}", e);
                return FrameOutcome::Processed {
                    records: 1,
                    emitted: 0,
                };
            }
        };
        self.stats.record_decoded();

        let msg_id = event.msg_id();
        if msg_id != 0 && !self.dedup.admit(pack.kind.dedup_key(), msg_id) {
            self.stats.duplicate();
            return FrameOutcome::Processed {
                records: 1,
                emitted: 0,
            };
        }

        let process = if pack.process_name.is_empty() {
            frame_process.to_string()
        } else {
            pack.process_name
        };
        self.emit(GrabEvent::pack(process, event));

        FrameOutcome::Processed {
            records: 1,
            emitted: 1,
        }
    }

    fn emit(&self, event: GrabEvent) {
        self.dispatcher.emit(event);
        self.stats.event_emitted();
    }
}

impl FrameSink for Pipeline {
    fn on_frame(&self, frame: RawFrame) {
        self.ingest(frame);
    }
}

/// Builder for [`BarrageGrab`].
#[derive(Default)]
pub struct BarrageGrabBuilder {
    config: GrabConfig,
    capture: Option<Arc<dyn CaptureSource>>,
    filter: Option<Arc<dyn ProcessFilter>>,
    registry: Option<Arc<MessageRegistry>>,
    inflater: Option<Arc<dyn Inflate>>,
    dispatcher: Option<Arc<Dispatcher>>,
}

impl BarrageGrabBuilder {
    /// Sets the configuration.
    pub fn with_config(mut self, config: GrabConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the capture source started and stopped with the pipeline.
    pub fn with_capture(mut self, capture: Arc<dyn CaptureSource>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Replaces the allow-list built from the configuration.
    pub fn with_filter(mut self, filter: Arc<dyn ProcessFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the record registry (default: all built-in shapes).
    pub fn with_registry(mut self, registry: Arc<MessageRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the gzip inflater built from the configuration.
    pub fn with_inflater(mut self, inflater: Arc<dyn Inflate>) -> Self {
        self.inflater = Some(inflater);
        self
    }

    /// Shares an existing dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Builds an idle pipeline.
    pub fn build(self) -> Result<BarrageGrab> {
        self.config.validate()?;

        let filter: Arc<dyn ProcessFilter> = match self.filter {
            Some(filter) => filter,
            None => Arc::new(self.config.allow_list()),
        };
        let inflater: Arc<dyn Inflate> = match self.inflater {
            Some(inflater) => inflater,
            None => Arc::new(GzipInflater::with_max_size(self.config.max_inflate_size)),
        };

        let inner = Pipeline {
            state: AtomicU8::new(GrabState::Idle as u8),
            filter,
            registry: self.registry.unwrap_or_else(default_registry),
            inflater,
            dedup: DedupCache::with_capacity(self.config.dedup_capacity),
            dispatcher: self.dispatcher.unwrap_or_default(),
            stats: GrabStats::new(),
        };

        Ok(BarrageGrab {
            inner: Arc::new(inner),
            capture: self.capture,
        })
    }
}

/// The ingestion pipeline.
///
/// Register sinks on [`dispatcher`](Self::dispatcher), then [`start`](Self::start).
/// Frames arrive through the capture source or [`ingest`](Self::ingest), which
/// may be called concurrently from any number of threads.
pub struct BarrageGrab {
    inner: Arc<Pipeline>,
    capture: Option<Arc<dyn CaptureSource>>,
}

impl std::fmt::Debug for BarrageGrab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarrageGrab")
            .field("state", &self.state())
            .field("registry", &self.inner.registry)
            .field("dedup", &self.inner.dedup)
            .field("dispatcher", &self.inner.dispatcher)
            .field("capture", &self.capture.is_some())
            .finish()
    }
}

impl BarrageGrab {
    /// Returns a builder with the default configuration.
    pub fn builder() -> BarrageGrabBuilder {
        BarrageGrabBuilder::default()
    }

    /// Creates an idle pipeline without a capture source.
    pub fn new(config: GrabConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> GrabState {
        self.inner.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == GrabState::Running
    }

    /// Returns the dispatcher for sink registration.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /// Returns the registry in use.
    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.inner.registry
    }

    /// Returns a snapshot of the pipeline counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Moves the pipeline from idle to running and starts the capture source.
    ///
    /// Fails if the pipeline is not idle or the capture source fails to start;
    /// in the latter case the pipeline stays idle.
    pub fn start(&self) -> Result<()> {
        self.inner
            .state
            .compare_exchange(
                GrabState::Idle as u8,
                GrabState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|current| {
                GrabError::InvalidState(format!(
                    "cannot start a {} pipeline",
                    GrabState::from_u8(current)
                ))
            })?;

        if let Some(capture) = &self.capture {
            let sink: Arc<dyn FrameSink> = self.inner.clone();
            if let Err(e) = capture.start(sink) {
                self.inner
                    .state
                    .store(GrabState::Idle as u8, Ordering::Release);
                tracing::error!("Failed to start capture: {}", e);
                return Err(e);
            }
        }

        info!(
            methods = self.inner.registry.len(),
            sinks = self.inner.dispatcher.sink_count(),
            "Barrage pipeline started"
        );
        Ok(())
    }

    /// Stops the pipeline. Idempotent.
    ///
    /// Detaches the capture source and releases sinks and dedup history.
    /// Frames already being processed complete; later frames are dropped.
    pub fn dispose(&self) {
        let previous = self
            .inner
            .state
            .swap(GrabState::Stopped as u8, Ordering::AcqRel);
        if previous == GrabState::Stopped as u8 {
            return;
        }

        if let Some(capture) = &self.capture {
            capture.stop();
        }
        self.inner.dispatcher.clear();
        self.inner.dedup.clear();

        let stats = self.stats();
        info!(
            frames = stats.frames_received,
            events = stats.events_emitted,
            "Barrage pipeline stopped"
        );
    }

    /// Processes one captured frame.
    pub fn ingest(&self, frame: RawFrame) -> FrameOutcome {
        self.inner.ingest(frame)
    }
}

impl Drop for BarrageGrab {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use parking_lot::Mutex;
    use prost::Message;

    use barrage_core::envelope::{
        HeaderPair, OuterEnvelope, RawRecord, COMPRESS_TYPE_GZIP, COMPRESS_TYPE_HEADER,
    };
    use barrage_core::messages::{ChatMessage, Common, GiftMessage, LikeMessage};
    use barrage_core::{DecompressError, EnvelopeError, PackMsgType};

    use super::*;
    use crate::capture::ReplayCapture;
    use crate::event::EventKind;
    use crate::filter::AllowList;

    const PROCESS: &str = "live.exe";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn outer(payload: Vec<u8>) -> OuterEnvelope {
        OuterEnvelope {
            seq_id: 1,
            headers: vec![HeaderPair::new(COMPRESS_TYPE_HEADER, COMPRESS_TYPE_GZIP)],
            payload,
            ..Default::default()
        }
    }

    fn socket_frame(records: Vec<RawRecord>) -> RawFrame {
        let batch = RecordBatch::with_records(records).encode_to_vec();
        RawFrame::socket(PROCESS, outer(gzip(&batch)).encode_to_vec(), true)
    }

    fn like(msg_id: i64) -> RawRecord {
        let like = LikeMessage {
            common: Some(Common {
                msg_id: msg_id as u64,
                ..Default::default()
            }),
            count: 1,
            ..Default::default()
        };
        RawRecord::new("WebcastLikeMessage", msg_id, like.encode_to_vec())
    }

    fn gift(msg_id: i64) -> RawRecord {
        let gift = GiftMessage {
            gift_id: 463,
            ..Default::default()
        };
        RawRecord::new("WebcastGiftMessage", msg_id, gift.encode_to_vec())
    }

    fn grab() -> BarrageGrab {
        let config = GrabConfig::default().with_process_filter([PROCESS]);
        let grab = BarrageGrab::new(config).unwrap();
        grab.start().unwrap();
        grab
    }

    fn collect(grab: &BarrageGrab) -> Arc<Mutex<Vec<GrabEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        grab.dispatcher()
            .on_any(move |event| sink.lock().push(event.clone()));
        events
    }

    struct CountingInflater {
        calls: AtomicUsize,
    }

    impl Inflate for CountingInflater {
        fn inflate(&self, bytes: &[u8]) -> std::result::Result<Vec<u8>, DecompressError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            GzipInflater::new().inflate(bytes)
        }
    }

    #[test]
    fn json_chat_pack_reaches_chat_sink() {
        let grab = grab();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        grab.dispatcher().on_pack_chat(move |event| {
            sink.lock()
                .push((event.process.to_string(), event.message.content.clone()));
        });

        let payload = br#"{"Type":1,"ProcessName":"live.exe","Data":"{\"Content\":\"hi\"}"}"#;
        let outcome = grab.ingest(RawFrame::http(PROCESS, payload.to_vec()));

        assert_eq!(outcome.emitted(), 1);
        assert_eq!(
            *seen.lock(),
            vec![("live.exe".to_string(), "hi".to_string())]
        );
    }

    #[test]
    fn repeated_like_is_delivered_once() {
        let grab = grab();
        let likes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&likes);
        grab.dispatcher().on_like(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        grab.ingest(socket_frame(vec![like(42)]));
        grab.ingest(socket_frame(vec![like(42)]));

        assert_eq!(likes.load(Ordering::SeqCst), 1);
        assert_eq!(grab.stats().duplicates, 1);
    }

    #[test]
    fn malformed_record_does_not_affect_batch() {
        let grab = grab();
        let events = collect(&grab);

        let broken_chat = RawRecord::new("WebcastChatMessage", 2, vec![0x0a, 0xff]);
        let outcome = grab.ingest(socket_frame(vec![gift(1), broken_chat]));

        assert!(matches!(
            outcome,
            FrameOutcome::Processed {
                records: 2,
                emitted: 1
            }
        ));
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind(),
            EventKind::Barrage(barrage_core::MessageKind::Gift)
        );
        assert_eq!(grab.stats().records_failed, 1);
    }

    #[test]
    fn unknown_record_is_silently_skipped() {
        let grab = grab();
        let events = collect(&grab);

        let rank = RawRecord::new("WebcastRoomRankMessage", 9, vec![1, 2, 3]);
        let outcome = grab.ingest(socket_frame(vec![rank, like(10)]));

        assert_eq!(outcome.emitted(), 1);
        assert_eq!(events.lock().len(), 1);
        assert_eq!(grab.stats().records_failed, 0);
    }

    #[test]
    fn bad_magic_skips_inflater() {
        let inflater = Arc::new(CountingInflater {
            calls: AtomicUsize::new(0),
        });
        let grab = BarrageGrab::builder()
            .with_filter(Arc::new(AllowList::from_names([PROCESS])))
            .with_inflater(inflater.clone())
            .build()
            .unwrap();
        grab.start().unwrap();

        let mut payload = socket_frame(vec![like(1)]).payload;
        payload[0] = 0x2a;
        let outcome = grab.ingest(RawFrame::socket(PROCESS, payload, true));

        assert!(matches!(outcome, FrameOutcome::Dropped(PolicyDrop::BadMagic)));
        assert_eq!(inflater.calls.load(Ordering::SeqCst), 0);

        grab.ingest(socket_frame(vec![like(1)]));
        assert_eq!(inflater.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_compress_header_is_policy_drop() {
        let grab = grab();
        let mut envelope = outer(gzip(&[]));
        envelope.headers.clear();

        let outcome = grab.ingest(RawFrame::socket(PROCESS, envelope.encode_to_vec(), true));
        assert!(matches!(
            outcome,
            FrameOutcome::Dropped(PolicyDrop::MissingCompressHeader)
        ));
        assert_eq!(grab.stats().frames_failed, 0);
    }

    #[test]
    fn uncompressed_socket_payload_is_decoded_directly() {
        let grab = grab();
        let batch = RecordBatch::with_records(vec![like(5)]).encode_to_vec();
        let frame = RawFrame::socket(PROCESS, outer(batch).encode_to_vec(), false);

        assert_eq!(grab.ingest(frame).emitted(), 1);
    }

    #[test]
    fn truncated_envelope_fails_frame_only() {
        let grab = grab();
        let events = collect(&grab);

        let mut bytes = socket_frame(vec![like(1)]).payload;
        bytes.truncate(bytes.len() - 4);
        let outcome = grab.ingest(RawFrame::socket(PROCESS, bytes, true));
        assert!(matches!(
            outcome,
            FrameOutcome::Failed(FrameError::Envelope(EnvelopeError::Malformed(_)))
        ));

        assert_eq!(grab.ingest(socket_frame(vec![like(2)])).emitted(), 1);
        assert_eq!(events.lock().len(), 1);
        assert_eq!(grab.stats().frames_failed, 1);
    }

    #[test]
    fn corrupt_gzip_fails_frame() {
        let grab = grab();
        let frame = RawFrame::socket(PROCESS, outer(b"not gzip".to_vec()).encode_to_vec(), true);

        assert!(matches!(
            grab.ingest(frame),
            FrameOutcome::Failed(FrameError::Decompress(_))
        ));
    }

    #[test]
    fn disabled_process_and_empty_payload_are_dropped() {
        let grab = grab();

        let outcome = grab.ingest(RawFrame::http("notepad", b"{}".to_vec()));
        assert!(matches!(
            outcome,
            FrameOutcome::Dropped(PolicyDrop::DisabledProcess)
        ));

        let outcome = grab.ingest(RawFrame::socket(PROCESS, Vec::new(), true));
        assert!(matches!(outcome, FrameOutcome::Dropped(PolicyDrop::EmptyPayload)));
        assert_eq!(grab.stats().frames_dropped, 2);
    }

    #[test]
    fn http_binary_batch_is_decoded() {
        let grab = grab();
        let events = collect(&grab);

        let batch = RecordBatch::with_records(vec![gift(3), like(4)]).encode_to_vec();
        let outcome = grab.ingest(RawFrame::http(PROCESS, batch));

        assert_eq!(outcome.emitted(), 2);
        let kinds: Vec<_> = events.lock().iter().map(GrabEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Barrage(barrage_core::MessageKind::Gift),
                EventKind::Barrage(barrage_core::MessageKind::Like),
            ]
        );
    }

    /// A batch whose single record is 123 bytes long (`{`) and whose last
    /// field ends in 125 (`}`).
    fn brace_framed_batch(method: &str) -> Vec<u8> {
        let record = (0..200)
            .map(|padding| RawRecord::new(method, 1, vec![0; padding]))
            .find(|record| record.encoded_len() == 0x7b)
            .unwrap();
        let batch = RecordBatch {
            messages: vec![record],
            fetch_interval: 0x7d,
            ..Default::default()
        };
        batch.encode_to_vec()
    }

    #[test]
    fn brace_framed_http_batch_is_not_taken_for_json() {
        let grab = grab();

        // 18-byte method: rejected by the sniff. 34-byte method: its length
        // byte is `"`, so the sniff accepts it and the batch decode recovers.
        for method in ["WebcastPadMessage1", "WebcastPaddingMessageXXXXXXXXXXXXX"] {
            let bytes = brace_framed_batch(method);
            assert_eq!(&bytes[..2], &[0x0a, 0x7b]);
            assert_eq!(bytes.last(), Some(&0x7d));

            let outcome = grab.ingest(RawFrame::http(PROCESS, bytes));
            assert!(
                matches!(outcome, FrameOutcome::Processed { records: 1, emitted: 0 }),
                "{method}: {outcome:?}"
            );
        }
        assert_eq!(grab.stats().frames_failed, 0);
    }

    #[test]
    fn broken_json_reports_the_json_error() {
        let grab = grab();
        let outcome = grab.ingest(RawFrame::http(PROCESS, b"{\"Type\":1,}".to_vec()));
        assert!(matches!(
            outcome,
            FrameOutcome::Failed(FrameError::Envelope(EnvelopeError::Json(_)))
        ));
    }

    #[test]
    fn json_packs_dedup_by_type_and_id() {
        let grab = grab();
        let events = collect(&grab);

        let pack = |kind: u8, id: i64| {
            format!(
                r#"{{"Type":{kind},"ProcessName":"","Data":"{{\"MsgId\":{id}}}"}}"#
            )
            .into_bytes()
        };

        grab.ingest(RawFrame::http(PROCESS, pack(4, 77)));
        grab.ingest(RawFrame::http(PROCESS, pack(4, 77)));
        grab.ingest(RawFrame::http(PROCESS, pack(9, 77)));
        grab.ingest(RawFrame::http(PROCESS, pack(2, 0)));
        grab.ingest(RawFrame::http(PROCESS, pack(2, 0)));

        let events = events.lock();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].process, PROCESS);
        assert_eq!(events[1].kind(), EventKind::Pack(PackMsgType::LiveEnd));
    }

    #[test]
    fn bad_pack_payload_is_record_failure() {
        let grab = grab();
        let outcome = grab.ingest(RawFrame::http(
            PROCESS,
            br#"{"Type":5,"ProcessName":"p","Data":"{\"GiftId\":\"x\"}"}"#.to_vec(),
        ));

        assert!(matches!(
            outcome,
            FrameOutcome::Processed {
                records: 1,
                emitted: 0
            }
        ));
        assert_eq!(grab.stats().records_failed, 1);
        assert_eq!(grab.stats().frames_failed, 0);
    }

    #[test]
    fn lifecycle_transitions() {
        let grab = BarrageGrab::new(GrabConfig::default().with_process_filter([PROCESS])).unwrap();
        assert_eq!(grab.state(), GrabState::Idle);

        let outcome = grab.ingest(socket_frame(vec![like(1)]));
        assert!(matches!(outcome, FrameOutcome::Dropped(PolicyDrop::Stopped)));

        grab.start().unwrap();
        assert!(grab.is_running());
        assert!(matches!(grab.start(), Err(GrabError::InvalidState(_))));

        grab.dispose();
        grab.dispose();
        assert_eq!(grab.state(), GrabState::Stopped);
        assert!(matches!(grab.start(), Err(GrabError::InvalidState(_))));
    }

    #[test]
    fn dispose_stops_delivery_and_releases_sinks() {
        let capture = Arc::new(ReplayCapture::new());
        let grab = BarrageGrab::builder()
            .with_config(GrabConfig::default().with_process_filter([PROCESS]))
            .with_capture(capture.clone())
            .build()
            .unwrap();
        let events = collect(&grab);

        grab.start().unwrap();
        assert!(capture.push(socket_frame(vec![like(1)])));
        assert_eq!(events.lock().len(), 1);

        grab.dispose();
        assert!(!capture.is_started());
        assert!(!capture.push(socket_frame(vec![like(2)])));
        assert_eq!(grab.dispatcher().sink_count(), 0);

        let outcome = grab.ingest(socket_frame(vec![like(3)]));
        assert!(matches!(outcome, FrameOutcome::Dropped(PolicyDrop::Stopped)));
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn dispose_during_concurrent_ingest() {
        use std::sync::atomic::AtomicBool;

        let grab = grab();
        let events = collect(&grab);
        let disposed = AtomicBool::new(false);
        let ingested = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for worker in 0..4i64 {
                let (grab, disposed, ingested) = (&grab, &disposed, &ingested);
                s.spawn(move || {
                    let mut after_dispose = 0;
                    let mut id = worker * 1_000_000;
                    while after_dispose < 20 {
                        let was_disposed = disposed.load(Ordering::SeqCst);
                        let outcome = grab.ingest(socket_frame(vec![like(id)]));
                        ingested.fetch_add(1, Ordering::SeqCst);
                        if was_disposed {
                            assert!(
                                matches!(outcome, FrameOutcome::Dropped(PolicyDrop::Stopped)),
                                "frame after dispose: {outcome:?}"
                            );
                            after_dispose += 1;
                        }
                        id += 1;
                    }
                });
            }

            while ingested.load(Ordering::SeqCst) < 100 {
                std::thread::yield_now();
            }
            grab.dispose();
            disposed.store(true, Ordering::SeqCst);
        });

        assert_eq!(grab.state(), GrabState::Stopped);
        let delivered = events.lock().len();
        assert!(delivered >= 1);
        assert!(grab.ingest(socket_frame(vec![like(-1)])).is_dropped());
        assert_eq!(events.lock().len(), delivered);
    }

    #[test]
    fn capture_start_failure_leaves_pipeline_idle() {
        struct Failing;

        impl CaptureSource for Failing {
            fn start(&self, _sink: Arc<dyn FrameSink>) -> Result<()> {
                Err(GrabError::Capture("port in use".into()))
            }

            fn stop(&self) {}
        }

        let grab = BarrageGrab::builder()
            .with_capture(Arc::new(Failing))
            .build()
            .unwrap();

        assert!(matches!(grab.start(), Err(GrabError::Capture(_))));
        assert_eq!(grab.state(), GrabState::Idle);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = BarrageGrab::new(GrabConfig::default().with_dedup_capacity(0));
        assert!(matches!(result, Err(GrabError::Config(_))));
    }

    #[test]
    fn replayed_frames_flow_to_sinks() {
        let capture = Arc::new(ReplayCapture::from_frames(vec![
            socket_frame(vec![like(1), gift(2)]),
            RawFrame::http("other", b"{}".to_vec()),
            socket_frame(vec![like(1)]),
        ]));
        let grab = BarrageGrab::builder()
            .with_config(GrabConfig::default().with_process_filter([PROCESS]))
            .with_capture(capture.clone())
            .build()
            .unwrap();
        let events = collect(&grab);

        grab.start().unwrap();
        assert_eq!(capture.replay(), 3);

        assert_eq!(events.lock().len(), 2);
        let stats = grab.stats();
        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn concurrent_ingest_admits_each_id_once() {
        let grab = grab();
        let chats = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&chats);
        grab.dispatcher().on_chat(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let frames: Vec<RawFrame> = (0..50)
            .map(|id| {
                let chat = ChatMessage {
                    content: format!("message {id}"),
                    ..Default::default()
                };
                socket_frame(vec![RawRecord::new(
                    "WebcastChatMessage",
                    id,
                    chat.encode_to_vec(),
                )])
            })
            .collect();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for frame in &frames {
                        grab.ingest(frame.clone());
                    }
                });
            }
        });

        assert_eq!(chats.load(Ordering::SeqCst), 50);
        assert_eq!(grab.stats().duplicates, 150);
    }
}
