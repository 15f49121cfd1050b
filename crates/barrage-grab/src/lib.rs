//! Barrage Grab - ingestion pipeline for captured live-stream traffic.
//!
//! Receives frames from an interception proxy, decodes them with
//! `barrage-core`, suppresses redelivered messages and hands typed events to
//! registered sinks.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use barrage_grab::{BarrageGrab, GrabConfig, ReplayCapture};
//!
//! # fn main() -> barrage_grab::Result<()> {
//! let capture = Arc::new(ReplayCapture::from_file("session.jsonl")?);
//! let grab = BarrageGrab::builder()
//!     .with_config(GrabConfig::load_or_default()?)
//!     .with_capture(capture.clone())
//!     .build()?;
//!
//! grab.dispatcher().on_chat(|event| {
//!     println!("{}: {}", event.process, event.message.content);
//! });
//!
//! grab.start()?;
//! capture.replay();
//! grab.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! CaptureSource ──RawFrame──► BarrageGrab ──► Dispatcher ──► typed sinks
//!                                 │                    └───► broadcast subscribers
//!                   allow-list · codec · dedup
//! ```

pub mod capture;
pub mod config;
pub mod dispatcher;
mod error;
pub mod event;
pub mod filter;
mod grabber;
mod stats;

pub use capture::{CaptureSource, FrameSink, FrameSource, RawFrame, ReplayCapture};
pub use config::GrabConfig;
pub use dispatcher::{Dispatcher, EventSink, DEFAULT_CHANNEL_CAPACITY};
pub use error::{GrabError, Result};
pub use event::{EventKind, EventPayload, EventRecord, GrabEvent, RoomEvent};
pub use filter::{AllowList, ProcessFilter, DEFAULT_PROCESSES};
pub use grabber::{BarrageGrab, BarrageGrabBuilder, FrameOutcome, GrabState};
pub use stats::{GrabStats, StatsSnapshot};
