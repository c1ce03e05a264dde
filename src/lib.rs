//! Redis Log Forwarder Library
//!
//! This library provides components for consuming length-delimited container
//! log streams and forwarding each record, as a structured JSON line, onto a
//! Redis list.

pub mod config;
pub mod errors;
pub mod framing;
pub mod line;
pub mod record;
pub mod registry;
pub mod store;
pub mod worker;

pub use config::StoreConfig;
pub use errors::{ForwarderError, Result};
pub use framing::FrameDecoder;
pub use line::{LogLine, TargetContext, TargetInfo};
pub use record::LogRecord;
pub use registry::Registry;
pub use store::{LineSink, StoreClient};
pub use worker::Worker;
