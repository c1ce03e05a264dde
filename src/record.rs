//! Wire format of a single log record as it appears inside a frame
//!
//! Field numbers match the daemon's protobuf log entry, so streams written by
//! the logging daemon decode without translation.

/// One raw log record: a payload plus its stream source and timestamp.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogRecord {
    /// Originating stream, `"stdout"` or `"stderr"`
    #[prost(string, tag = "1")]
    pub source: ::prost::alloc::string::String,

    /// Timestamp in nanoseconds since the Unix epoch
    #[prost(int64, tag = "2")]
    pub time_nano: i64,

    /// Raw payload bytes, passed through uninterpreted
    #[prost(bytes = "vec", tag = "3")]
    pub line: ::prost::alloc::vec::Vec<u8>,

    /// Set when the record is a fragment of a longer line
    #[prost(bool, tag = "4")]
    pub partial: bool,
}
