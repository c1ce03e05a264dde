//! Length-delimited frame decoding for the log stream
//!
//! The stream is a sequence of frames, each a 4-byte big-endian length prefix
//! followed by that many bytes of protobuf-encoded record. A corrupt frame is
//! reported as a recoverable error; the caller resets the decoder and keeps
//! reading from the same stream.

use crate::errors::{ForwarderError, Result};
use crate::record::LogRecord;
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on an accepted frame, guarding against corrupt length prefixes.
pub const MAX_FRAME_LEN: usize = 1_000_000;

/// Incremental decoder over a raw byte stream.
#[derive(Debug)]
pub struct FrameDecoder<R> {
    stream: R,
    resets: u64,
}

impl<R: AsyncRead + Unpin> FrameDecoder<R> {
    pub fn new(stream: R) -> Self {
        Self { stream, resets: 0 }
    }

    /// Read the next complete record.
    ///
    /// Returns `Ok(None)` on a clean end of stream (EOF at a frame boundary).
    /// Any other failure — truncated prefix, oversized or truncated payload,
    /// malformed record bytes — is a recoverable [`ForwarderError::FrameDecode`];
    /// the caller should [`reset`](Self::reset) and continue.
    pub async fn next_record(&mut self) -> Result<Option<LogRecord>> {
        let mut prefix = [0u8; 4];

        // EOF is only clean if it lands exactly on a frame boundary.
        let n = self
            .stream
            .read(&mut prefix[..1])
            .await
            .map_err(|e| ForwarderError::FrameDecode(format!("error reading length prefix: {}", e)))?;
        if n == 0 {
            return Ok(None);
        }

        self.stream
            .read_exact(&mut prefix[1..])
            .await
            .map_err(|e| ForwarderError::FrameDecode(format!("truncated length prefix: {}", e)))?;

        let len = u32::from_be_bytes(prefix) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ForwarderError::FrameDecode(format!(
                "frame length {} exceeds maximum of {}",
                len, MAX_FRAME_LEN
            )));
        }

        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(|e| ForwarderError::FrameDecode(format!("truncated frame payload: {}", e)))?;

        let record = LogRecord::decode(payload.as_slice())
            .map_err(|e| ForwarderError::FrameDecode(format!("malformed record: {}", e)))?;

        Ok(Some(record))
    }

    /// Resynchronize after a decode error.
    ///
    /// Discards any in-flight frame state; the next read starts at the
    /// stream's current position.
    pub fn reset(&mut self) {
        self.resets += 1;
    }

    /// Number of resets performed so far.
    pub fn resets(&self) -> u64 {
        self.resets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(payload: &[u8]) -> LogRecord {
        LogRecord {
            source: "stdout".to_string(),
            time_nano: 1_700_000_000_000_000_000,
            line: payload.to_vec(),
            partial: false,
        }
    }

    fn frame(record: &LogRecord) -> Vec<u8> {
        let mut body = Vec::new();
        record.encode(&mut body).unwrap();
        let mut framed = (body.len() as u32).to_be_bytes().to_vec();
        framed.extend_from_slice(&body);
        framed
    }

    #[tokio::test]
    async fn test_decodes_frames_in_order() {
        let mut stream = Vec::new();
        stream.extend(frame(&record(b"first")));
        stream.extend(frame(&record(b"second")));

        let mut decoder = FrameDecoder::new(Cursor::new(stream));

        assert_eq!(decoder.next_record().await.unwrap().unwrap().line, b"first");
        assert_eq!(decoder.next_record().await.unwrap().unwrap().line, b"second");
        assert!(decoder.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_at_boundary_is_clean() {
        let mut decoder = FrameDecoder::new(Cursor::new(Vec::new()));
        assert!(decoder.next_record().await.unwrap().is_none());
        assert_eq!(decoder.resets(), 0);
    }

    #[tokio::test]
    async fn test_oversized_length_then_resync() {
        let mut stream = vec![0xFF, 0xFF, 0xFF, 0xFF];
        stream.extend(frame(&record(b"after")));

        let mut decoder = FrameDecoder::new(Cursor::new(stream));

        let err = decoder.next_record().await.unwrap_err();
        assert!(matches!(err, ForwarderError::FrameDecode(_)));

        decoder.reset();
        assert_eq!(decoder.resets(), 1);

        // The corrupt prefix was consumed, so the stream is back on a
        // frame boundary and decoding continues.
        assert_eq!(decoder.next_record().await.unwrap().unwrap().line, b"after");
        assert!(decoder.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_recoverable_error() {
        let mut stream = frame(&record(b"cut short"));
        stream.truncate(stream.len() - 3);

        let mut decoder = FrameDecoder::new(Cursor::new(stream));

        let err = decoder.next_record().await.unwrap_err();
        assert!(matches!(err, ForwarderError::FrameDecode(_)));

        // After resync the stream is exhausted and terminates cleanly.
        decoder.reset();
        assert!(decoder.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_garbage_payload_is_recoverable_error() {
        let body = vec![0x07u8; 16];
        let mut stream = (body.len() as u32).to_be_bytes().to_vec();
        stream.extend(body);

        let mut decoder = FrameDecoder::new(Cursor::new(stream));

        let err = decoder.next_record().await.unwrap_err();
        assert!(matches!(err, ForwarderError::FrameDecode(_)));
    }
}
