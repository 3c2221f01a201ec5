//! Tokio codec for the newline-delimited JSON packet protocol.
//!
//! `PacketCodec` plugs the line protocol into Tokio's `FramedRead` /
//! `FramedWrite`:
//! - [`Decoder`]: splits the peripheral byte stream into lines and decodes
//!   each one into a [`Decision`]
//! - [`Encoder<Packet>`]: writes a host [`Packet`] followed by `\n`
//!
//! # Usage
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use mfalink_protocol::{BiometricToken, Packet, PacketCodec};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//!
//! # async fn example() -> mfalink_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:7000").await?;
//! let mut framed = Framed::new(stream, PacketCodec::new());
//!
//! framed.send(Packet::Auth(BiometricToken::Ok)).await?;
//! if let Some(Ok(decision)) = framed.next().await {
//!     println!("{}", decision.display_result());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Line handling
//!
//! - A trailing `\r` is stripped (HC-05 firmware often sends CRLF).
//! - Invalid UTF-8 is replaced lossily, so the line still degrades to a
//!   deny decision instead of killing the read loop.
//! - Blank lines decode to [`Decision::no_data`].
//! - A final line without terminator is emitted at end of stream.
//! - Lines longer than the maximum are rejected with
//!   [`Error::LineTooLong`].

use bytes::{BufMut, BytesMut};
use mfalink_core::{
    Error, Result,
    constants::{DEFAULT_MAX_LINE_LENGTH, LINE_TERMINATOR},
};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Decision, Packet, decode};

/// Line codec producing [`Decision`]s and consuming [`Packet`]s.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    /// Maximum accepted line length in bytes, terminator excluded.
    max_line_length: usize,

    /// Offset already scanned for a terminator, so partial lines are not
    /// rescanned on every read.
    next_index: usize,
}

impl PacketCodec {
    /// Create a codec with the default 4 KiB line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn take_line(&mut self, buf: &mut BytesMut, end: usize) -> Result<Decision> {
        let frame = buf.split_to(end);
        self.next_index = 0;

        let mut bytes = &frame[..];
        if let Some((&LINE_TERMINATOR, rest)) = bytes.split_last() {
            bytes = rest;
        }
        if let Some((&b'\r', rest)) = bytes.split_last() {
            bytes = rest;
        }

        if bytes.len() > self.max_line_length {
            return Err(Error::LineTooLong {
                length: bytes.len(),
                max_length: self.max_line_length,
            });
        }

        let line = String::from_utf8_lossy(bytes);
        Ok(decode(Some(&line)))
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = Decision;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Decision>> {
        let scan_from = self.next_index.min(src.len());
        match src[scan_from..]
            .iter()
            .position(|byte| *byte == LINE_TERMINATOR)
        {
            Some(offset) => {
                let end = scan_from + offset + 1;
                self.take_line(src, end).map(Some)
            }
            None => {
                // +1 leaves room for a trailing '\r'
                if src.len() > self.max_line_length + 1 {
                    return Err(Error::LineTooLong {
                        length: src.len(),
                        max_length: self.max_line_length,
                    });
                }
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Decision>> {
        if let Some(decision) = self.decode(src)? {
            return Ok(Some(decision));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let end = src.len();
        self.take_line(src, end).map(Some)
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = Error;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<()> {
        let payload = packet.encode();
        dst.reserve(payload.len() + 1);
        dst.put_slice(payload.as_bytes());
        dst.put_u8(LINE_TERMINATOR);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BiometricToken;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&b"{\"result\":\"allow\",\"session_id\":7}\n"[..]);

        let decision = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decision.session_id(), Some("7"));
        assert!(decision.is_allowed());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_then_complete() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&b"{\"result\":"[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(codec.next_index, buf.len());

        buf.extend_from_slice(b"\"allow\"}\r\n");
        let decision = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decision.result(), "allow");
        assert_eq!(codec.next_index, 0);
    }

    #[test]
    fn test_decode_multiple_lines_in_one_read() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&b"OK+CONN\n{\"result\":\"deny\"}\n"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.raw_body(), "OK+CONN");

        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.result(), "deny");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_blank_line_is_no_data() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&b"\r\n"[..]);

        let decision = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decision, Decision::no_data());
    }

    #[test]
    fn test_decode_invalid_utf8_degrades() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&b"\xff\xfeAT\n"[..]);

        let decision = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decision.result(), "deny");
        assert!(decision.raw_body().ends_with("AT"));
    }

    #[test]
    fn test_decode_eof_emits_unterminated_line() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&b"{\"result\":\"allow\"}"[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        let decision = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert!(decision.is_allowed());
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_oversized_line() {
        let mut codec = PacketCodec::with_max_line_length(8);
        let mut buf = BytesMut::from(&b"0123456789"[..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, Error::LineTooLong { max_length: 8, .. }));
    }

    #[test]
    fn test_decode_rejects_oversized_terminated_line() {
        let mut codec = PacketCodec::with_max_line_length(4);
        let mut buf = BytesMut::from(&b"abcdef\n"[..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, Error::LineTooLong { length: 6, .. }));
    }

    #[test]
    fn test_encode_appends_terminator() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(Packet::Auth(BiometricToken::Fail), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"{\"biometric\":\"fail\"}\n");
    }
}
