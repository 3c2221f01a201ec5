//! Integration tests for PacketCodec with Tokio streams.
//!
//! The host side reads decisions through `FramedRead` while a raw peer plays
//! the peripheral, mirroring how the session read loop consumes the link.

use futures::{SinkExt, StreamExt};
use mfalink_core::Error;
use mfalink_protocol::{BiometricToken, Packet, PacketCodec};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio_util::codec::{FramedRead, FramedWrite};

/// Host halves (decision reader, packet writer) plus the raw peripheral end.
fn create_link(
    buffer_size: usize,
) -> (
    FramedRead<tokio::io::ReadHalf<DuplexStream>, PacketCodec>,
    FramedWrite<tokio::io::WriteHalf<DuplexStream>, PacketCodec>,
    DuplexStream,
) {
    let (host, peripheral) = tokio::io::duplex(buffer_size);
    let (reader, writer) = tokio::io::split(host);
    (
        FramedRead::new(reader, PacketCodec::new()),
        FramedWrite::new(writer, PacketCodec::new()),
        peripheral,
    )
}

#[tokio::test]
async fn test_auth_packet_reaches_peripheral() {
    let (_reader, mut writer, peripheral) = create_link(1024);

    writer
        .send(Packet::Auth(BiometricToken::Ok))
        .await
        .unwrap();

    let mut lines = BufReader::new(peripheral).lines();
    let line = lines.next_line().await.unwrap().unwrap();
    assert_eq!(line, r#"{"biometric":"ok"}"#);
    assert_eq!(Packet::parse(&line), Some(Packet::Auth(BiometricToken::Ok)));
}

#[tokio::test]
async fn test_peripheral_response_decoded() {
    let (mut reader, _writer, mut peripheral) = create_link(1024);

    peripheral
        .write_all(b"{\"result\":\"allow\",\"session_id\":7}\r\n")
        .await
        .unwrap();

    let decision = reader.next().await.unwrap().unwrap();
    assert_eq!(decision.session_id(), Some("7"));
    assert!(decision.is_allowed());
    assert_eq!(decision.display_result(), "Access granted");
}

#[tokio::test]
async fn test_response_split_across_writes() {
    let (mut reader, _writer, mut peripheral) = create_link(1024);

    let task = tokio::spawn(async move {
        let chunks: [&[u8]; 4] = [b"{\"res", b"ult\":\"de", b"ny\"}", b"\n"];
        for chunk in chunks {
            peripheral.write_all(chunk).await.unwrap();
            peripheral.flush().await.unwrap();
            tokio::task::yield_now().await;
        }
        peripheral
    });

    let decision = reader.next().await.unwrap().unwrap();
    assert_eq!(decision.result(), "deny");
    assert!(!decision.is_allowed());
    drop(task.await.unwrap());
}

#[tokio::test]
async fn test_end_of_stream_flushes_partial_line_then_ends() {
    let (mut reader, _writer, mut peripheral) = create_link(1024);

    peripheral.write_all(b"OK+CONN\nlast words").await.unwrap();
    drop(peripheral);

    let first = reader.next().await.unwrap().unwrap();
    assert_eq!(first.raw_body(), "OK+CONN");

    let second = reader.next().await.unwrap().unwrap();
    assert_eq!(second.raw_body(), "last words");
    assert_eq!(second.result(), "deny");

    assert!(reader.next().await.is_none());
}

#[tokio::test]
async fn test_oversized_line_is_an_error() {
    let (host, mut peripheral) = tokio::io::duplex(1024);
    let mut reader = FramedRead::new(host, PacketCodec::with_max_line_length(16));

    peripheral.write_all(&[b'x'; 64]).await.unwrap();

    let err = reader.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::LineTooLong { max_length: 16, .. }));
}

#[tokio::test]
async fn test_probe_and_auth_in_sequence() {
    let (_reader, mut writer, peripheral) = create_link(1024);

    writer.send(Packet::Probe).await.unwrap();
    writer
        .send(Packet::Auth(BiometricToken::Fail))
        .await
        .unwrap();

    let mut lines = BufReader::new(peripheral).lines();
    assert_eq!(
        Packet::parse(&lines.next_line().await.unwrap().unwrap()),
        Some(Packet::Probe)
    );
    assert_eq!(
        Packet::parse(&lines.next_line().await.unwrap().unwrap()),
        Some(Packet::Auth(BiometricToken::Fail))
    );
}
