//! Performance benchmarks for PacketCodec.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mfalink_protocol::{BiometricToken, Packet, PacketCodec, decode};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

const ALLOW_RESPONSE: &[u8] = b"{\"result\":\"allow\",\"session_id\":7}\r\n";
const RAW_RESPONSE: &[u8] = b"OK+CONN\r\n";

/// Benchmark encoding an auth packet.
fn bench_encode_auth(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_auth");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode_auth_packet", |b| {
        b.iter(|| {
            let mut codec = PacketCodec::new();
            let mut buffer = BytesMut::new();
            codec
                .encode(black_box(Packet::Auth(BiometricToken::Ok)), &mut buffer)
                .unwrap();
            black_box(buffer);
        });
    });

    group.finish();
}

/// Benchmark decoding a JSON decision and a raw fallback line.
fn bench_decode_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_response");
    group.throughput(Throughput::Elements(1));

    for (name, line) in [("json", ALLOW_RESPONSE), ("raw", RAW_RESPONSE)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &line, |b, line| {
            b.iter(|| {
                let mut codec = PacketCodec::new();
                let mut buffer = BytesMut::from(*line);
                black_box(codec.decode(&mut buffer).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark the pure decision parser without framing.
fn bench_decode_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_line");
    group.throughput(Throughput::Elements(1));

    group.bench_function("decode_allow_line", |b| {
        b.iter(|| black_box(decode(black_box(Some(r#"{"result":"allow","session_id":7}"#)))));
    });

    group.finish();
}

/// Benchmark decoding many responses from one buffer.
fn bench_decode_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_batch");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));

        let encoded = ALLOW_RESPONSE.repeat(*batch_size);

        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, _| {
                b.iter(|| {
                    let mut codec = PacketCodec::new();
                    let mut buffer = BytesMut::from(&encoded[..]);
                    let mut count = 0;

                    while let Ok(Some(_)) = codec.decode(&mut buffer) {
                        count += 1;
                    }

                    black_box(count);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark decoding a response that arrives in small chunks, as it does
/// from an HC-05 module at 9600 baud.
fn bench_decode_partial_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_partial_streaming");
    group.throughput(Throughput::Elements(1));

    for chunk_size in [1, 4, 16].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("chunk_{}_bytes", chunk_size)),
            chunk_size,
            |b, &size| {
                b.iter(|| {
                    let mut codec = PacketCodec::new();
                    let mut buffer = BytesMut::new();
                    let mut result = None;

                    for chunk in ALLOW_RESPONSE.chunks(size) {
                        buffer.extend_from_slice(chunk);
                        if let Ok(Some(decision)) = codec.decode(&mut buffer) {
                            result = Some(decision);
                            break;
                        }
                    }

                    black_box(result);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_auth,
    bench_decode_response,
    bench_decode_line,
    bench_decode_batch,
    bench_decode_partial_streaming,
);

criterion_main!(benches);
