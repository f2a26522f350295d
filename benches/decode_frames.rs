/// Benchmarks for the inbound hot path: splitting the TCP byte stream into frames,
/// decoding envelopes and routing them through the handler registry.
use bytes::{BufMut as _, BytesMut};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio_util::codec::Decoder as _;
use trading_bridge_sdk::stream::{Envelope, HandlerRegistry, MessageType, Position, Tick};
use trading_bridge_sdk::transport::{Dispatcher as _, Encoding, FrameCodec, Framing};

const MAX_FRAME: usize = 1024 * 1024;

const TICK_MSG: &str = r#"{"status":"ok","type":"tick","payload":[{"symbol":"EURUSD","ask":"1.08461","bid":"1.08452","last":"1.08455","volume":120,"time":1753314064213},{"symbol":"XAUUSD","ask":"2391.85","bid":"2391.42","last":"2391.60","volume":4,"time":1753314064214}],"timestamp":1753314064215}"#;

const POSITION_MSG: &str = r#"{"status":"ok","type":"position","payload":[{"position":800123,"login":51002,"symbol":"EURUSD","action":0,"volume":"1.5","price_open":"1.08112","price_current":"1.08452","sl":"1.07500","tp":"1.09500","profit":"510.00","time":1753314060000}],"timestamp":1753314064215}"#;

fn frames(framing: Framing, message: &str, count: usize) -> BytesMut {
    let mut buf = BytesMut::new();
    for _ in 0..count {
        match framing {
            Framing::LengthPrefixed => {
                buf.put_u32(u32::try_from(message.len()).expect("frame fits in u32"));
                buf.put_slice(message.as_bytes());
            }
            _ => {
                buf.put_slice(message.as_bytes());
                buf.put_u8(b'\n');
            }
        }
    }
    buf
}

fn bench_frame_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("transport/frame_codec");
    let batch = 64;

    for framing in [Framing::Lines, Framing::LengthPrefixed] {
        let input = frames(framing, TICK_MSG, batch);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("decode_batch", format!("{framing:?}")),
            &input,
            |b, input| {
                b.iter(|| {
                    let mut codec = FrameCodec::new(framing, MAX_FRAME);
                    let mut buf = input.clone();
                    let mut decoded = 0_usize;
                    while let Some(frame) = codec
                        .decode(std::hint::black_box(&mut buf))
                        .expect("Decoding should succeed")
                    {
                        decoded += frame.len();
                    }
                    std::hint::black_box(decoded);
                });
            },
        );
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream/envelope");

    group.throughput(Throughput::Bytes(TICK_MSG.len() as u64));
    group.bench_function("Envelope::tick", |b| {
        b.iter(|| {
            let _: Envelope = serde_json::from_str(std::hint::black_box(TICK_MSG))
                .expect("Deserialization should succeed");
        });
    });

    group.throughput(Throughput::Bytes(POSITION_MSG.len() as u64));
    group.bench_function("Envelope::position", |b| {
        b.iter(|| {
            let _: Envelope = serde_json::from_str(std::hint::black_box(POSITION_MSG))
                .expect("Deserialization should succeed");
        });
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream/dispatch");

    let registry = HandlerRegistry::new();
    registry.register_typed_handler(MessageType::Tick, |ticks: Vec<Tick>| {
        std::hint::black_box(ticks);
        Ok(())
    });
    registry.register_typed_handler(MessageType::Position, |positions: Vec<Position>| {
        std::hint::black_box(positions);
        Ok(())
    });
    registry.register_handler(MessageType::Heartbeat, |envelope| {
        std::hint::black_box(envelope);
        Ok(())
    });

    for (name, message) in [("tick", TICK_MSG), ("position", POSITION_MSG)] {
        group.throughput(Throughput::Bytes(message.len() as u64));
        group.bench_with_input(BenchmarkId::new("typed/json", name), message, |b, message| {
            b.iter(|| {
                registry
                    .dispatch(std::hint::black_box(message.as_bytes()), Encoding::Json)
                    .expect("Dispatch should succeed");
            });
        });

        let envelope: Envelope = serde_json::from_str(message).expect("valid envelope");
        let binary = Encoding::MsgpackSnappy
            .encode(&envelope)
            .expect("Encoding should succeed");
        group.throughput(Throughput::Bytes(binary.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("typed/msgpack_snappy", name),
            &binary,
            |b, binary| {
                b.iter(|| {
                    registry
                        .dispatch(std::hint::black_box(binary), Encoding::MsgpackSnappy)
                        .expect("Dispatch should succeed");
                });
            },
        );
    }

    let heartbeat = r#"{"status":"ok","type":"heartbeat","payload":{},"timestamp":1753314064215}"#;
    group.throughput(Throughput::Bytes(heartbeat.len() as u64));
    group.bench_function("raw/heartbeat", |b| {
        b.iter(|| {
            registry
                .dispatch(std::hint::black_box(heartbeat.as_bytes()), Encoding::Json)
                .expect("Dispatch should succeed");
        });
    });

    group.finish();
}

criterion_group!(benches, bench_frame_codec, bench_envelope, bench_dispatch);
criterion_main!(benches);
