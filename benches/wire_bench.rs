//! Benchmarks for the device wire formats.
//!
//! The DMX pump re-encodes the whole universe up to 44 times a second and
//! codec sessions parse every reply line, so both paths stay on the hot list.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench wire_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use roomctl_network::{DmxFrame, TelnetLineCodec};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

/// A reply stream as a DSP sends it right after connect.
fn banner_and_replies(replies: usize) -> Vec<u8> {
    let mut stream = b"\xff\xfb\x01\xff\xfb\x03\xff\xfd\x18Welcome to the Tesira Text Protocol Server...\r\n"
        .to_vec();
    for i in 0..replies {
        stream.extend_from_slice(format!("+OK \"value\":{}.000000\r\n", i % 100).as_bytes());
    }
    stream
}

fn bench_decode_replies(c: &mut Criterion) {
    let mut group = c.benchmark_group("telnet_decode");

    for replies in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*replies as u64 + 1));
        let stream = banner_and_replies(*replies);

        group.bench_with_input(BenchmarkId::from_parameter(replies), replies, |b, _| {
            b.iter(|| {
                let mut codec = TelnetLineCodec::new();
                let mut buffer = BytesMut::from(&stream[..]);
                let mut count = 0;
                while let Ok(Some(line)) = codec.decode(&mut buffer) {
                    black_box(line);
                    count += 1;
                }
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Replies arriving a few bytes at a time.
fn bench_decode_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("telnet_decode_chunked");
    group.throughput(Throughput::Elements(1));
    let stream = banner_and_replies(1);

    for chunk_size in [4, 16, 64].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("chunk_{chunk_size}_bytes")),
            chunk_size,
            |b, &size| {
                b.iter(|| {
                    let mut codec = TelnetLineCodec::new();
                    let mut buffer = BytesMut::new();
                    let mut lines = 0;
                    for chunk in stream.chunks(size) {
                        buffer.extend_from_slice(chunk);
                        while let Ok(Some(line)) = codec.decode(&mut buffer) {
                            black_box(line);
                            lines += 1;
                        }
                    }
                    black_box(lines);
                });
            },
        );
    }

    group.finish();
}

fn bench_encode_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("telnet_encode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_command", |b| {
        b.iter(|| {
            let mut codec = TelnetLineCodec::new();
            let mut buffer = BytesMut::new();
            codec
                .encode(
                    black_box("VideoCamera1 set pan 0.250000".to_string()),
                    &mut buffer,
                )
                .unwrap();
            black_box(buffer);
        });
    });

    group.finish();
}

fn bench_dmx_packet(c: &mut Criterion) {
    let mut group = c.benchmark_group("dmx");
    group.throughput(Throughput::Bytes(512));

    let mut frame = DmxFrame::new();
    for fixture in 0..32 {
        frame
            .set_channels(fixture * 4 + 1, &[255, 128, 64, 32])
            .unwrap();
    }

    group.bench_function("enttec_packet", |b| {
        b.iter(|| black_box(black_box(&frame).to_enttec_packet()));
    });

    group.bench_function("render_fixtures", |b| {
        b.iter(|| {
            let mut frame = DmxFrame::new();
            for fixture in 0..128 {
                frame
                    .set_channels(black_box(fixture * 4 + 1), &[200, 100, 0, 50])
                    .unwrap();
            }
            black_box(frame);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_replies,
    bench_decode_chunked,
    bench_encode_commands,
    bench_dmx_packet,
);

criterion_main!(benches);
