use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;
use zrelay::{
    network::{FrameReader, FrameWriter, DEFAULT_MAX_FRAME_LEN},
    Frame,
};

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame::compose");
    for size in [16usize, 1024, 64 * 1024] {
        let payload = vec![7u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| Frame::compose(black_box(b"topic:"), black_box(payload)))
        });
    }
    group.finish();
}

fn bench_write_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("frame write+read");

    for size in [16usize, 1024, 64 * 1024] {
        let frame = Frame::from(bytes::Bytes::from(vec![1u8; size]));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.to_async(&rt).iter(|| async {
                let (client, server) = tokio::io::duplex(2 * size + 64);
                let mut writer = FrameWriter::new(client);
                let mut reader = FrameReader::new(server, DEFAULT_MAX_FRAME_LEN);
                writer.write_frame(frame).await.unwrap();
                black_box(reader.read_frame().await.unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compose, bench_write_read);
criterion_main!(benches);
