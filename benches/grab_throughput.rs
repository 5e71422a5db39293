//! Benchmarks for the frame grab paths
//!
//! Run with: cargo bench

use camgrab_rs::buffer::ImageBuffer;
use camgrab_rs::{CameraSession, MockCamera, MockDevice, PixelFormat};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(100);

fn grabbing_session(width: i64, height: i64, format: PixelFormat) -> CameraSession<MockCamera> {
    let camera = MockCamera::new().with_device(
        MockDevice::gige("BENCH-1", "BenchCam", [10, 0, 0, 2]).with_sensor(width, height, format),
    );
    let mut session = CameraSession::new(camera);
    session.open(0).expect("open");
    session.start_grabbing().expect("start");
    session
}

fn bench_converted_grab(c: &mut Criterion) {
    let mut group = c.benchmark_group("grab_converted");

    for &(width, height) in [(320i64, 240i64), (640, 480), (1280, 1024)].iter() {
        let label = format!("{}x{}", width, height);
        group.throughput(Throughput::Bytes((width * height * 3) as u64));

        // Source already in the target format: plain copy, no conversion
        let mut direct = grabbing_session(width, height, PixelFormat::Bgr8);
        group.bench_with_input(
            BenchmarkId::new("fast_path", &label),
            &TIMEOUT,
            |b, &timeout| {
                b.iter(|| {
                    let grab = direct.grab_converted(timeout).expect("grab");
                    black_box(grab.frame().map(|f| f.len()))
                });
            },
        );

        // Monochrome source goes through the driver converter
        let mut mono = grabbing_session(width, height, PixelFormat::Mono8);
        group.bench_with_input(
            BenchmarkId::new("mono_to_bgr", &label),
            &TIMEOUT,
            |b, &timeout| {
                b.iter(|| {
                    let grab = mono.grab_converted(timeout).expect("grab");
                    black_box(grab.frame().map(|f| f.len()))
                });
            },
        );

        // Bayer source, the common wire format for color GigE cameras
        let mut bayer = grabbing_session(width, height, PixelFormat::BayerBG8);
        group.bench_with_input(
            BenchmarkId::new("bayer_to_bgr", &label),
            &TIMEOUT,
            |b, &timeout| {
                b.iter(|| {
                    let grab = bayer.grab_converted(timeout).expect("grab");
                    black_box(grab.frame().map(|f| f.len()))
                });
            },
        );
    }

    group.finish();
}

fn bench_raw_grab(c: &mut Criterion) {
    let mut group = c.benchmark_group("grab_raw");

    for &(width, height) in [(640i64, 480i64), (1280, 1024)].iter() {
        let label = format!("{}x{}", width, height);
        group.throughput(Throughput::Bytes((width * height) as u64));

        let mut session = grabbing_session(width, height, PixelFormat::Mono8);
        group.bench_with_input(
            BenchmarkId::new("mono8", &label),
            &TIMEOUT,
            |b, &timeout| {
                b.iter(|| {
                    let grab = session.grab_raw(timeout).expect("grab");
                    black_box(grab.frame().map(|f| f.len()))
                });
            },
        );
    }

    group.finish();
}

fn bench_buffer_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion_buffer");

    let payload = vec![0x5Au8; 1280 * 1024];

    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("store_steady_state", |b| {
        let mut buffer = ImageBuffer::new();
        buffer.ensure(payload.len());
        b.iter(|| black_box(buffer.store(&payload).len()));
    });

    group.bench_function("ensure_when_already_grown", |b| {
        let mut buffer = ImageBuffer::new();
        buffer.ensure(payload.len());
        b.iter(|| black_box(buffer.ensure(64).len()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_converted_grab,
    bench_raw_grab,
    bench_buffer_reuse,
);

criterion_main!(benches);
