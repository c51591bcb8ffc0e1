use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docvis_harris::{HarrisConfig, HarrisDetector};
use image::{GrayImage, Luma};

/// Benchmark page with a grid of bright squares on a textured background
fn create_benchmark_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let cell = (x / 32 + y / 32) % 2 == 0;
        let inside = x % 32 > 8 && x % 32 < 24 && y % 32 > 8 && y % 32 < 24;
        if cell && inside {
            Luma([220])
        } else {
            Luma([40 + ((x + y) % 7) as u8])
        }
    })
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("harris_detect");
    for &(w, h) in &[(256u32, 256u32), (640, 480), (1024, 768)] {
        let img = create_benchmark_image(w, h);
        let detector = HarrisDetector::new(HarrisConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", w, h)), &img, |b, img| {
            b.iter(|| detector.detect(black_box(img)).unwrap())
        });
    }
    group.finish();
}

fn bench_window_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("harris_offset");
    let img = create_benchmark_image(640, 480);
    for offset in [2usize, 5, 9] {
        let cfg = HarrisConfig {
            offset,
            ..HarrisConfig::default()
        };
        let detector = HarrisDetector::new(cfg).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(offset), &img, |b, img| {
            b.iter(|| detector.response_map(black_box(img)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detect, bench_window_sizes);
criterion_main!(benches);
