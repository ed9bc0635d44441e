use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pcrender_core::{Axis, Point3d};
use pcrender_scene::turntable::generate;
use pcrender_scene::*;

const POINT_COUNTS: [usize; 3] = [1_000, 10_000, 50_000];

/// Points on a Fibonacci sphere of radius 0.5
fn sphere_points(n: usize) -> Vec<Point3d> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).sqrt();
            let theta = golden_angle * i as f64;
            Point3d::new(0.5 * r * theta.cos(), 0.5 * r * theta.sin(), 0.5 * z)
        })
        .collect()
}

fn scene_compile(c: &mut Criterion) {
    let mut g = c.benchmark_group("scene compile");
    g.sample_size(10);

    let policy = ColorPolicy::Height { axis: Axis::Z, palette: Palette::Turbo };
    let compiler = SceneCompiler::default();
    let camera = CameraPose::default().to_scene_fragment();

    for n in POINT_COUNTS {
        let points = sphere_points(n);
        let colors = resolve(&points, None, &policy).unwrap();
        let geometry = SceneGeometryBuilder::new().build(&points, &colors).unwrap();

        g.bench_with_input(BenchmarkId::from_parameter(n), &geometry, |b, geometry| {
            b.iter(|| std::hint::black_box(&compiler).compile(std::hint::black_box(geometry), &camera));
        });
    }

    g.finish();
}

fn turntable_frames(c: &mut Criterion) {
    let points = sphere_points(10_000);
    let colors = resolve(&points, None, &ColorPolicy::Position { palette: Palette::Viridis }).unwrap();
    let geometry = SceneGeometryBuilder::new().build(&points, &colors).unwrap();
    let compiler = SceneCompiler::default();
    let base = CameraPose::parse("2,0,0.5").unwrap();

    let mut g = c.benchmark_group("turntable frames");
    g.sample_size(10);

    for frames in [12, 36] {
        let poses = generate(&base, &OrbitSpec::default(), frames).unwrap();
        g.bench_with_input(BenchmarkId::from_parameter(frames), &poses, |b, poses| {
            b.iter(|| compile_frames(&compiler, &geometry, std::hint::black_box(poses)));
        });
    }

    g.finish();
}

criterion_group!(benches, scene_compile, turntable_frames);
criterion_main!(benches);
