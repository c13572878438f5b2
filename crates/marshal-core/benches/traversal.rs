use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use marshal_core::{Describe, Marshaller, TypeDescriptor};

#[derive(Default, Clone)]
struct Sample {
    id: u64,
    label: String,
    values: Vec<f64>,
    children: Vec<Sample>,
}

impl Describe for Sample {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::structure::<Self>()
            .field("id", |s: &Sample| &s.id, |s: &mut Sample, v| s.id = v)
            .field("label", |s: &Sample| &s.label, |s: &mut Sample, v| s.label = v)
            .field("values", |s: &Sample| &s.values, |s: &mut Sample, v| s.values = v)
            .field("children", |s: &Sample| &s.children, |s: &mut Sample, v| s.children = v)
            .default_factory()
            .build()
    }
}

fn sample_tree(width: usize) -> Sample {
    let leaf = |id: u64| Sample {
        id,
        label: format!("leaf-{id}"),
        values: (0..16).map(|i| i as f64 * 0.5).collect(),
        children: Vec::new(),
    };
    Sample {
        id: 0,
        label: "root".to_string(),
        values: Vec::new(),
        children: (0..width as u64).map(leaf).collect(),
    }
}

fn bench_primitive_arrays(c: &mut Criterion) {
    let fast = Marshaller::new();
    let slow = Marshaller::builder().native_fast_path(false).build();

    let mut group = c.benchmark_group("primitive_array");
    for size in [64usize, 4096] {
        let data: Vec<i32> = (0..size as i32).collect();
        group.bench_with_input(BenchmarkId::new("fast_path", size), &data, |b, data| {
            b.iter(|| fast.serialize(std::hint::black_box(data)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("general_path", size), &data, |b, data| {
            b.iter(|| slow.serialize(std::hint::black_box(data)).unwrap())
        });
    }
    group.finish();
}

fn bench_object_graph(c: &mut Criterion) {
    let engine = Marshaller::new();
    let sample = sample_tree(256);
    let tree = engine.serialize(&sample).unwrap();

    let mut group = c.benchmark_group("object_graph");
    group.bench_function("serialize", |b| {
        b.iter(|| engine.serialize(std::hint::black_box(&sample)).unwrap())
    });
    group.bench_function("deserialize", |b| {
        b.iter(|| engine.deserialize::<Sample>(std::hint::black_box(&tree)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_primitive_arrays, bench_object_graph);
criterion_main!(benches);
