use criterion::{Criterion, black_box, criterion_group, criterion_main};

use poidex::rtree::SpatialIndex;
use poidex::shape::Rect;

struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (self.0 >> 33) as u32
    }
}

fn random_points(count: usize, seed: u64) -> Vec<(Rect, u64)> {
    let mut rng = Lcg(seed);
    (0..count as u64)
        .map(|id| {
            let x = rng.next_u32() % 360_000_000;
            let y = rng.next_u32() % 180_000_000;
            (Rect::point(x, y), id)
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let points = random_points(10_000, 1);
    c.bench_function("insert_10k_points", |b| {
        b.iter(|| {
            let mut index: SpatialIndex<u64, Rect> = SpatialIndex::new(32, 2);
            for &(shape, id) in &points {
                index.insert(black_box(shape), black_box(id));
            }
            black_box(index.len())
        });
    });
}

fn bench_pack_insert(c: &mut Criterion) {
    let points = random_points(10_000, 2);
    c.bench_function("pack_10k_points", |b| {
        b.iter(|| {
            let mut index: SpatialIndex<u64, Rect> = SpatialIndex::new(32, 2);
            index.pack_insert(points.clone()).unwrap();
            black_box(index.len())
        });
    });
}

fn bench_query(c: &mut Criterion) {
    let points = random_points(100_000, 3);
    let mut index: SpatialIndex<u64, Rect> = SpatialIndex::new(32, 2);
    index.pack_insert(points).unwrap();

    let mut rng = Lcg(4);
    let queries: Vec<Rect> = (0..256)
        .map(|_| {
            let x = rng.next_u32() % 350_000_000;
            let y = rng.next_u32() % 170_000_000;
            Rect::new(x, y, x + 5_000_000, y + 5_000_000)
        })
        .collect();

    c.bench_function("query_rect_100k_index", |b| {
        let mut at = 0usize;
        b.iter(|| {
            let query = &queries[at % queries.len()];
            at += 1;
            black_box(index.find(black_box(query)))
        });
    });
}

fn bench_remove(c: &mut Criterion) {
    let points = random_points(10_000, 5);
    c.bench_function("insert_then_remove_10k", |b| {
        b.iter(|| {
            let mut index: SpatialIndex<u64, Rect> = SpatialIndex::new(32, 2);
            for &(shape, id) in &points {
                index.insert(shape, id);
            }
            for &(shape, id) in &points {
                index.remove(&shape, &id);
            }
            black_box(index.is_empty())
        });
    });
}

criterion_group!(benches, bench_insert, bench_pack_insert, bench_query, bench_remove);
criterion_main!(benches);
