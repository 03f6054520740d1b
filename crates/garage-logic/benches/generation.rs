use criterion::{black_box, criterion_group, criterion_main, Criterion};
use garage_logic::garage::{generate_garage, GarageParams};
use garage_logic::grid::GridPos;
use garage_logic::guard::{SecurityGuard, VisionCone};
use garage_logic::maze::carve_floor;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_carve_floor(c: &mut Criterion) {
    c.bench_function("carve_floor 31x23", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| carve_floor(black_box(31), black_box(23), 0.15, &mut rng));
    });
}

fn bench_generate_garage(c: &mut Criterion) {
    let params = GarageParams::default();
    c.bench_function("generate_garage 3x31x23", |b| {
        let mut rng = StdRng::seed_from_u64(2);
        b.iter(|| generate_garage(black_box(&params), &mut rng));
    });
}

fn bench_guard_vision(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let garage = generate_garage(&GarageParams::default(), &mut rng);
    let Some(grid) = garage.floor(0) else {
        return;
    };
    let guard = SecurityGuard::new(0, GridPos::new(1, 1), VisionCone::default());
    c.bench_function("guard can_see", |b| {
        b.iter(|| guard.can_see(grid, black_box(GridPos::new(1, 4))));
    });
}

criterion_group!(benches, bench_carve_floor, bench_generate_garage, bench_guard_vision);
criterion_main!(benches);
