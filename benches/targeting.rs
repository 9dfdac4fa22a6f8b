//! Nearest-hole search benchmarks
//!
//! Measures one targeting query against the full template, with and without
//! the wire round trip of the snapped pose.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use igtl_template_server::protocol::message::IgtlMessage;
use igtl_template_server::protocol::types::TransformMessage;
use igtl_template_server::template::report::targeting_status;
use igtl_template_server::template::{find_nearest_hole, GridSpec, Point, Registration};
use nalgebra::{Rotation3, Translation3};

fn registration() -> Registration {
    let rotation = Rotation3::from_euler_angles(0.1, -0.3, 0.7);
    let mut reg = Registration::new();
    reg.set(Translation3::new(10.0, -25.0, 140.0).to_homogeneous() * rotation.to_homogeneous());
    reg
}

fn bench_find_nearest_hole(c: &mut Criterion) {
    let grid = GridSpec::TEMPLATE;
    let reg = registration();
    let target = Point::new(12.0, 3.5, 190.0);

    c.bench_function("find_nearest_hole", |b| {
        b.iter(|| {
            let selected = find_nearest_hole(&grid, &reg, black_box(&target)).unwrap();
            black_box(selected)
        });
    });
}

fn bench_targeting_reply(c: &mut Criterion) {
    let grid = GridSpec::TEMPLATE;
    let reg = registration();
    let target = Point::new(-4.0, 8.0, 175.0);

    c.bench_function("targeting_reply_encode", |b| {
        b.iter(|| {
            let result = find_nearest_hole(&grid, &reg, black_box(&target));
            let status = IgtlMessage::new(targeting_status(&result), "TARGET").unwrap();
            let pose = result.unwrap().pose;
            let snapped =
                IgtlMessage::new(TransformMessage::from_matrix4(&pose), "TARGET").unwrap();
            black_box((status.encode().unwrap(), snapped.encode().unwrap()))
        });
    });
}

criterion_group!(benches, bench_find_nearest_hole, bench_targeting_reply);
criterion_main!(benches);
