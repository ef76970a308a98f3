//! Tree support benchmarks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arbor::geometry::{BoundingBox, ExPolygon, ExPolygons, Point, Polygon};
use arbor::storage::{MachineSettings, MeshStorage, SliceDataStorage, TreeSupportConfig};
use arbor::support::{TreeModelVolumes, TreeSupport, TreeSupportSettings};

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> ExPolygon {
    ExPolygon::new(Polygon::rectangle(
        Point::new_scale(x0, y0),
        Point::new_scale(x1, y1),
    ))
}

/// A 20mm plate cantilevered over a narrow pillar, 40 layers.
fn cantilever_storage() -> SliceDataStorage {
    let pillar = square(109.0, 109.0, 111.0, 111.0);
    let disc = square(100.0, 100.0, 120.0, 120.0);

    let mut layer_outlines: Vec<ExPolygons> = vec![vec![pillar.clone()]; 35];
    layer_outlines.extend(vec![vec![disc.clone()]; 5]);

    let mut overhang_areas: Vec<ExPolygons> = vec![ExPolygons::new(); 40];
    overhang_areas[35] = vec![square(100.0, 100.0, 120.0, 108.0)];

    let mut bounds = BoundingBox::new();
    bounds.merge(&disc.bounding_box());
    let mesh = MeshStorage {
        bounding_box: bounds,
        overhang_areas,
        support_tree_enable: true,
    };

    SliceDataStorage::new(
        MachineSettings::default(),
        TreeSupportConfig::default(),
        layer_outlines,
        vec![mesh],
    )
    .unwrap()
}

fn bench_volumes(c: &mut Criterion) {
    let storage = cantilever_storage();
    let settings = TreeSupportSettings::new(&storage.config, storage.layer_count());
    let tree = TreeSupport::new(&storage);

    c.bench_function("volumes_40_layers", |b| {
        b.iter(|| {
            black_box(TreeModelVolumes::build(
                &storage,
                tree.machine_volume_border(),
                &settings,
            ))
        })
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    c.bench_function("tree_support_cantilever", |b| {
        b.iter(|| {
            let mut storage = cantilever_storage();
            let tree = TreeSupport::new(&storage);
            tree.generate_support_areas(&mut storage);
            black_box(storage.support.layer_nr_max_filled_layer)
        })
    });
}

criterion_group!(benches, bench_volumes, bench_full_pipeline);
criterion_main!(benches);
