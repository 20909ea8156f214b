//! Benchmark: decode vs encode vs full text round trip for a synthetic slab with many
//! placements, plus schema decoding of the same layout exported as JSON.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slabcodec::codec::Accessor;
use slabcodec::dump::slab_to_json;
use slabcodec::uuid::hex_bytes_to_uuid_string;
use slabcodec::{
    decode_slab, encode_slab, field, json_array, json_number, json_obj, json_string, parse_slab,
    parse_spine, slab_to_text, AssetLayout, Placement, Slab,
};

fn synthetic_slab(groups: usize, per_group: usize) -> Slab {
    let assets = (0..groups)
        .map(|g| {
            let mut id = [0u8; 16];
            id[0] = g as u8;
            id[15] = (g >> 8) as u8;
            let positions = (0..per_group)
                .map(|i| Placement {
                    x: (i % 1000) as f64 * 0.25,
                    y: (g % 7) as f64,
                    z: (i % 13) as f64 * 1.5,
                    rot: ((i % 24) * 15) as f64,
                })
                .collect();
            AssetLayout {
                id: hex_bytes_to_uuid_string(&id),
                positions,
            }
        })
        .collect();
    Slab::new(assets)
}

fn bench_slab(c: &mut Criterion) {
    let slab = synthetic_slab(64, 256);
    let bytes = encode_slab(&slab).expect("encode");
    let text = slab_to_text(&slab).expect("text");

    c.bench_function("decode_slab_64x256", |b| {
        b.iter(|| decode_slab(black_box(&bytes)).expect("decode"))
    });

    c.bench_function("encode_slab_64x256", |b| {
        b.iter(|| encode_slab(black_box(&slab)).expect("encode"))
    });

    c.bench_function("text_round_trip_64x256", |b| {
        b.iter(|| {
            let parsed = parse_slab(black_box(&text)).expect("parse");
            slab_to_text(&parsed).expect("text")
        })
    });

    let json = slab_to_json(&slab).expect("json");
    let spine = parse_spine(&json).expect("spine");
    let placement = json_obj((
        field("x", json_number()),
        field("y", json_number()),
        field("z", json_number()),
        field("rot", json_number()),
    ));
    let schema = json_obj((
        field("version", json_number()),
        field(
            "assets",
            json_array(json_obj((
                field("id", json_string()),
                field("positions", json_array(placement)),
            ))),
        ),
    ));
    c.bench_function("schema_decode_64x256", |b| {
        b.iter(|| schema.decode(black_box(&spine)).expect("decode"))
    });
}

criterion_group!(benches, bench_slab);
criterion_main!(benches);
