//! Criterion benchmarks for the uinput codec.
//!
//! Every button edge encodes two event records, so this path runs on each
//! press inside the 20 ms poll tick.
//!
//! Run with:
//! ```bash
//! cargo bench --package gpio-keys-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gpio_keys_core::protocol::codec::{DeviceDescriptor, InputEvent};
use gpio_keys_core::KeyCode;

fn bench_key_edge(c: &mut Criterion) {
    c.bench_function("encode_key_down_with_sync", |b| {
        b.iter(|| {
            let down = InputEvent::key(black_box(KeyCode::Enter.as_u16()), true).encode();
            let sync = InputEvent::sync().encode();
            black_box((down, sync))
        })
    });

    let encoded = InputEvent::key(KeyCode::Up.as_u16(), false).encode();
    c.bench_function("decode_key_up", |b| {
        b.iter(|| InputEvent::decode(black_box(&encoded)))
    });
}

fn bench_descriptor(c: &mut Criterion) {
    let descriptor = DeviceDescriptor::usb("gba-loader-input-controller", 0x1234, 0x5678, 1);
    c.bench_function("encode_descriptor", |b| {
        b.iter(|| black_box(&descriptor).encode())
    });
}

fn bench_key_lookup(c: &mut Criterion) {
    c.bench_function("parse_key_name", |b| {
        b.iter(|| black_box("KEY_BACKSPACE").parse::<KeyCode>())
    });
}

criterion_group!(benches, bench_key_edge, bench_descriptor, bench_key_lookup);
criterion_main!(benches);
