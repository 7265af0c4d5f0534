use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ocho::prelude::*;

/// Tight loop exercising arithmetic, draw and jump dispatch.
#[rustfmt::skip]
const PROGRAM: &[u8] = &[
    0x60, 0x00, // 0x200: LD V0, 00
    0x70, 0x01, // 0x202: ADD V0, 01
    0xA0, 0x00, // 0x204: LD I, 000
    0xD1, 0x25, // 0x206: DRW V1, V2, 5
    0x12, 0x02, // 0x208: JP 202
];

fn criterion_benchmark(c: &mut Criterion) {
    {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_program(PROGRAM).unwrap();

        c.bench_function("interp frames", |b| {
            b.iter(|| {
                let frame_count = black_box(60_usize);
                black_box(vm.run_frames(frame_count))
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
