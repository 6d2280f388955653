// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Benchmark for the memory port ([`MemoryAccess`]).
//!
//! Make sure the result of the benchmarked function is used,
//! whether by sending it to black_box, or to return it from the closure.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use m68k::memory_access::MemoryAccess;

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut memory = vec![0u8; 0x10000].into_boxed_slice();

    c.bench_function("get_byte", |b| b.iter(|| {
        black_box(memory.get_byte(black_box(0x100)));
    }));

    c.bench_function("get_word", |b| b.iter(|| {
        black_box(memory.get_word(black_box(0x100)));
    }));

    c.bench_function("get_long", |b| b.iter(|| {
        black_box(memory.get_long(black_box(0x100)));
    }));

    c.bench_function("iter_u16", |b| b.iter(|| {
        let mut iter = memory.iter_u16(black_box(0x100));
        black_box(iter.next());
    }));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
