// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Benchmark for the interpreter's `run` loop.
//!
//! Make sure the result of the benchmarked function is used,
//! whether by sending it to black_box, or to return it from the closure.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use m68k::memory_access::MemoryAccess;
use m68k::model::Mc68000;
use m68k::M68000;

struct FlatMemory(Vec<u8>);

impl MemoryAccess for FlatMemory {
    fn get_byte(&mut self, addr: u32) -> Option<u8> { self.0.get_byte(addr) }
    fn get_word(&mut self, addr: u32) -> Option<u16> { self.0.get_word(addr) }
    fn set_byte(&mut self, addr: u32, v: u8) -> Option<()> { self.0.set_byte(addr, v) }
    fn set_word(&mut self, addr: u32, v: u16) -> Option<()> { self.0.set_word(addr, v) }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let bra = [0x60u8, 0xFE]; // BRA.S *-2, an infinite tight loop.
    let mut bytes = vec![0u8; 0x10000];
    bytes[0x0008] = bra[0];
    bytes[0x0009] = bra[1];
    // Reset vectors: SSP = 0x1000, PC = 0x0008.
    bytes[2] = 0x10;
    bytes[6] = 0x08;
    let mut memory = FlatMemory(bytes);

    let mut cpu = M68000::<Mc68000>::new();
    let mut budget = 1;
    cpu.run(&mut memory, &mut budget); // Fetch the reset vectors on the first call.

    c.bench_function("run_one_instruction", |b| b.iter(|| {
        let mut budget = 1;
        cpu.run(black_box(&mut memory), black_box(&mut budget));
    }));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
