// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Benchmark for the `run` entry point through the C interface.
//!
//! Make sure the result of the benchmarked function is used,
//! whether by sending it to black_box, or to return it from the closure.

use core::ffi::c_void;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use m68k_ffi::mc68000::{m68000_mc68000_delete, m68000_mc68000_new, m68000_mc68000_run};
use m68k_ffi::{m68000_callbacks_t, m68000_memory_result_t};

type CodeArray = [u8; 0x10000];

extern "C" fn get_byte(addr: u32, user_data: *mut c_void) -> m68000_memory_result_t {
    let memory = user_data as *mut CodeArray;
    unsafe {
        match (*memory).get(addr as usize) {
            Some(&b) => m68000_memory_result_t { data: b as u32, exception: 0 },
            None => m68000_memory_result_t { data: 0, exception: 2 },
        }
    }
}

extern "C" fn get_word(addr: u32, user_data: *mut c_void) -> m68000_memory_result_t {
    let memory = user_data as *mut CodeArray;
    unsafe {
        match (*memory).get(addr as usize..addr as usize + 2) {
            Some(bytes) => m68000_memory_result_t { data: u16::from_be_bytes([bytes[0], bytes[1]]) as u32, exception: 0 },
            None => m68000_memory_result_t { data: 0, exception: 2 },
        }
    }
}

extern "C" fn set_byte(_addr: u32, _data: u8, _user_data: *mut c_void) -> m68000_memory_result_t {
    m68000_memory_result_t { data: 0, exception: 2 }
}

extern "C" fn set_word(_addr: u32, _data: u16, _user_data: *mut c_void) -> m68000_memory_result_t {
    m68000_memory_result_t { data: 0, exception: 2 }
}

extern "C" fn reset_instruction(_user_data: *mut c_void) {}

pub fn criterion_benchmark(c: &mut Criterion) {
    let cpu = m68000_mc68000_new();
    let mut code: CodeArray = [0u8; 0x10000];
    // Reset vectors: SSP = 0x1000, PC = 0x0008.
    code[2] = 0x10;
    code[6] = 0x08;
    // BRA.S *-2, an infinite tight loop.
    code[0x0008] = 0x60;
    code[0x0009] = 0xFE;

    let memory_ptr = &raw mut code as *mut c_void;
    let mut memory_callbacks = m68000_callbacks_t {
        get_byte,
        get_word,
        set_byte,
        set_word,
        reset_instruction,
        user_data: memory_ptr,
    };

    unsafe {
        let mut budget = 1;
        m68000_mc68000_run(cpu, &raw mut memory_callbacks, &mut budget); // Fetch the reset vectors on the first call.

        c.bench_function("m68000_mc68000_run", |b| b.iter(|| {
            let mut budget = 1;
            black_box(m68000_mc68000_run(black_box(cpu), black_box(&raw mut memory_callbacks), &mut budget));
        }));

        m68000_mc68000_delete(cpu);
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
