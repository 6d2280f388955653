// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The C interface of m68k, to use it in other languages.
//!
//! The functions and structures defined here should not be used in a rust program.
//!
//! To use it, first allocate a new core with `m68000_*_new` or `m68000_*_new_no_reset`
//! (or `m68000_*_new_cold` for the cold-boot reset state). When done, delete it with
//! `m68000_*_delete`.
//!
//! ## Memory callback
//!
//! You need to provide the memory access structure to the core when running it.
//! Create a new [m68000_callbacks_t] structure, and assign the correct function
//! callback as its members.
//!
//! Each callback returns a [m68000_memory_result_t], which indicates if the memory
//! access is successful or not. If successful, set the `exception` member to 0 and
//! set the `data` member to the value to be returned if read; it is not used on write.
//! If the address is out of range, set `exception` to 2 (Access Error).
//!
//! ## Running the core
//!
//! `m68000_*_run` executes instructions until the given budget of instructions is
//! exhausted (or a STOP instruction halts the core early each iteration still
//! consumes one unit of budget, see [m68k::M68000::run]). Exceptions raised during
//! execution are queued internally and processed on the next call rather than
//! returned, matching the library's `run` contract.
//!
//! `m68000_*_disassemble_next` decodes (without executing) the instruction at the
//! current PC and writes its textual disassembly into the caller's buffer.
//!
//! ## Exceptions processing
//!
//! To request the core to process an exception, call `m68000_*_exception` with the
//! vector number of the exception to process.
//!
//! ## Accessing the registers
//!
//! - `m68000_*_registers` returns a mutable (non-const) pointer to the
//!   [Registers](m68k::Registers). The location does not change during execution,
//!   so the pointer can be stored for as long as the core lives.
//! - `m68000_*_get_registers` returns a copy of the registers.
//! - `m68000_*_set_registers` sets the core's registers to the given value.
//!
//! ## Checkpointing
//!
//! `m68000_*_checkpoint_save` serializes the full processor state into a
//! heap-allocated buffer described by [m68000_buffer_t]; free it with
//! `m68000_buffer_free` once copied. `m68000_*_checkpoint_restore` allocates a new
//! core from a previously saved buffer, returning null on a malformed image.

pub mod mc68000;
pub mod mc68030;

use m68k::exception::Exception;
use m68k::memory_access::MemoryAccess;
use m68k::{CpuModel, M68000, Registers};

use std::ffi::c_void;
use std::os::raw::c_char;

/// Return type of the memory callback functions.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct m68000_memory_result_t {
    /// Set to the value to be returned. Only the low order bytes are read depending
    /// on the access size. Unused on write.
    pub data: u32,
    /// 0 if the access succeeded, 2 (Access Error) otherwise. Address errors on an
    /// odd address are detected by the library itself and never need to be reported
    /// here.
    pub exception: u8,
}

/// Memory callbacks passed to every core entry point.
///
/// The `void*` argument passed on each callback is the [user_data](Self::user_data)
/// member; its usage is left to the caller, e.g. a pointer to the emulated address
/// space or to a C++ object whose callbacks are trampolines back into member
/// functions.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct m68000_callbacks_t {
    pub get_byte: extern "C" fn(addr: u32, user_data: *mut c_void) -> m68000_memory_result_t,
    pub get_word: extern "C" fn(addr: u32, user_data: *mut c_void) -> m68000_memory_result_t,

    pub set_byte: extern "C" fn(addr: u32, data: u8, user_data: *mut c_void) -> m68000_memory_result_t,
    pub set_word: extern "C" fn(addr: u32, data: u16, user_data: *mut c_void) -> m68000_memory_result_t,

    pub reset_instruction: extern "C" fn(user_data: *mut c_void),

    pub user_data: *mut c_void,
}

impl MemoryAccess for m68000_callbacks_t {
    fn get_byte(&mut self, addr: u32) -> Option<u8> {
        let res = (self.get_byte)(addr, self.user_data);
        (res.exception == 0).then_some(res.data as u8)
    }

    fn get_word(&mut self, addr: u32) -> Option<u16> {
        let res = (self.get_word)(addr, self.user_data);
        (res.exception == 0).then_some(res.data as u16)
    }

    fn set_byte(&mut self, addr: u32, value: u8) -> Option<()> {
        let res = (self.set_byte)(addr, value, self.user_data);
        (res.exception == 0).then_some(())
    }

    fn set_word(&mut self, addr: u32, value: u16) -> Option<()> {
        let res = (self.set_word)(addr, value, self.user_data);
        (res.exception == 0).then_some(())
    }

    fn reset_instruction(&mut self) {
        (self.reset_instruction)(self.user_data)
    }
}

/// A heap-allocated byte buffer handed back to C, e.g. by
/// `m68000_*_checkpoint_save`. Free it with [m68000_buffer_free].
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct m68000_buffer_t {
    pub data: *mut u8,
    pub len: usize,
    capacity: usize,
}

impl From<Vec<u8>> for m68000_buffer_t {
    fn from(mut v: Vec<u8>) -> Self {
        let buf = m68000_buffer_t { data: v.as_mut_ptr(), len: v.len(), capacity: v.capacity() };
        std::mem::forget(v);
        buf
    }
}

/// Frees a buffer returned by `m68000_*_checkpoint_save`.
///
/// # Safety
///
/// `buffer` must have been produced by a `m68000_*_checkpoint_save` call and must
/// not be freed more than once.
#[no_mangle]
pub unsafe extern "C" fn m68000_buffer_free(buffer: m68000_buffer_t) {
    drop(Vec::from_raw_parts(buffer.data, buffer.len, buffer.capacity));
}

/// Writes a Rust string into a caller-provided buffer, truncating with a null
/// terminator if the buffer is too small. Returns the number of bytes written,
/// null terminator included.
fn write_cstring(s: &str, out: *mut c_char, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let bytes = s.as_bytes();
    let copy_len = bytes.len().min(len - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), out as *mut u8, copy_len);
        *out.add(copy_len) = 0;
    }
    copy_len + 1
}

macro_rules! cinterface {
    ($cpu:ident, $cpu_model:ty) => {
        paste::paste! {
            /// Allocates a new core with a pending reset: the first call to
            /// `m68000_*_run` fetches SSP/PC from memory addresses 0 and 4 before
            /// executing anything, matching real hardware reset behavior.
            ///
            /// Not managed by Rust; delete it with `m68000_*_delete`.
            #[no_mangle]
            pub extern "C" fn [<m68000_ $cpu _new>]() -> *mut M68000<$cpu_model> {
                Box::into_raw(Box::new(M68000::<$cpu_model>::new()))
            }

            /// Like `m68000_*_new`, but without the pending reset, so the caller can
            /// initialize registers before running anything.
            #[no_mangle]
            pub extern "C" fn [<m68000_ $cpu _new_no_reset>]() -> *mut M68000<$cpu_model> {
                Box::into_raw(Box::new(M68000::<$cpu_model>::new_no_reset()))
            }

            /// Allocates a new core in the cold-boot state (PC/SSP set directly,
            /// supervisor mode, interrupt mask 7), without fetching vectors from memory.
            #[no_mangle]
            pub extern "C" fn [<m68000_ $cpu _new_cold>]() -> *mut M68000<$cpu_model> {
                Box::into_raw(Box::new(M68000::<$cpu_model>::new_cold()))
            }

            /// Frees the memory of the given core.
            ///
            /// # Safety
            ///
            /// `m68000` must have been returned by one of `m68000_*_new*` and must not
            /// be used after this call.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _delete>](m68000: *mut M68000<$cpu_model>) {
                drop(Box::from_raw(m68000));
            }

            /// Runs the core for `*budget` instructions, decrementing `*budget` to zero.
            ///
            /// # Safety
            ///
            /// `m68000`, `memory` and `budget` must all be valid, non-null pointers.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _run>](m68000: *mut M68000<$cpu_model>, memory: *mut m68000_callbacks_t, budget: *mut usize) {
                (*m68000).run(&mut *memory, &mut *budget);
            }

            /// Decodes (without executing) the instruction at the current PC and
            /// writes its disassembly into `str`, a buffer of `len` bytes (null
            /// terminator included). Returns the number of 16-bit words the
            /// instruction occupies, or 0 on a decode error.
            ///
            /// # Safety
            ///
            /// `m68000`, `memory` and `str` must all be valid, non-null pointers, and
            /// `str` must point to a buffer of at least `len` bytes.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _disassemble_next>](m68000: *mut M68000<$cpu_model>, memory: *mut m68000_callbacks_t, str: *mut c_char, len: usize) -> u32 {
                let pc = (*m68000).pc();
                let mut words = (*memory).iter_u16(pc);
                match m68k::disassembler::disasm(&mut words, <$cpu_model as CpuModel>::IS_68030) {
                    Ok((text, consumed)) => {
                        write_cstring(&text, str, len);
                        consumed
                    }
                    Err(_) => 0,
                }
            }

            /// Requests the core process the given exception vector on its next
            /// call to `m68000_*_run`.
            ///
            /// # Safety
            ///
            /// `m68000` must be a valid, non-null pointer.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _exception>](m68000: *mut M68000<$cpu_model>, vector: u8) {
                (*m68000).exception(Exception::from(vector));
            }

            /// Sets the interrupt priority level sampled at the next poll point.
            ///
            /// # Safety
            ///
            /// `m68000` must be a valid, non-null pointer.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _set_ipl>](m68000: *mut M68000<$cpu_model>, ipl: u8) {
                (*m68000).set_ipl(ipl);
            }

            /// Returns a mutable pointer to the registers of the given core.
            ///
            /// # Safety
            ///
            /// `m68000` must be a valid, non-null pointer.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _registers>](m68000: *mut M68000<$cpu_model>) -> *mut Registers {
                &mut (*m68000).regs
            }

            /// Returns a copy of the registers of the given core.
            ///
            /// # Safety
            ///
            /// `m68000` must be a valid, non-null pointer.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _get_registers>](m68000: *const M68000<$cpu_model>) -> Registers {
                (*m68000).regs
            }

            /// Sets the registers of the core to the given value.
            ///
            /// # Safety
            ///
            /// `m68000` must be a valid, non-null pointer.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _set_registers>](m68000: *mut M68000<$cpu_model>, regs: Registers) {
                (*m68000).regs = regs;
            }

            /// Serializes the full processor state into a heap buffer; free it with
            /// [m68000_buffer_free].
            ///
            /// # Safety
            ///
            /// `m68000` must be a valid, non-null pointer.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _checkpoint_save>](m68000: *const M68000<$cpu_model>) -> m68000_buffer_t {
                (*m68000).checkpoint_save().into()
            }

            /// Allocates a new core restored from a checkpoint image, or returns null
            /// if the image is malformed or truncated.
            ///
            /// # Safety
            ///
            /// `data` must point to at least `len` readable bytes.
            #[no_mangle]
            pub unsafe extern "C" fn [<m68000_ $cpu _checkpoint_restore>](data: *const u8, len: usize) -> *mut M68000<$cpu_model> {
                let slice = std::slice::from_raw_parts(data, len);
                match M68000::<$cpu_model>::checkpoint_restore(slice) {
                    Ok(cpu) => Box::into_raw(Box::new(cpu)),
                    Err(_) => std::ptr::null_mut(),
                }
            }
        }
    };
}

use cinterface;
