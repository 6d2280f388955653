// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The narrow interface the core uses for every data and instruction
//! fetch. Collaborators (RAM/ROM/mapped-device models) implement this
//! trait; the core never touches memory any other way.

use std::num::Wrapping;

use crate::addressing_modes::{AddressingMode, EffectiveAddress};
use crate::exception::ADDRESS_ERROR;
use crate::instruction::Size;
use crate::model::CpuModel;
use crate::utils::IsEven;
use crate::M68000;

/// Synchronous, total, big-endian byte-addressable memory.
///
/// This is the `read{8,16,32}`/`write{8,16,32}` contract of the
/// specification; the method names keep the teacher's `get_*`/`set_*`
/// convention (see DESIGN.md) since both name the same four-byte-wide,
/// big-endian, infallible-at-this-layer operation.
pub trait MemoryAccess {
    fn get_byte(&mut self, addr: u32) -> Option<u8>;
    fn get_word(&mut self, addr: u32) -> Option<u16>;

    fn get_long(&mut self, addr: u32) -> Option<u32> {
        let high = self.get_word(addr)?;
        let low = self.get_word(addr.wrapping_add(2))?;
        Some((high as u32) << 16 | low as u32)
    }

    fn set_byte(&mut self, addr: u32, value: u8) -> Option<()>;
    fn set_word(&mut self, addr: u32, value: u16) -> Option<()>;

    fn set_long(&mut self, addr: u32, value: u32) -> Option<()> {
        self.set_word(addr, (value >> 16) as u16)?;
        self.set_word(addr.wrapping_add(2), value as u16)
    }

    /// Iterates over consecutive words starting at `addr`, used to consume
    /// instruction opcodes and extension words.
    fn iter_u16(&mut self, addr: u32) -> MemoryIter<'_, Self> {
        MemoryIter { memory: self, next_addr: addr }
    }

    /// Collaborator hook invoked when a RESET instruction executes.
    fn reset_instruction(&mut self) {}
}

/// A cursor over 16-bit words, used while decoding an instruction stream.
/// Returns [`ADDRESS_ERROR`] on an odd address rather than panicking,
/// since an odd PC is a guest-triggerable condition (spec §3).
pub struct MemoryIter<'a, M: MemoryAccess + ?Sized> {
    memory: &'a mut M,
    next_addr: u32,
}

impl<'a, M: MemoryAccess + ?Sized> Iterator for MemoryIter<'a, M> {
    type Item = Result<u16, u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let addr = match self.next_addr.even() {
            Ok(addr) => addr,
            Err(e) => return Some(Err(e)),
        };
        let word = self.memory.get_word(addr)?;
        self.next_addr = self.next_addr.wrapping_add(2);
        Some(Ok(word))
    }
}

/// Object-safe word cursor used by decode functions stored in the
/// per-opcode dispatch table ([`crate::isa::IsaEntry`]); a generic
/// `MemoryIter<M>` cannot appear in a non-generic function-pointer array,
/// so decode functions see only this trait object.
pub trait WordStream {
    /// Address of the next word to be returned by `next_word`.
    fn next_addr(&self) -> u32;
    /// Fetches and consumes the next word, or an address-error if misaligned
    /// or a bus fault if unmapped (surfaced as [`crate::exception::ACCESS_ERROR`]).
    fn next_word(&mut self) -> Result<u16, u8>;
    /// Fetches the next word without consuming it (used for mode-7/4 peek).
    fn peek_word(&mut self) -> Result<u16, u8>;

    fn next_long(&mut self) -> Result<u32, u8> {
        let high = self.next_word()?;
        let low = self.next_word()?;
        Ok((high as u32) << 16 | low as u32)
    }
}

impl<'a, M: MemoryAccess + ?Sized> WordStream for MemoryIter<'a, M> {
    fn next_addr(&self) -> u32 {
        self.next_addr
    }

    fn next_word(&mut self) -> Result<u16, u8> {
        self.next().ok_or(crate::exception::ACCESS_ERROR)?
    }

    fn peek_word(&mut self) -> Result<u16, u8> {
        let addr = self.next_addr.even()?;
        self.memory.get_word(addr).ok_or(crate::exception::ACCESS_ERROR)
    }
}

impl<CPU: CpuModel> M68000<CPU> {
    /// Reads an operand of `ea.mode`, caching the effective address for
    /// memory-class modes so a following `set_*` call on the same `ea`
    /// does not re-run `(An)+`/`-(An)` side effects.
    pub(crate) fn get_byte(&mut self, ea: &mut EffectiveAddress, memory: &mut impl MemoryAccess) -> Result<u8, u8> {
        match ea.mode {
            AddressingMode::Drd(reg) => Ok(self.regs.d[reg as usize].0 as u8),
            AddressingMode::Immediate(v) => Ok(v as u8),
            AddressingMode::Ard(_) => panic!("byte access to An"),
            _ => {
                let addr = self.effective_address(ea, memory)?;
                memory.get_byte(addr).ok_or(crate::exception::ACCESS_ERROR)
            }
        }
    }

    pub(crate) fn get_word(&mut self, ea: &mut EffectiveAddress, memory: &mut impl MemoryAccess) -> Result<u16, u8> {
        match ea.mode {
            AddressingMode::Drd(reg) => Ok(self.regs.d[reg as usize].0 as u16),
            AddressingMode::Ard(reg) => Ok(self.regs.a(reg) as u16),
            AddressingMode::Immediate(v) => Ok(v as u16),
            _ => {
                let addr = self.effective_address(ea, memory)?;
                memory.get_word(addr).ok_or(crate::exception::ACCESS_ERROR)
            }
        }
    }

    pub(crate) fn get_long(&mut self, ea: &mut EffectiveAddress, memory: &mut impl MemoryAccess) -> Result<u32, u8> {
        match ea.mode {
            AddressingMode::Drd(reg) => Ok(self.regs.d[reg as usize].0),
            AddressingMode::Ard(reg) => Ok(self.regs.a(reg)),
            AddressingMode::Immediate(v) => Ok(v),
            _ => {
                let addr = self.effective_address(ea, memory)?;
                memory.get_long(addr).ok_or(crate::exception::ACCESS_ERROR)
            }
        }
    }

    pub(crate) fn set_byte(&mut self, ea: &mut EffectiveAddress, memory: &mut impl MemoryAccess, value: u8) -> Result<(), u8> {
        match ea.mode {
            AddressingMode::Drd(reg) => { self.regs.d_byte(reg, value); Ok(()) }
            AddressingMode::Ard(_) => panic!("byte access to An"),
            _ => {
                let addr = self.effective_address(ea, memory)?;
                memory.set_byte(addr, value).ok_or(crate::exception::ACCESS_ERROR)
            }
        }
    }

    pub(crate) fn set_word(&mut self, ea: &mut EffectiveAddress, memory: &mut impl MemoryAccess, value: u16) -> Result<(), u8> {
        match ea.mode {
            AddressingMode::Drd(reg) => { self.regs.d_word(reg, value); Ok(()) }
            AddressingMode::Ard(reg) => { *self.regs.a_mut(reg) = Wrapping(value as i16 as i32 as u32); Ok(()) }
            _ => {
                let addr = self.effective_address(ea, memory)?;
                memory.set_word(addr, value).ok_or(crate::exception::ACCESS_ERROR)
            }
        }
    }

    pub(crate) fn set_long(&mut self, ea: &mut EffectiveAddress, memory: &mut impl MemoryAccess, value: u32) -> Result<(), u8> {
        match ea.mode {
            AddressingMode::Drd(reg) => { self.regs.d[reg as usize] = Wrapping(value); Ok(()) }
            AddressingMode::Ard(reg) => { *self.regs.a_mut(reg) = Wrapping(value); Ok(()) }
            _ => {
                let addr = self.effective_address(ea, memory)?;
                memory.set_long(addr, value).ok_or(crate::exception::ACCESS_ERROR)
            }
        }
    }

    /// Computes the address a memory-class `mode` refers to without going
    /// through an operand read/write (LEA, PEA, JMP, JSR, branch targets).
    pub(crate) fn lea_address(&mut self, mode: &AddressingMode, memory: &mut impl MemoryAccess) -> Result<u32, u8> {
        self.get_effective_address(mode, Some(Size::Long), memory, true)
    }

    pub(crate) fn get_next_word(&mut self, memory: &mut impl MemoryAccess) -> Result<u16, u8> {
        let addr = self.regs.pc.0.even()?;
        let word = memory.get_word(addr).ok_or(crate::exception::ACCESS_ERROR)?;
        self.regs.pc += 2;
        Ok(word)
    }

    pub(crate) fn get_next_long(&mut self, memory: &mut impl MemoryAccess) -> Result<u32, u8> {
        let high = self.get_next_word(memory)?;
        let low = self.get_next_word(memory)?;
        Ok((high as u32) << 16 | low as u32)
    }

    pub(crate) fn peek_next_word(&mut self, memory: &mut impl MemoryAccess) -> Result<u16, u8> {
        let addr = self.regs.pc.0.even()?;
        memory.get_word(addr).ok_or(crate::exception::ACCESS_ERROR)
    }

    pub(crate) fn pop_word(&mut self, memory: &mut impl MemoryAccess) -> Result<u16, u8> {
        let addr = self.regs.sp().even()?;
        let word = memory.get_word(addr).ok_or(crate::exception::ACCESS_ERROR)?;
        *self.regs.sp_mut() += 2;
        Ok(word)
    }

    pub(crate) fn pop_long(&mut self, memory: &mut impl MemoryAccess) -> Result<u32, u8> {
        let high = self.pop_word(memory)?;
        let low = self.pop_word(memory)?;
        Ok((high as u32) << 16 | low as u32)
    }

    pub(crate) fn push_word(&mut self, memory: &mut impl MemoryAccess, value: u16) -> Result<(), u8> {
        *self.regs.sp_mut() -= 2;
        let addr = self.regs.sp().even()?;
        memory.set_word(addr, value).ok_or(crate::exception::ACCESS_ERROR)
    }

    pub(crate) fn push_long(&mut self, memory: &mut impl MemoryAccess, value: u32) -> Result<(), u8> {
        // push_word decrements SP *then* writes, so pushing the high half
        // first would leave it at the higher of the two addresses -- push
        // the low half first so the final, lower address holds the high
        // half, matching the big-endian frame layout pop_long expects.
        self.push_word(memory, value as u16)?;
        self.push_word(memory, (value >> 16) as u16)
    }
}

impl MemoryAccess for [u8] {
    fn get_byte(&mut self, addr: u32) -> Option<u8> {
        self.get(addr as usize).copied()
    }

    fn get_word(&mut self, addr: u32) -> Option<u16> {
        let a = self.get_byte(addr)? as u16;
        let b = self.get_byte(addr.wrapping_add(1))? as u16;
        Some(a << 8 | b)
    }

    fn set_byte(&mut self, addr: u32, value: u8) -> Option<()> {
        *self.get_mut(addr as usize)? = value;
        Some(())
    }

    fn set_word(&mut self, addr: u32, value: u16) -> Option<()> {
        self.set_byte(addr, (value >> 8) as u8)?;
        self.set_byte(addr.wrapping_add(1), value as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_slice_is_big_endian() {
        let mut mem = [0x12u8, 0x34, 0x56, 0x78];
        assert_eq!(mem.get_word(0), Some(0x1234));
        assert_eq!(mem.get_long(0), Some(0x12345678));
        mem.set_word(0, 0xABCD).unwrap();
        assert_eq!(mem[0], 0xAB);
        assert_eq!(mem[1], 0xCD);
    }

    #[test]
    fn iter_u16_reports_address_error_on_odd() {
        let mut mem = [0u8; 4];
        let mut iter = mem.iter_u16(1);
        assert_eq!(iter.next(), Some(Err(ADDRESS_ERROR)));
    }
}
