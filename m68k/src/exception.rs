// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vectored exception processing: stack switching, frame push/pop, and
//! vector table dispatch (spec §4.E, §7).

use std::collections::BTreeSet;

use crate::memory_access::MemoryAccess;
use crate::model::{CpuModel, StackFormat};
use crate::M68000;

/// Returned by the EA engine and memory port helpers on a misaligned access.
pub const ADDRESS_ERROR: u8 = Vector::AddressError as u8;
/// Returned when a memory fetch needed to complete an access fails.
pub const ACCESS_ERROR: u8 = Vector::AccessError as u8;
/// Returned by the EA engine when a mode fails categorical validation.
pub const ILLEGAL_INSTRUCTION: u8 = Vector::IllegalInstruction as u8;

/// Exception vector numbers (not byte offsets -- multiply by 4, or by 4
/// and add VBR on the 68030, to get the vector table slot).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Vector {
    ResetSspPc = 0,
    AccessError = 2,
    AddressError,
    IllegalInstruction,
    ZeroDivide,
    ChkInstruction,
    TrapVInstruction,
    PrivilegeViolation,
    Trace,
    LineAEmulator,
    LineFEmulator,
    FormatError = 14,
    UninitializedInterrupt,
    SpuriousInterrupt = 24,
    Level1Interrupt,
    Level2Interrupt,
    Level3Interrupt,
    Level4Interrupt,
    Level5Interrupt,
    Level6Interrupt,
    Level7Interrupt,
    Trap0Instruction = 32,
}

/// True if `vector` is one of the seven auto-vectored interrupt levels.
pub const fn is_interrupt(vector: u8) -> bool {
    vector >= Vector::Level1Interrupt as u8 && vector <= Vector::Level7Interrupt as u8
}

fn get_vector_priority(vector: u8) -> u8 {
    // Reset is highest priority; interrupts are prioritized by level
    // (higher level = higher priority = lower sort key); everything else
    // is processed in the order raised, below interrupts, above nothing.
    if vector == Vector::ResetSspPc as u8 {
        0
    } else if is_interrupt(vector) {
        1 + (Vector::Level7Interrupt as u8 - vector)
    } else {
        100
    }
}

/// A pending exception, ordered so that [`BTreeSet`] pops highest-priority
/// items last (see [`M68000::process_pending_exceptions`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exception {
    pub vector: u8,
    priority: u8,
}

impl PartialOrd for Exception {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Exception {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.priority.cmp(&self.priority).then(other.vector.cmp(&self.vector))
    }
}

impl From<u8> for Exception {
    fn from(vector: u8) -> Self {
        Self { vector, priority: get_vector_priority(vector) }
    }
}

impl From<Vector> for Exception {
    fn from(v: Vector) -> Self {
        Self::from(v as u8)
    }
}

impl<CPU: CpuModel> M68000<CPU> {
    /// Registers an exception to be processed before the next instruction
    /// fetch (or immediately, for synchronous exceptions raised by the
    /// currently executing instruction).
    pub fn exception(&mut self, exception: Exception) {
        self.exceptions.insert(exception);
    }

    /// Cold/warm reset: reloads SSP and PC from vector 0, sets supervisor
    /// mode, masks interrupts, and clears the trace bits.
    pub(crate) fn reset(&mut self, memory: &mut impl MemoryAccess) {
        self.regs.ssp = std::num::Wrapping(memory.get_long(0).unwrap_or(0));
        self.regs.pc = std::num::Wrapping(memory.get_long(4).unwrap_or(0));
        self.regs.sr.t1 = false;
        self.regs.sr.t0 = false;
        self.regs.sr.s = true;
        self.regs.sr.m = false;
        self.regs.sr.interrupt_mask = 7;
        self.stop = false;
    }

    /// Extracts and processes every pending exception, highest priority
    /// last out of the `BTreeSet`, so the final state reflects the
    /// highest-priority exception as required by the multiple-exceptions
    /// rule (spec references MC68000UM 6.2.3 via the teacher).
    pub(crate) fn process_pending_exceptions(&mut self, memory: &mut impl MemoryAccess) {
        let ipl = self.ipl;
        let maskable: BTreeSet<Exception> = self.exceptions
            .iter()
            .copied()
            .filter(|e| !is_interrupt(e.vector) || ipl > self.regs.sr.interrupt_mask)
            .collect();
        for e in &maskable {
            self.exceptions.remove(e);
        }
        for e in maskable {
            if e.vector == Vector::ResetSspPc as u8 {
                self.reset(memory);
            } else {
                let _ = self.process_exception(memory, e.vector);
            }
        }
    }

    /// Pushes the exception frame appropriate for `vector` on this model
    /// and redirects PC to the handler. Returns `Err` only if the
    /// exception-frame push itself faults (double fault), which is
    /// reported to the driver the same way any other unrecoverable
    /// condition would be -- there is no further exception level below this.
    pub(crate) fn process_exception(&mut self, memory: &mut impl MemoryAccess, vector: u8) -> Result<(), u8> {
        self.stop = false;
        let old_sr: u16 = self.regs.sr.into();
        if is_interrupt(vector) {
            self.regs.sr.interrupt_mask = vector - Vector::Level1Interrupt as u8 + 1;
        }
        self.regs.sr.s = true;
        self.regs.sr.m = false;

        let return_pc = self.regs.pc.0;

        match CPU::STACK_FORMAT {
            StackFormat::Short => {
                self.push_long(memory, return_pc)?;
                self.push_word(memory, old_sr)?;
            }
            StackFormat::Mc68030 => {
                let format2 = matches!(vector,
                    v if v == Vector::ZeroDivide as u8
                        || v == Vector::ChkInstruction as u8
                        || v == Vector::TrapVInstruction as u8
                        || v == Vector::Trace as u8);
                if format2 {
                    self.push_long(memory, self.instruction_pc.0)?;
                }
                let format_vector = (if format2 { 0x2000 } else { 0x0000 }) | (vector as u16) << 2;
                self.push_word(memory, format_vector)?;
                self.push_long(memory, return_pc)?;
                self.push_word(memory, old_sr)?;
            }
        }

        self.regs.sr.t1 = false;
        self.regs.sr.t0 = false;

        let vector_addr = if CPU::IS_68030 { self.vbr.0.wrapping_add(vector as u32 * 4) } else { vector as u32 * 4 };
        self.regs.pc = std::num::Wrapping(memory.get_long(vector_addr).unwrap_or(0));
        Ok(())
    }

    /// `RTE`: pops SR, PC, and on the 68030 the format/vector word (plus,
    /// for Format $2, the extra `instruction_pc` longword). A format byte
    /// other than 0 or 2 raises format-error (vector 14) rather than being
    /// silently ignored (REDESIGN FLAG, see DESIGN.md).
    pub(crate) fn execute_rte(&mut self, memory: &mut impl MemoryAccess) -> Result<(), u8> {
        self.check_supervisor()?;

        if CPU::IS_68030 {
            let sr = self.pop_word(memory)?;
            let pc = self.pop_long(memory)?;
            let format_vector = self.pop_word(memory)?;
            let format = format_vector >> 12;
            match format {
                0x0 => {}
                0x2 => { self.pop_long(memory)?; }
                _ => return Err(Vector::FormatError as u8),
            }
            self.set_sr(sr);
            self.regs.pc = std::num::Wrapping(pc);
        } else {
            let sr = self.pop_word(memory)?;
            let pc = self.pop_long(memory)?;
            self.set_sr(sr);
            self.regs.pc = std::num::Wrapping(pc);
        }
        Ok(())
    }

    /// `RTR`: pops CCR only (leaving the supervisor/trace/mask bits
    /// untouched) then PC.
    pub(crate) fn execute_rtr(&mut self, memory: &mut impl MemoryAccess) -> Result<(), u8> {
        let ccr = self.pop_word(memory)?;
        let pc = self.pop_long(memory)?;
        self.regs.sr.set_ccr(ccr);
        self.regs.pc = std::num::Wrapping(pc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mc68000;
    use crate::M68000;

    #[test]
    fn interrupt_stacks_pre_exception_mask_not_the_elevated_one() {
        let mut cpu = M68000::<Mc68000>::new_no_reset();
        cpu.regs.sr.s = true;
        cpu.regs.ssp = std::num::Wrapping(0x2000);
        cpu.regs.sr.interrupt_mask = 2;
        let mut mem = [0u8; 0x2000];
        cpu.process_exception(&mut mem[..], Vector::Level5Interrupt as u8).unwrap();

        assert_eq!(cpu.regs.sr.interrupt_mask, 5, "mask is raised to the interrupt level");
        // Pop the pushed SR back off the stack the exception entry just wrote.
        let sp = cpu.regs.sp();
        let pushed_sr = u16::from_be_bytes([mem[sp as usize], mem[sp as usize + 1]]);
        let pushed_mask = (pushed_sr >> 8) & 0b111;
        assert_eq!(pushed_mask, 2, "the frame on the stack must carry the pre-exception mask for RTE to restore");
    }

    #[test]
    fn exception_ordering_pops_highest_priority_last() {
        let mut set = BTreeSet::new();
        set.insert(Exception::from(Vector::Level1Interrupt));
        set.insert(Exception::from(Vector::Level7Interrupt));
        set.insert(Exception::from(Vector::IllegalInstruction));
        let order: Vec<u8> = set.iter().map(|e| e.vector).collect();
        assert_eq!(*order.last().unwrap(), Vector::Level7Interrupt as u8);
    }
}
