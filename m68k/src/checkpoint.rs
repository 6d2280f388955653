// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bit-exact checkpoint save/restore of the processor state (spec §6).
//!
//! The image is a flat big-endian encoding of the fields in declaration
//! order, with no embedded version tag -- the outer checkpoint file
//! carries that. Restoring from a short or malformed buffer yields
//! [`CheckpointError`] rather than panicking, since the checkpoint stream
//! is the one externally-triggerable failure mode the core exposes (spec §7).

use std::num::Wrapping;

use crate::model::CpuModel;
use crate::status_register::StatusRegister;
use crate::{M68000, Registers};

/// The sole driver-visible failure mode of the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointError;

struct Writer(Vec<u8>);

impl Writer {
    fn u8(&mut self, v: u8) { self.0.push(v); }
    fn u32(&mut self, v: u32) { self.0.extend_from_slice(&v.to_be_bytes()); }
    fn u16(&mut self, v: u16) { self.0.extend_from_slice(&v.to_be_bytes()); }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8, CheckpointError> {
        let v = *self.data.get(self.pos).ok_or(CheckpointError)?;
        self.pos += 1;
        Ok(v)
    }

    fn u16(&mut self) -> Result<u16, CheckpointError> {
        let bytes = self.data.get(self.pos..self.pos + 2).ok_or(CheckpointError)?;
        self.pos += 2;
        Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, CheckpointError> {
        let bytes = self.data.get(self.pos..self.pos + 4).ok_or(CheckpointError)?;
        self.pos += 4;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }
}

impl<CPU: CpuModel> M68000<CPU> {
    /// Serializes the full processor state: registers, then model control
    /// registers, in field-declaration order.
    pub fn checkpoint_save(&self) -> Vec<u8> {
        let mut w = Writer(Vec::with_capacity(96));
        for d in self.regs.d { w.u32(d.0); }
        for a in self.regs.a { w.u32(a.0); }
        w.u32(self.regs.usp.0);
        w.u32(self.regs.ssp.0);
        w.u32(self.regs.msp.0);
        w.u16(self.regs.sr.into());
        w.u32(self.regs.pc.0);

        w.u32(self.vbr.0);
        w.u32(self.cacr);
        w.u32(self.caar);
        w.u8(self.sfc);
        w.u8(self.dfc);

        w.u32(self.instruction_pc.0);
        w.u8(self.ipl);
        w.u8(self.stop as u8);
        w.0
    }

    /// Restores processor state from a byte image produced by
    /// [`Self::checkpoint_save`]. Pending exceptions and the PMMU handle
    /// are not part of the image and are reset to empty/`None`.
    pub fn checkpoint_restore(data: &[u8]) -> Result<Self, CheckpointError> {
        let mut r = Reader { data, pos: 0 };
        let mut regs = Registers::default();
        for d in regs.d.iter_mut() { *d = Wrapping(r.u32()?); }
        for a in regs.a.iter_mut() { *a = Wrapping(r.u32()?); }
        regs.usp = Wrapping(r.u32()?);
        regs.ssp = Wrapping(r.u32()?);
        regs.msp = Wrapping(r.u32()?);
        regs.sr = StatusRegister::from(r.u16()?);
        regs.pc = Wrapping(r.u32()?);

        let vbr = Wrapping(r.u32()?);
        let cacr = r.u32()?;
        let caar = r.u32()?;
        let sfc = r.u8()?;
        let dfc = r.u8()?;

        let instruction_pc = Wrapping(r.u32()?);
        let ipl = r.u8()?;
        let stop = r.u8()? != 0;

        let mut cpu = Self::new_no_reset();
        cpu.regs = regs;
        cpu.vbr = vbr;
        cpu.cacr = cacr;
        cpu.caar = caar;
        cpu.sfc = sfc;
        cpu.dfc = dfc;
        cpu.instruction_pc = instruction_pc;
        cpu.ipl = ipl;
        cpu.stop = stop;
        Ok(cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mc68030;

    #[test]
    fn roundtrip_preserves_registers() {
        let mut cpu = M68000::<Mc68030>::new_cold();
        cpu.regs.d[3] = Wrapping(0xDEAD_BEEF);
        cpu.vbr = Wrapping(0x1000);
        cpu.ipl = 3;

        let image = cpu.checkpoint_save();
        let restored = M68000::<Mc68030>::checkpoint_restore(&image).unwrap();

        assert_eq!(restored.regs.d[3].0, 0xDEAD_BEEF);
        assert_eq!(restored.vbr.0, 0x1000);
        assert_eq!(restored.ipl, 3);
        assert_eq!(restored.regs.pc, cpu.regs.pc);
    }

    #[test]
    fn truncated_image_errors() {
        assert_eq!(M68000::<Mc68030>::checkpoint_restore(&[0; 4]), Err(CheckpointError));
    }
}
