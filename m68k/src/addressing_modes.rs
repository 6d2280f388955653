// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The effective-address engine (spec §4.C): decodes the mode/register
//! field pair into a tagged [`AddressingMode`], consumes brief or full
//! extension words, and exposes read/write/compute operations of any
//! width through [`crate::memory_access::MemoryAccess`].

use std::fmt;

use crate::exception::ILLEGAL_INSTRUCTION;
use crate::instruction::Size;
use crate::memory_access::{MemoryAccess, WordStream};
use crate::model::CpuModel;
use crate::utils::IsEven;
use crate::M68000;

/// A decoded addressing mode. Twelve canonical forms plus the 68030 full
/// extension word form.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub enum AddressingMode {
    /// Data register direct.
    Drd(u8),
    /// Address register direct.
    Ard(u8),
    /// Address register indirect.
    Ari(u8),
    /// Address register indirect, post-increment.
    Ariwpo(u8),
    /// Address register indirect, pre-decrement.
    Ariwpr(u8),
    /// Address register indirect with 16-bit displacement.
    Ariwd(u8, i16),
    /// Address register indirect with index, brief extension word.
    Ariwi8(u8, BriefExtensionWord),
    /// Absolute short.
    AbsShort(u16),
    /// Absolute long.
    AbsLong(u32),
    /// Program counter indirect with displacement.
    Pciwd(u32, i16),
    /// Program counter indirect with index, brief extension word.
    Pciwi8(u32, BriefExtensionWord),
    /// Immediate data, already sign/zero extended to 32 bits by the decoder.
    Immediate(u32),
    /// 68030 full extension word form (memory indirection, scaled index,
    /// suppressible base/index, 32-bit displacements).
    Full(FullExtensionWord),
}

impl AddressingMode {
    /// Decodes a mode/register pair, consuming any extension words from
    /// `words`. `long_pc_base` is the PC value the instruction's first
    /// extension word is relative to (used for PC-relative modes).
    pub fn from_memory(mode: u8, reg: u8, size: Size, words: &mut dyn WordStream, is_68030: bool) -> Result<Self, u8> {
        Ok(match mode {
            0b000 => AddressingMode::Drd(reg),
            0b001 => AddressingMode::Ard(reg),
            0b010 => AddressingMode::Ari(reg),
            0b011 => AddressingMode::Ariwpo(reg),
            0b100 => AddressingMode::Ariwpr(reg),
            0b101 => AddressingMode::Ariwd(reg, words.next_word()? as i16),
            0b110 => {
                let ext = words.next_word()?;
                if is_68030 && ext & 0x0100 != 0 {
                    AddressingMode::Full(FullExtensionWord::from_words(ext, Some(reg), words)?)
                } else {
                    AddressingMode::Ariwi8(reg, BriefExtensionWord(ext))
                }
            }
            0b111 => match reg {
                0b000 => AddressingMode::AbsShort(words.next_word()?),
                0b001 => AddressingMode::AbsLong(words.next_long()?),
                0b010 => {
                    let pc = words.next_addr();
                    AddressingMode::Pciwd(pc, words.next_word()? as i16)
                }
                0b011 => {
                    let pc = words.next_addr();
                    let ext = words.next_word()?;
                    if is_68030 && ext & 0x0100 != 0 {
                        AddressingMode::Full(FullExtensionWord::from_words(ext, None, words)?)
                    } else {
                        AddressingMode::Pciwi8(pc, BriefExtensionWord(ext))
                    }
                }
                0b100 => AddressingMode::Immediate(match size {
                    Size::Byte => words.next_word()? as u8 as u32,
                    Size::Word => words.next_word()? as u32,
                    Size::Long => words.next_long()?,
                }),
                _ => return Err(ILLEGAL_INSTRUCTION),
            },
            _ => return Err(ILLEGAL_INSTRUCTION),
        })
    }

    pub const fn is_drd(&self) -> bool { matches!(self, AddressingMode::Drd(_)) }
    pub const fn is_ard(&self) -> bool { matches!(self, AddressingMode::Ard(_)) }
    pub const fn is_immediate(&self) -> bool { matches!(self, AddressingMode::Immediate(_)) }
    pub const fn is_ariwpo(&self) -> bool { matches!(self, AddressingMode::Ariwpo(_)) }
    pub const fn is_ariwpr(&self) -> bool { matches!(self, AddressingMode::Ariwpr(_)) }

    /// True for register-direct modes (Dn or An), which are never memory
    /// operands and never valid "Memory" category destinations.
    pub const fn register(&self) -> bool {
        matches!(self, AddressingMode::Drd(_) | AddressingMode::Ard(_))
    }

    /// Validates this mode against a categorical set (spec §4.C).
    pub fn validate(&self, category: EaCategory) -> Result<(), u8> {
        let ok = match self {
            AddressingMode::Drd(_) => category.contains(EaCategory::DATA),
            AddressingMode::Ard(_) => category.contains(EaCategory::ADDRESS),
            AddressingMode::Immediate(_) => category.contains(EaCategory::IMMEDIATE),
            // Post-increment/pre-decrement are alterable memory but never
            // "control" (LEA/PEA/JMP/JSR on these is illegal on real hardware).
            AddressingMode::Ariwpo(_) | AddressingMode::Ariwpr(_) => category.contains(EaCategory::MEMORY),
            // PC-relative is "control" (a valid LEA/JMP source) but never
            // alterable (can't be a MOVE destination).
            AddressingMode::Pciwd(..) | AddressingMode::Pciwi8(..) => category.contains(EaCategory::CONTROL),
            // (An), (d16,An), (d8,An,Xn)/full, and both absolute forms are
            // both alterable memory and control addressing modes.
            _ => category.intersects(EaCategory::MEMORY | EaCategory::CONTROL),
        };
        if ok { Ok(()) } else { Err(ILLEGAL_INSTRUCTION) }
    }
}

bitflags::bitflags! {
    /// Categorical addressing-mode sets used by instruction validation.
    ///
    /// `IMMEDIATE` is a distinct bit from `DATA` (an earlier revision
    /// aliased them, which let `#imm` pass validation against any
    /// alterable-destination set -- see DESIGN.md).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EaCategory: u8 {
        const DATA      = 0b00001;
        const ADDRESS   = 0b00010;
        const MEMORY    = 0b00100;
        const CONTROL   = 0b01000;
        const IMMEDIATE = 0b10000;
        const ALTERABLE = Self::DATA.bits() | Self::ADDRESS.bits() | Self::MEMORY.bits();
        const DATA_ALTERABLE = Self::DATA.bits() | Self::MEMORY.bits();
        /// Everything except address-register-direct: the common "source
        /// data" category accepted by ADD/SUB/AND/OR/CMP/EOR-style operands.
        const DATA_SOURCE = Self::DATA.bits() | Self::MEMORY.bits() | Self::CONTROL.bits() | Self::IMMEDIATE.bits();
        const ALL = Self::DATA.bits() | Self::ADDRESS.bits() | Self::MEMORY.bits() | Self::CONTROL.bits() | Self::IMMEDIATE.bits();
    }
}

/// A brief extension word: index register selector, size, scale, and an
/// 8-bit signed displacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub struct BriefExtensionWord(pub u16);

impl BriefExtensionWord {
    pub const fn new(address: bool, reg: u8, long: bool, disp: i8) -> Self {
        Self((address as u16) << 15 | (reg as u16) << 12 | (long as u16) << 11 | disp as u8 as u16)
    }

    pub const fn disp(self) -> i8 { self.0 as u8 as i8 }
    pub const fn is_address_reg(self) -> bool { self.0 & 0x8000 != 0 }
    pub const fn reg(self) -> u8 { ((self.0 >> 12) & 0b111) as u8 }
    pub const fn is_long(self) -> bool { self.0 & 0x0800 != 0 }
    pub const fn scale(self) -> u8 { 1 << ((self.0 >> 9) & 0b11) }
}

impl fmt::Display for BriefExtensionWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", if self.is_address_reg() { "A" } else { "D" }, self.reg(), if self.is_long() { "L" } else { "W" })
    }
}

/// Pre/post-indexed one-level memory indirection selected by the IIS field
/// of a full extension word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub enum Indirection {
    None,
    PreIndexed,
    PostIndexed,
}

/// The 68030 full extension word (spec §4.C / §3 "Full extension word").
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub struct FullExtensionWord {
    /// `Some(reg)` for An-based forms, `None` for PC-relative forms.
    pub base_register: Option<u8>,
    /// True if the base (An or PC) is suppressed and contributes 0.
    pub base_suppress: bool,
    pub index: Option<(bool, u8, bool, u8)>, // (is_address, reg, is_long, scale)
    pub base_displacement: i32,
    pub indirection: Indirection,
    pub outer_displacement: i32,
}

impl FullExtensionWord {
    fn from_words(ext: u16, base_reg: Option<u8>, words: &mut dyn WordStream) -> Result<Self, u8> {
        let index_suppress = ext & 0x0040 != 0;
        let base_suppress = ext & 0x0080 != 0;
        let bd_size = (ext >> 4) & 0b11;
        let iis = ext & 0b111;

        let index = if index_suppress {
            None
        } else {
            Some((ext & 0x8000 != 0, ((ext >> 12) & 0b111) as u8, ext & 0x0800 != 0, 1u8 << ((ext >> 9) & 0b11)))
        };

        let base_displacement = match bd_size {
            0b10 => words.next_word()? as i16 as i32,
            0b11 => words.next_long()? as i32,
            _ => 0,
        };

        let indirection = match iis {
            0b000 => Indirection::None,
            0b001..=0b011 => Indirection::PreIndexed,
            0b101..=0b111 => Indirection::PostIndexed,
            _ => Indirection::None,
        };

        let od_size = iis & 0b11;
        let outer_displacement = match (indirection, od_size) {
            (Indirection::None, _) => 0,
            (_, 0b10) => words.next_word()? as i16 as i32,
            (_, 0b11) => words.next_long()? as i32,
            _ => 0,
        };

        Ok(Self {
            base_register: base_reg,
            base_suppress,
            index,
            base_displacement,
            indirection,
            outer_displacement,
        })
    }
}

/// A memory-class addressing mode paired with its effective address, computed
/// lazily and cached after the first access.
///
/// Instructions that read then write the same operand (ADD <ea>,Dn's mirror
/// ADD Dn,<ea>, Scc, NEG, ...) must compute the address only once: `(A0)+`
/// and `-(A0)` mutate `A0` as a side effect of computing the address, so a
/// naive re-computation on the write would double-apply the increment or
/// decrement. This mirrors the teacher's `EffectiveAddress` cache.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveAddress {
    pub mode: AddressingMode,
    address: Option<u32>,
    size: Option<Size>,
}

impl EffectiveAddress {
    pub const fn new(mode: AddressingMode, size: Option<Size>) -> Self {
        Self { mode, address: None, size }
    }
}

impl<CPU: CpuModel> M68000<CPU> {
    /// Computes the effective address of `ea.mode`, reusing `ea.address` if
    /// a previous call already computed it (see [`EffectiveAddress`]).
    /// Register-direct and immediate modes have no address and must not
    /// reach this function.
    pub(crate) fn effective_address(&mut self, ea: &mut EffectiveAddress, memory: &mut impl MemoryAccess) -> Result<u32, u8> {
        if let Some(addr) = ea.address {
            return Ok(addr);
        }
        let addr = self.get_effective_address(&ea.mode, ea.size, memory, true)?;
        ea.address = Some(addr);
        Ok(addr)
    }

    /// Computes the effective address of a memory-class addressing mode,
    /// always freshly (no caching). Most callers should go through
    /// [`Self::effective_address`] instead; this is used where an operand
    /// is only ever touched once (LEA, PEA, JMP, JSR, branch targets).
    pub(crate) fn get_effective_address(&mut self, mode: &AddressingMode, size: Option<Size>, memory: &mut impl MemoryAccess, _increment: bool) -> Result<u32, u8> {
        Ok(match *mode {
            AddressingMode::Ari(reg) => self.regs.a(reg),
            AddressingMode::Ariwpo(reg) => {
                let addr = self.regs.a(reg);
                let size = size.unwrap_or(Size::Word);
                let step = if reg == 7 { size.as_word_long() } else { size };
                *self.regs.a_mut(reg) += step as u32;
                addr
            }
            AddressingMode::Ariwpr(reg) => {
                let step = if reg == 7 { size.unwrap_or(Size::Word).as_word_long() } else { size.unwrap_or(Size::Word) };
                *self.regs.a_mut(reg) -= step as u32;
                self.regs.a(reg)
            }
            AddressingMode::Ariwd(reg, disp) => self.regs.a(reg).wrapping_add(disp as i32 as u32),
            AddressingMode::Ariwi8(reg, brief) => {
                let base = self.regs.a(reg);
                let index = self.get_index_register(brief);
                base.wrapping_add(index).wrapping_add(brief.disp() as i32 as u32)
            }
            AddressingMode::AbsShort(addr) => addr as i16 as i32 as u32,
            AddressingMode::AbsLong(addr) => addr,
            AddressingMode::Pciwd(pc, disp) => pc.wrapping_add(disp as i32 as u32),
            AddressingMode::Pciwi8(pc, brief) => {
                let index = self.get_index_register(brief);
                pc.wrapping_add(index).wrapping_add(brief.disp() as i32 as u32)
            }
            AddressingMode::Full(full) => self.get_full_effective_address(full, memory)?,
            AddressingMode::Drd(_) | AddressingMode::Ard(_) | AddressingMode::Immediate(_) =>
                unreachable!("register/immediate modes have no effective address"),
        }
        .even()?)
    }

    /// Computes `(An)+` and applies the post-increment, independently of any
    /// [`EffectiveAddress`] cache. ABCD/SBCD/ADDX/SUBX/CMPM in their
    /// memory-operand form touch two distinct predecrement/postincrement
    /// operands per instruction, which a single cached `EffectiveAddress`
    /// cannot represent, so these go through a bare register index instead.
    pub(crate) fn ariwpo(&mut self, reg: u8, size: Size) -> u32 {
        let addr = self.regs.a(reg);
        let step = if reg == 7 { size.as_word_long() } else { size };
        *self.regs.a_mut(reg) += step as u32;
        addr
    }

    /// Computes `-(An)` and applies the pre-decrement. See [`Self::ariwpo`].
    pub(crate) fn ariwpr(&mut self, reg: u8, size: Size) -> u32 {
        let step = if reg == 7 { size.as_word_long() } else { size };
        *self.regs.a_mut(reg) -= step as u32;
        self.regs.a(reg)
    }

    fn get_index_register(&self, brief: BriefExtensionWord) -> u32 {
        let raw = if brief.is_address_reg() { self.regs.a(brief.reg()) } else { self.regs.d[brief.reg() as usize].0 };
        let raw = if brief.is_long() { raw } else { raw as i16 as i32 as u32 };
        raw.wrapping_mul(brief.scale() as u32)
    }

    fn get_full_effective_address(&mut self, full: FullExtensionWord, memory: &mut impl MemoryAccess) -> Result<u32, u8> {
        let base = if full.base_suppress {
            0
        } else {
            match full.base_register {
                Some(reg) => self.regs.a(reg),
                None => self.regs.pc.0,
            }
        };
        let base = base.wrapping_add(full.base_displacement as u32);

        let index = match full.index {
            Some((is_addr, reg, is_long, scale)) => {
                let raw = if is_addr { self.regs.a(reg) } else { self.regs.d[reg as usize].0 };
                let raw = if is_long { raw } else { raw as i16 as i32 as u32 };
                raw.wrapping_mul(scale as u32)
            }
            None => 0,
        };

        match full.indirection {
            Indirection::None => Ok(base.wrapping_add(index)),
            Indirection::PreIndexed => {
                let intermediate = base.wrapping_add(index);
                let ptr = memory.get_long(intermediate).ok_or(crate::exception::ACCESS_ERROR)?;
                Ok(ptr.wrapping_add(full.outer_displacement as u32))
            }
            Indirection::PostIndexed => {
                let ptr = memory.get_long(base).ok_or(crate::exception::ACCESS_ERROR)?;
                Ok(ptr.wrapping_add(index).wrapping_add(full.outer_displacement as u32))
            }
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressingMode::Drd(r) => write!(f, "D{r}"),
            AddressingMode::Ard(r) => write!(f, "A{r}"),
            AddressingMode::Ari(r) => write!(f, "(A{r})"),
            AddressingMode::Ariwpo(r) => write!(f, "(A{r})+"),
            AddressingMode::Ariwpr(r) => write!(f, "-(A{r})"),
            AddressingMode::Ariwd(r, d) => write!(f, "({d:#X},A{r})"),
            AddressingMode::Ariwi8(r, brief) => write!(f, "({:#X},A{r},{brief})", brief.disp()),
            AddressingMode::AbsShort(a) => write!(f, "({a:#X}).W"),
            AddressingMode::AbsLong(a) => write!(f, "({a:#X}).L"),
            AddressingMode::Pciwd(_, d) => write!(f, "({d:#X},PC)"),
            AddressingMode::Pciwi8(_, brief) => write!(f, "({:#X},PC,{brief})", brief.disp()),
            AddressingMode::Immediate(v) => write!(f, "#{v:#X}"),
            AddressingMode::Full(full) => {
                let base = match full.base_register {
                    _ if full.base_suppress => "ZPC/ZAn".to_string(),
                    Some(r) => format!("A{r}"),
                    None => "PC".to_string(),
                };
                let index = match full.index {
                    None => String::new(),
                    Some((is_addr, reg, is_long, scale)) => {
                        let reg_name = if is_addr { format!("A{reg}") } else { format!("D{reg}") };
                        let size = if is_long { "L" } else { "W" };
                        if scale > 1 { format!(",{reg_name}.{size}*{scale}") } else { format!(",{reg_name}.{size}") }
                    }
                };
                let bd = if full.base_displacement != 0 { format!("{:#X},", full.base_displacement) } else { String::new() };
                match full.indirection {
                    Indirection::None => write!(f, "({bd}{base}{index})"),
                    Indirection::PreIndexed => {
                        let od = if full.outer_displacement != 0 { format!(",{:#X}", full.outer_displacement) } else { String::new() };
                        write!(f, "([{bd}{base}{index}]{od})")
                    }
                    Indirection::PostIndexed => {
                        let od = if full.outer_displacement != 0 { format!(",{:#X}", full.outer_displacement) } else { String::new() };
                        write!(f, "([{bd}{base}]{index}{od})")
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drd_has_no_side_effects_via_category() {
        let mode = AddressingMode::Drd(3);
        assert!(mode.validate(EaCategory::DATA).is_ok());
        assert!(mode.validate(EaCategory::ADDRESS).is_err());
    }

    #[test]
    fn brief_extension_word_roundtrip() {
        let b = BriefExtensionWord::new(true, 5, true, -4);
        assert!(b.is_address_reg());
        assert_eq!(b.reg(), 5);
        assert!(b.is_long());
        assert_eq!(b.disp(), -4);
    }
}
