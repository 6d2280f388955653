// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded instruction shapes.
//!
//! An [`Instruction`] pairs the raw opcode and its address with an
//! [`Operands`] payload produced by the decode function registered for its
//! [`crate::isa::Isa`] entry.

use std::fmt;

use crate::addressing_modes::AddressingMode;
use crate::decoder;
use crate::disassembler;
use crate::isa::Isa;
use crate::memory_access::WordStream;

/// Operand width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub enum Size {
    Byte = 1,
    Word = 2,
    Long = 4,
}

impl Size {
    /// Decodes the two-bit size field used by MOVE (01=byte, 11=word, 10=long).
    pub const fn from_move(bits: u16) -> Self {
        match bits {
            0b01 => Size::Byte,
            0b11 => Size::Word,
            0b10 => Size::Long,
            _ => Size::Word,
        }
    }

    /// Decodes the single-bit size field used by most other instructions (0=word,1=long)
    /// or, when `wide` is false, the ADDQ/SUBQ/etc. 2-bit (00=byte,01=word,10=long) field.
    pub const fn from_bit(bit: u16) -> Self {
        if bit == 0 { Size::Word } else { Size::Long }
    }

    pub const fn from_2bits(bits: u16) -> Self {
        match bits & 0b11 {
            0b00 => Size::Byte,
            0b01 => Size::Word,
            _ => Size::Long,
        }
    }

    pub const fn is_byte(self) -> bool { matches!(self, Size::Byte) }
    pub const fn is_word(self) -> bool { matches!(self, Size::Word) }
    pub const fn is_long(self) -> bool { matches!(self, Size::Long) }

    /// For A7-relative byte accesses: returns Word, since stack alignment
    /// forces a 2-byte step even for byte operands (spec §3 invariant ii).
    pub const fn as_word_long(self) -> Self {
        if self.is_byte() { Size::Word } else { self }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Size::Byte => "B",
            Size::Word => "W",
            Size::Long => "L",
        })
    }
}

/// Direction of data movement for instructions whose opcode bit selects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub enum Direction {
    RegisterToMemory,
    MemoryToRegister,
    DstReg,
    DstEa,
    Left,
    Right,
    RegisterToUsp,
    UspToRegister,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => f.write_str("L"),
            Direction::Right => f.write_str("R"),
            _ => Ok(()),
        }
    }
}

/// Which of the eight shift/rotate operations (spec §4.D) is being performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub enum ShiftKind {
    /// ASL/ASR.
    Arithmetic,
    /// LSL/LSR.
    Logical,
    /// ROL/ROR.
    Rotate,
    /// ROXL/ROXR (rotate through X).
    RotateExtend,
}

/// Shift/rotate count: either immediate 1-8 or the low 6 bits of a `Dn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub enum ShiftCount {
    Immediate(u8),
    Register(u8),
}

/// Decoded operand payload. One variant per instruction operand shape.
///
/// Each accessor panics if called on the wrong variant -- an internal
/// invariant violation (decode/dispatch table mismatch), never a
/// guest-triggerable condition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "ffi", repr(C))]
pub enum Operands {
    NoOperands,
    /// ORI/ANDI/EORI to CCR or SR, STOP.
    Immediate(u16),
    /// size, ea, immediate value (ORI/ANDI/EORI/ADDI/SUBI/CMPI).
    SizeEffectiveAddressImmediate(Size, AddressingMode, u32),
    /// ea, count (ASL/LSL/... memory form has no count; used by MOVEM reg list count etc).
    EffectiveAddressCount(AddressingMode, u8),
    EffectiveAddress(AddressingMode),
    SizeEffectiveAddress(Size, AddressingMode),
    RegisterEffectiveAddress(u8, AddressingMode),
    /// size, ea, immediate data, register (CMPI/CHK-like or ADDQ/SUBQ: data,ea).
    SizeRegisterEffectiveAddress(Size, u8, AddressingMode),
    SizeEffectiveAddressEffectiveAddress(Size, AddressingMode, AddressingMode),
    /// register, opmode (3 bits), ea -- ADD/SUB/AND/OR/CMP Dn,ea forms.
    RegisterOpmodeRegister(u8, u8, AddressingMode),
    /// opmode, register -- ADDA/SUBA/CMPA/MULU/MULS/DIVU/DIVS: ea, opmode, register.
    OpmodeRegister(AddressingMode, u8, u8),
    Vector(u8),
    RegisterDisplacement(u8, i16),
    /// LINK.L (68030): frame pointer register, 32-bit displacement.
    RegisterDisplacementLong(u8, i32),
    Register(u8),
    DirectionRegister(Direction, u8),
    /// MOVEM: direction, size, register list bitmap, ea.
    DirectionSizeEffectiveAddressList(Direction, Size, u16, AddressingMode),
    Displacement(i32),
    ConditionDisplacement(u8, i32),
    ConditionEffectiveAddress(u8, AddressingMode),
    /// DBcc: condition, register, 16-bit displacement.
    ConditionRegisterDisplacement(u8, u8, i16),
    /// register, data (MOVEQ, ADDQ/SUBQ count as data).
    RegisterData(u8, i8),
    /// EXG: direction, reg, reg.
    RegisterDirectionRegister(u8, Direction, u8),
    /// size, direction, register, ea (ADD/SUB/AND/OR memory-to-reg or reg-to-memory).
    RegisterDirectionSizeEffectiveAddress(u8, Direction, Size, AddressingMode),
    /// register, size, ea -- CHK, LEA-adjacent shapes.
    RegisterSizeEffectiveAddress(u8, Size, AddressingMode),
    /// ABCD/SBCD/ADDX/SUBX: rx, direction (reg/mem), ry.
    RegisterDirectionRegisterX(u8, Direction, u8),
    /// Register shift/rotate form: kind, direction, size, count (immediate
    /// 1-8 or a Dn index), register.
    ShiftRotate { kind: ShiftKind, direction: Direction, size: Size, count: ShiftCount, register: u8 },
    /// Memory shift/rotate form: always word size, count of 1.
    ShiftRotateMem { kind: ShiftKind, direction: Direction, ea: AddressingMode },
    /// Bit-field instructions (68030): ea, offset (Dn index or imm), width (Dn index or imm), offset-is-reg, width-is-reg.
    BitField { ea: AddressingMode, offset: u8, offset_is_reg: bool, width: u8, width_is_reg: bool },
    /// Bit-field ops with a destination register (BFEXTU/BFEXTS/BFFFO): as above plus Dn.
    BitFieldRegister { ea: AddressingMode, offset: u8, offset_is_reg: bool, width: u8, width_is_reg: bool, register: u8 },
    /// Bit-field insert: as BitField plus source Dn.
    BitFieldInsert { ea: AddressingMode, offset: u8, offset_is_reg: bool, width: u8, width_is_reg: bool, register: u8 },
    /// MULS.L/MULU.L/DIVS.L/DIVU.L (68030): ea, dl (low/quotient reg), dh (high/remainder reg), is_signed, dh_used.
    LongMuldiv { ea: AddressingMode, dl: u8, dh: u8, is_signed: bool, dh_used: bool },
    /// CAS: ea, dc (compare), du (update).
    Cas { ea: AddressingMode, dc: u8, du: u8 },
    /// CAS2: size-selected two (Rn, Dc, Du) triples. `rn1`/`rn2` are raw
    /// 4-bit extension-word register fields (0-7 = Dn as an address holder,
    /// 8-15 = An-8).
    Cas2 { size: Size, rn1: u8, dc1: u8, du1: u8, rn2: u8, dc2: u8, du2: u8 },
    /// MOVEC: control register number, general register, is-address-register, direction.
    ControlRegister(u16, u8, bool, Direction),
    /// MOVES: ea, size, general register, is-address-register, direction
    /// (direction: RegisterToMemory moves the general register out to `ea`).
    MovesOperand { ea: AddressingMode, size: Size, general_register: u8, is_addr: bool, direction: Direction },
    /// PACK/UNPK: rx, ry, adjustment.
    PackUnpk(u8, u8, i16),
    /// EXG: which register file each side names (true = address register).
    Exchange { rx: u8, rx_is_addr: bool, ry: u8, ry_is_addr: bool },
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $ret:ty, $pat:pat, $body:expr) => {
        pub const fn $name(&self) -> $ret {
            if let Operands::$variant($pat) = self { $body } else { panic!("wrong Operands variant") }
        }
    };
}

impl Operands {
    accessor!(immediate, Immediate, u16, v, *v);
    accessor!(vector, Vector, u8, v, *v);
    accessor!(displacement, Displacement, i32, v, *v);
}

/// A fully decoded instruction: its raw opcode, the address it was fetched
/// from, and its operand payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: u16,
    pub pc: u32,
    pub isa: Isa,
    pub operands: Operands,
}

impl Instruction {
    /// Builds an instruction from an already-known opcode and operands
    /// (used by tests and by the assembler-less direct-execute path).
    pub const fn from_opcode(opcode: u16, pc: u32, isa: Isa, operands: Operands) -> Self {
        Self { opcode, pc, isa, operands }
    }

    /// Decodes one instruction from the given word stream, advancing it
    /// past the opcode and all extension words it consumes.
    pub fn from_memory(iter: &mut dyn WordStream, is_68030: bool) -> Result<Self, u8> {
        let pc = iter.next_addr();
        let opcode = iter.next_word()?;
        let isa = decoder::decode_opcode(opcode);
        let operands = decoder::decode_operands(isa, opcode, iter, is_68030)?;
        Ok(Self { opcode, pc, isa, operands })
    }

    /// Renders the instruction in Motorola assembler style.
    pub fn disassemble(&self) -> String {
        disassembler::disassemble(self)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disassemble())
    }
}
