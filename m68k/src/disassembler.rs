// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motorola-style textual disassembly.
//!
//! [`disassemble`] is a pure function of an already-decoded [`Instruction`]:
//! it reads the opcode and operand payload and never touches memory or CPU
//! state. [`disasm`] wraps it for callers that only have a raw word stream.

use crate::addressing_modes::AddressingMode;
use crate::instruction::{Direction, Instruction, Operands, ShiftCount, ShiftKind};
use crate::isa::Isa;
use crate::memory_access::WordStream;
use crate::status_register::disassemble_conditional_test;

/// Renders a PC-relative branch target the way the traditional Motorola
/// assemblers do: an offset from the instruction, not an absolute address.
fn branch_target(displacement: i32) -> String {
    if displacement >= 0 {
        format!("*+${displacement:02X}")
    } else {
        format!("*-${:02X}", -displacement)
    }
}

/// `S`/`W`/`L` size suffix for BRA/BSR/Bcc, inferred from the opcode's low
/// byte the same way the decoder chose how many extension words to consume.
fn branch_suffix(opcode: u16, displacement: i32) -> &'static str {
    let disp8 = opcode as i8;
    if disp8 == 0 {
        "W"
    } else if disp8 == -1 && displacement != -1 {
        "L"
    } else {
        "S"
    }
}

fn register_name(idx: usize) -> String {
    if idx < 8 { format!("D{idx}") } else { format!("A{}", idx - 8) }
}

/// Compacts a contiguous run of set bits in `present[range]` into `Dn-Dm` or
/// `An-Am` tokens, falling back to single register names for isolated bits.
fn compact_range(present: &[bool]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < present.len() {
        if !present[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < present.len() && present[i] {
            i += 1;
        }
        let end = i - 1;
        if end == start {
            parts.push(register_name(start));
        } else {
            parts.push(format!("{}-{}", register_name(start), register_name(end)));
        }
    }
    parts
}

/// MOVEM register list, e.g. `D0-D7/A0-A6`. `predecrement` selects the
/// reversed bit-to-register mapping `-(An)` uses (see
/// [`crate::interpreter::M68000::execute_movem`]'s `bit_for` helper, which
/// this mirrors).
fn format_register_list(list: u16, predecrement: bool) -> String {
    let mut present = [false; 16];
    for bit in 0..16u8 {
        if list & (1 << bit) == 0 {
            continue;
        }
        let (is_addr, n) = if predecrement {
            if bit < 8 { (true, 7 - bit) } else { (false, 15 - bit) }
        } else if bit < 8 {
            (false, bit)
        } else {
            (true, bit - 8)
        };
        present[if is_addr { 8 + n as usize } else { n as usize }] = true;
    }
    let mut parts = compact_range(&present[0..8]);
    parts.extend(compact_range(&present[8..16]));
    parts.join("/")
}

fn disassemble_move(inst: &Instruction) -> String {
    if let Operands::SizeEffectiveAddressEffectiveAddress(size, src, dst) = &inst.operands {
        if inst.isa == Isa::Movea {
            format!("MOVEA.{size} {src},{dst}")
        } else {
            format!("MOVE.{size} {src},{dst}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_moveq(inst: &Instruction) -> String {
    if let Operands::RegisterData(r, d) = &inst.operands {
        format!("MOVEQ.L #{d},D{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_move_ccr_sr(inst: &Instruction) -> String {
    if let Operands::SizeEffectiveAddress(_, ea) = &inst.operands {
        match inst.isa {
            Isa::MoveToCcr => format!("MOVE {ea},CCR"),
            Isa::MoveFromCcr => format!("MOVE CCR,{ea}"),
            Isa::MoveToSr => format!("MOVE {ea},SR"),
            Isa::MoveFromSr => format!("MOVE SR,{ea}"),
            _ => unreachable!(),
        }
    } else {
        unreachable!()
    }
}

fn disassemble_move_usp(inst: &Instruction) -> String {
    if let Operands::DirectionRegister(dir, r) = &inst.operands {
        if *dir == Direction::UspToRegister {
            format!("MOVE USP,A{r}")
        } else {
            format!("MOVE A{r},USP")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_movem(inst: &Instruction) -> String {
    if let Operands::DirectionSizeEffectiveAddressList(dir, size, list, ea) = &inst.operands {
        let predecrement = matches!(ea, AddressingMode::Ariwpr(_));
        let list = format_register_list(*list, predecrement);
        if *dir == Direction::MemoryToRegister {
            format!("MOVEM.{size} {ea},{list}")
        } else {
            format!("MOVEM.{size} {list},{ea}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_movep(inst: &Instruction) -> String {
    if let Operands::RegisterDirectionSizeEffectiveAddress(dreg, dir, size, ea) = &inst.operands {
        if *dir == Direction::RegisterToMemory {
            format!("MOVEP.{size} D{dreg},{ea}")
        } else {
            format!("MOVEP.{size} {ea},D{dreg}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_movec(inst: &Instruction) -> String {
    if let Operands::ControlRegister(creg, greg, is_addr, dir) = &inst.operands {
        let general = if *is_addr { format!("A{greg}") } else { format!("D{greg}") };
        if *dir == Direction::RegisterToMemory {
            format!("MOVEC {general},{creg:#X}")
        } else {
            format!("MOVEC {creg:#X},{general}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_moves(inst: &Instruction) -> String {
    if let Operands::MovesOperand { ea, size, general_register, is_addr, direction } = &inst.operands {
        let general = if *is_addr { format!("A{general_register}") } else { format!("D{general_register}") };
        if *direction == Direction::RegisterToMemory {
            format!("MOVES.{size} {general},{ea}")
        } else {
            format!("MOVES.{size} {ea},{general}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_lea(inst: &Instruction) -> String {
    if let Operands::RegisterEffectiveAddress(r, ea) = &inst.operands {
        format!("LEA {ea},A{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_pea(inst: &Instruction) -> String {
    if let Operands::EffectiveAddress(ea) = &inst.operands {
        format!("PEA {ea}")
    } else {
        unreachable!()
    }
}

/// ADD/SUB/AND/OR/CMP/EOR Dn,ea and ea,Dn forms share one opmode-keyed
/// direction bit (spec §4.D): bit 2 of opmode set means the ea is the
/// destination, matching `dst_is_ea` in the execute-side kernel.
fn disassemble_alu_opmode(inst: &Instruction) -> String {
    if let Operands::RegisterOpmodeRegister(r, opmode, ea) = &inst.operands {
        let size = crate::instruction::Size::from_2bits(*opmode as u16);
        let mnemonic = match inst.isa {
            Isa::Add => "ADD",
            Isa::Sub => "SUB",
            Isa::And => "AND",
            Isa::Or => "OR",
            Isa::Eor => "EOR",
            Isa::Cmp => "CMP",
            _ => unreachable!(),
        };
        if inst.isa == Isa::Cmp {
            format!("CMP.{size} {ea},D{r}")
        } else if inst.isa == Isa::Eor {
            format!("EOR.{size} D{r},{ea}")
        } else if opmode & 0b100 != 0 {
            format!("{mnemonic}.{size} D{r},{ea}")
        } else {
            format!("{mnemonic}.{size} {ea},D{r}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_alu_address(inst: &Instruction) -> String {
    if let Operands::OpmodeRegister(ea, opmode, r) = &inst.operands {
        let size = if opmode & 0b001 != 0 { "L" } else { "W" };
        let mnemonic = match inst.isa {
            Isa::Adda => "ADDA",
            Isa::Suba => "SUBA",
            Isa::Cmpa => "CMPA",
            _ => unreachable!(),
        };
        format!("{mnemonic}.{size} {ea},A{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_alu_immediate(inst: &Instruction) -> String {
    if let Operands::SizeEffectiveAddressImmediate(size, ea, imm) = &inst.operands {
        let mnemonic = match inst.isa {
            Isa::Addi => "ADDI",
            Isa::Subi => "SUBI",
            Isa::Andi => "ANDI",
            Isa::Ori => "ORI",
            Isa::Eori => "EORI",
            Isa::Cmpi => "CMPI",
            _ => unreachable!(),
        };
        format!("{mnemonic}.{size} #{imm:#X},{ea}")
    } else {
        unreachable!()
    }
}

fn disassemble_imm_to_ccr_sr(inst: &Instruction) -> String {
    if let Operands::Immediate(imm) = &inst.operands {
        match inst.isa {
            Isa::OriCcr => format!("ORI #{imm:#X},CCR"),
            Isa::OriSr => format!("ORI #{imm:#X},SR"),
            Isa::AndiCcr => format!("ANDI #{imm:#X},CCR"),
            Isa::AndiSr => format!("ANDI #{imm:#X},SR"),
            Isa::EoriCcr => format!("EORI #{imm:#X},CCR"),
            Isa::EoriSr => format!("EORI #{imm:#X},SR"),
            Isa::Stop => format!("STOP #{imm:#X}"),
            _ => unreachable!(),
        }
    } else {
        unreachable!()
    }
}

fn disassemble_quick(inst: &Instruction) -> String {
    if let Operands::SizeRegisterEffectiveAddress(size, data, ea) = &inst.operands {
        let mnemonic = if inst.isa == Isa::Addq { "ADDQ" } else { "SUBQ" };
        format!("{mnemonic}.{size} #{data},{ea}")
    } else {
        unreachable!()
    }
}

fn disassemble_bitop(inst: &Instruction) -> String {
    if let Operands::SizeRegisterEffectiveAddress(_, n, ea) = &inst.operands {
        let mnemonic = match inst.isa {
            Isa::Btst => "BTST",
            Isa::Bchg => "BCHG",
            Isa::Bclr => "BCLR",
            Isa::Bset => "BSET",
            _ => unreachable!(),
        };
        if inst.opcode & 0x0100 != 0 {
            format!("{mnemonic} D{n},{ea}")
        } else {
            format!("{mnemonic} #{n},{ea}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_unary(inst: &Instruction) -> String {
    if let Operands::SizeEffectiveAddress(size, ea) = &inst.operands {
        let mnemonic = match inst.isa {
            Isa::Neg => "NEG",
            Isa::NegX => "NEGX",
            Isa::Clr => "CLR",
            Isa::Not => "NOT",
            Isa::Tst => "TST",
            _ => unreachable!(),
        };
        format!("{mnemonic}.{size} {ea}")
    } else {
        unreachable!()
    }
}

fn disassemble_nbcd(inst: &Instruction) -> String {
    if let Operands::SizeEffectiveAddress(_, ea) = &inst.operands {
        format!("NBCD {ea}")
    } else {
        unreachable!()
    }
}

fn disassemble_tas(inst: &Instruction) -> String {
    if let Operands::SizeEffectiveAddress(_, ea) = &inst.operands {
        format!("TAS {ea}")
    } else {
        unreachable!()
    }
}

fn disassemble_ext(inst: &Instruction) -> String {
    if let Operands::RegisterData(r, size) = &inst.operands {
        let suffix = if *size == 4 { "L" } else { "W" };
        format!("EXT.{suffix} D{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_extb(inst: &Instruction) -> String {
    if let Operands::Register(r) = &inst.operands {
        format!("EXTB.L D{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_swap(inst: &Instruction) -> String {
    if let Operands::Register(r) = &inst.operands {
        format!("SWAP D{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_exg(inst: &Instruction) -> String {
    if let Operands::Exchange { rx, rx_is_addr, ry, ry_is_addr } = &inst.operands {
        let x = if *rx_is_addr { format!("A{rx}") } else { format!("D{rx}") };
        let y = if *ry_is_addr { format!("A{ry}") } else { format!("D{ry}") };
        format!("EXG {x},{y}")
    } else {
        unreachable!()
    }
}

fn shift_mnemonic(kind: ShiftKind) -> &'static str {
    match kind {
        ShiftKind::Arithmetic => "AS",
        ShiftKind::Logical => "LS",
        ShiftKind::Rotate => "RO",
        ShiftKind::RotateExtend => "ROX",
    }
}

fn disassemble_shift_rotate_reg(inst: &Instruction) -> String {
    if let Operands::ShiftRotate { kind, direction, size, count, register } = &inst.operands {
        let mnemonic = shift_mnemonic(*kind);
        match count {
            ShiftCount::Immediate(n) => format!("{mnemonic}{direction}.{size} #{n},D{register}"),
            ShiftCount::Register(r) => format!("{mnemonic}{direction}.{size} D{r},D{register}"),
        }
    } else {
        unreachable!()
    }
}

fn disassemble_shift_rotate_mem(inst: &Instruction) -> String {
    if let Operands::ShiftRotateMem { kind, direction, ea } = &inst.operands {
        format!("{}{} {ea}", shift_mnemonic(*kind), direction)
    } else {
        unreachable!()
    }
}

fn disassemble_muldiv(inst: &Instruction) -> String {
    if let Operands::OpmodeRegister(ea, _, r) = &inst.operands {
        let mnemonic = match inst.isa {
            Isa::Muls => "MULS.W",
            Isa::Mulu => "MULU.W",
            Isa::Divs => "DIVS.W",
            Isa::Divu => "DIVU.W",
            _ => unreachable!(),
        };
        format!("{mnemonic} {ea},D{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_muldivl(inst: &Instruction) -> String {
    if let Operands::LongMuldiv { ea, dl, dh, is_signed, dh_used } = &inst.operands {
        let mnemonic = if *is_signed { "S.L" } else { "U.L" };
        if *dh_used {
            format!("MUL{mnemonic} {ea},D{dh}:D{dl}")
        } else {
            format!("MUL{mnemonic} {ea},D{dl}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_abcd_sbcd_addx_subx(inst: &Instruction) -> String {
    // RegisterDirectionRegisterX stores (source = reg bits 2-0, mode, dest = reg bits 11-9).
    if let Operands::RegisterDirectionRegisterX(src, mode, dst) = &inst.operands {
        let mnemonic = match inst.isa {
            Isa::Abcd => "ABCD".to_string(),
            Isa::Sbcd => "SBCD".to_string(),
            Isa::Addx => format!("ADDX.{}", crate::instruction::Size::from_2bits((inst.opcode >> 6) as u16)),
            Isa::Subx => format!("SUBX.{}", crate::instruction::Size::from_2bits((inst.opcode >> 6) as u16)),
            _ => unreachable!(),
        };
        if *mode == Direction::RegisterToMemory {
            format!("{mnemonic} -(A{src}),-(A{dst})")
        } else {
            format!("{mnemonic} D{src},D{dst}")
        }
    } else {
        unreachable!()
    }
}

fn disassemble_pack_unpk(inst: &Instruction) -> String {
    if let Operands::PackUnpk(rx, ry, adj) = &inst.operands {
        let mnemonic = if inst.isa == Isa::Pack { "PACK" } else { "UNPK" };
        format!("{mnemonic} D{rx},D{ry},#{adj:#X}")
    } else {
        unreachable!()
    }
}

fn bitfield_spec(ea: &AddressingMode, offset: u8, offset_is_reg: bool, width: u8, width_is_reg: bool) -> String {
    let offset = if offset_is_reg { format!("D{offset}") } else { format!("#{offset}") };
    let width = if width_is_reg { format!("D{width}") } else if width == 0 { "#32".to_string() } else { format!("#{width}") };
    format!("{ea}{{{offset}:{width}}}")
}

fn disassemble_bitfield(inst: &Instruction) -> String {
    match &inst.operands {
        Operands::BitField { ea, offset, offset_is_reg, width, width_is_reg } => {
            let mnemonic = match inst.isa {
                Isa::Bftst => "BFTST",
                Isa::Bfchg => "BFCHG",
                Isa::Bfclr => "BFCLR",
                Isa::Bfset => "BFSET",
                _ => unreachable!(),
            };
            format!("{mnemonic} {}", bitfield_spec(ea, *offset, *offset_is_reg, *width, *width_is_reg))
        }
        Operands::BitFieldRegister { ea, offset, offset_is_reg, width, width_is_reg, register } => {
            let mnemonic = match inst.isa {
                Isa::Bfextu => "BFEXTU",
                Isa::Bfexts => "BFEXTS",
                Isa::Bfffo => "BFFFO",
                _ => unreachable!(),
            };
            format!("{mnemonic} {},D{register}", bitfield_spec(ea, *offset, *offset_is_reg, *width, *width_is_reg))
        }
        Operands::BitFieldInsert { ea, offset, offset_is_reg, width, width_is_reg, register } => {
            format!("BFINS D{register},{}", bitfield_spec(ea, *offset, *offset_is_reg, *width, *width_is_reg))
        }
        _ => unreachable!(),
    }
}

fn disassemble_chk(inst: &Instruction) -> String {
    if let Operands::RegisterSizeEffectiveAddress(r, size, ea) = &inst.operands {
        format!("CHK.{size} {ea},D{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_bra_bsr(inst: &Instruction) -> String {
    if let Operands::Displacement(disp) = &inst.operands {
        let mnemonic = if inst.isa == Isa::Bra { "BRA" } else { "BSR" };
        format!("{mnemonic}.{} {}", branch_suffix(inst.opcode, *disp), branch_target(*disp))
    } else {
        unreachable!()
    }
}

fn disassemble_bcc(inst: &Instruction) -> String {
    if let Operands::ConditionDisplacement(cc, disp) = &inst.operands {
        format!(
            "B{}.{} {}",
            disassemble_conditional_test(*cc),
            branch_suffix(inst.opcode, *disp),
            branch_target(*disp)
        )
    } else {
        unreachable!()
    }
}

fn disassemble_dbcc(inst: &Instruction) -> String {
    if let Operands::ConditionRegisterDisplacement(cc, r, disp) = &inst.operands {
        format!("DB{} D{r},{}", disassemble_conditional_test(*cc), branch_target(*disp as i32))
    } else {
        unreachable!()
    }
}

fn disassemble_scc(inst: &Instruction) -> String {
    if let Operands::ConditionEffectiveAddress(cc, ea) = &inst.operands {
        format!("S{} {ea}", disassemble_conditional_test(*cc))
    } else {
        unreachable!()
    }
}

fn disassemble_trapcc(inst: &Instruction) -> String {
    if let Operands::ConditionDisplacement(cc, operand) = &inst.operands {
        let cc = disassemble_conditional_test(*cc);
        match inst.opcode & 0b111 {
            0b010 => format!("TRAP{cc}.W #{operand:#X}"),
            0b011 => format!("TRAP{cc}.L #{operand:#X}"),
            _ => format!("TRAP{cc}"),
        }
    } else {
        unreachable!()
    }
}

fn disassemble_jmp_jsr(inst: &Instruction) -> String {
    if let Operands::EffectiveAddress(ea) = &inst.operands {
        format!("{} {ea}", if inst.isa == Isa::Jmp { "JMP" } else { "JSR" })
    } else {
        unreachable!()
    }
}

fn disassemble_link(inst: &Instruction) -> String {
    match &inst.operands {
        Operands::RegisterDisplacement(r, disp) => format!("LINK.W A{r},#{disp}"),
        Operands::RegisterDisplacementLong(r, disp) => format!("LINK.L A{r},#{disp}"),
        _ => unreachable!(),
    }
}

fn disassemble_unlk(inst: &Instruction) -> String {
    if let Operands::Register(r) = &inst.operands {
        format!("UNLK A{r}")
    } else {
        unreachable!()
    }
}

fn disassemble_rtd(inst: &Instruction) -> String {
    if let Operands::Displacement(disp) = &inst.operands {
        format!("RTD #{disp}")
    } else {
        unreachable!()
    }
}

fn disassemble_trap(inst: &Instruction) -> String {
    if let Operands::Vector(v) = &inst.operands {
        format!("TRAP #{}", v - 32)
    } else {
        unreachable!()
    }
}

fn disassemble_cas(inst: &Instruction) -> String {
    if let Operands::Cas { ea, dc, du } = &inst.operands {
        format!("CAS D{dc},D{du},{ea}")
    } else {
        unreachable!()
    }
}

fn disassemble_cas2(inst: &Instruction) -> String {
    if let Operands::Cas2 { rn1, dc1, du1, rn2, dc2, du2, .. } = &inst.operands {
        let rn = |r: &u8| if *r >= 8 { format!("A{}", r - 8) } else { format!("D{r}") };
        format!("CAS2 D{dc1}:D{dc2},D{du1}:D{du2},({}):({})", rn(rn1), rn(rn2))
    } else {
        unreachable!()
    }
}

fn disassemble_pmmu(_: &Instruction) -> String {
    "PMOVE".to_string()
}

/// Renders `inst` in Motorola assembler style (spec §6). Pure function of
/// the decoded instruction; never touches CPU state or memory.
pub fn disassemble(inst: &Instruction) -> String {
    match inst.isa {
        Isa::Unknown => format!("DC.W {:#06X}", inst.opcode),
        Isa::ALine => format!("DC.W {:#06X} ; A-line", inst.opcode),
        Isa::FLine => format!("DC.W {:#06X} ; F-line", inst.opcode),

        Isa::Move | Isa::Movea => disassemble_move(inst),
        Isa::Moveq => disassemble_moveq(inst),
        Isa::MoveToCcr | Isa::MoveFromCcr | Isa::MoveToSr | Isa::MoveFromSr => disassemble_move_ccr_sr(inst),
        Isa::MoveUsp => disassemble_move_usp(inst),
        Isa::Movem => disassemble_movem(inst),
        Isa::Movep => disassemble_movep(inst),
        Isa::Movec => disassemble_movec(inst),
        Isa::Moves => disassemble_moves(inst),
        Isa::Lea => disassemble_lea(inst),
        Isa::Pea => disassemble_pea(inst),

        Isa::Add | Isa::Sub | Isa::And | Isa::Or | Isa::Cmp | Isa::Eor => disassemble_alu_opmode(inst),
        Isa::Adda | Isa::Suba | Isa::Cmpa => disassemble_alu_address(inst),
        Isa::Addi | Isa::Subi | Isa::Andi | Isa::Ori | Isa::Eori | Isa::Cmpi => disassemble_alu_immediate(inst),
        Isa::OriCcr | Isa::OriSr | Isa::AndiCcr | Isa::AndiSr | Isa::EoriCcr | Isa::EoriSr | Isa::Stop => {
            disassemble_imm_to_ccr_sr(inst)
        }
        Isa::Addq | Isa::Subq => disassemble_quick(inst),
        Isa::Addx | Isa::Subx | Isa::Abcd | Isa::Sbcd => disassemble_abcd_sbcd_addx_subx(inst),
        Isa::Cmpm => {
            if let Operands::RegisterDirectionSizeEffectiveAddress(ay, _, size, AddressingMode::Ariwpo(ax)) = &inst.operands {
                format!("CMPM.{size} (A{ay})+,(A{ax})+")
            } else {
                unreachable!()
            }
        }
        Isa::Neg | Isa::NegX | Isa::Clr | Isa::Not | Isa::Tst => disassemble_unary(inst),
        Isa::Nbcd => disassemble_nbcd(inst),
        Isa::Tas => disassemble_tas(inst),
        Isa::Ext => disassemble_ext(inst),
        Isa::Extb => disassemble_extb(inst),
        Isa::Swap => disassemble_swap(inst),
        Isa::Exg => disassemble_exg(inst),

        Isa::ShiftRotateReg => disassemble_shift_rotate_reg(inst),
        Isa::ShiftRotateMem => disassemble_shift_rotate_mem(inst),

        Isa::Btst | Isa::Bchg | Isa::Bclr | Isa::Bset => disassemble_bitop(inst),

        Isa::Muls | Isa::Mulu | Isa::Divs | Isa::Divu => disassemble_muldiv(inst),
        Isa::MulDivL => disassemble_muldivl(inst),

        Isa::Pack | Isa::Unpk => disassemble_pack_unpk(inst),

        Isa::Bfchg | Isa::Bfclr | Isa::Bfexts | Isa::Bfextu | Isa::Bfffo | Isa::Bfins | Isa::Bfset | Isa::Bftst => {
            disassemble_bitfield(inst)
        }

        Isa::Chk | Isa::ChkL => disassemble_chk(inst),

        Isa::Bra | Isa::Bsr => disassemble_bra_bsr(inst),
        Isa::Bcc => disassemble_bcc(inst),
        Isa::Dbcc => disassemble_dbcc(inst),
        Isa::Scc => disassemble_scc(inst),
        Isa::Trapcc => disassemble_trapcc(inst),
        Isa::Jmp | Isa::Jsr => disassemble_jmp_jsr(inst),
        Isa::Rts => "RTS".to_string(),
        Isa::Rtr => "RTR".to_string(),
        Isa::Rte => "RTE".to_string(),
        Isa::Rtd => disassemble_rtd(inst),
        Isa::Link => disassemble_link(inst),
        Isa::LinkL => disassemble_link(inst),
        Isa::Unlk => disassemble_unlk(inst),
        Isa::Trap => disassemble_trap(inst),
        Isa::Trapv => "TRAPV".to_string(),

        Isa::Cas => disassemble_cas(inst),
        Isa::Cas2 => disassemble_cas2(inst),

        Isa::Nop => "NOP".to_string(),
        Isa::Reset => "RESET".to_string(),

        Isa::Pmmu => disassemble_pmmu(inst),

        Isa::_Size => unreachable!("sentinel variant is never dispatched"),
    }
}

/// Decodes and disassembles one instruction from `words`, returning the
/// rendered text and the number of 16-bit words it consumed.
pub fn disasm(words: &mut dyn WordStream, is_68030: bool) -> Result<(String, u32), u8> {
    let start = words.next_addr();
    let inst = Instruction::from_memory(words, is_68030)?;
    let consumed = (words.next_addr() - start) / 2;
    Ok((disassemble(&inst), consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_access::MemoryAccess;

    fn disasm_bytes(bytes: &[u8]) -> String {
        let mut mem = bytes.to_vec();
        let mut iter = mem.iter_u16(0);
        let inst = Instruction::from_memory(&mut iter, false).unwrap();
        disassemble(&inst)
    }

    #[test]
    fn move_word_immediate_to_d0() {
        assert_eq!(disasm_bytes(&[0x30, 0x3C, 0x12, 0x34]), "MOVE.W #0x1234,D0");
    }

    #[test]
    fn move_postincrement_destination() {
        // MOVE.W D0,(A1)+
        assert_eq!(disasm_bytes(&[0x32, 0xC0]), "MOVE.W D0,(A1)+");
    }

    #[test]
    fn bne_short_renders_star_offset() {
        // BNE.S *+$02 (opcode 0x66 <disp>)
        assert_eq!(disasm_bytes(&[0x66, 0x02]), "BNE.S *+$02");
    }

    #[test]
    fn movem_register_list_compacts_ranges() {
        // MOVEM.L D0-D7/A0-A6,(A7): opcode 0x48D7, mask 0x7FFF, ea=(A7)
        assert_eq!(disasm_bytes(&[0x48, 0xD7, 0x7F, 0xFF]), "MOVEM.L D0-D7/A0-A6,(A7)");
    }

    #[test]
    fn nop_has_no_operands() {
        assert_eq!(disasm_bytes(&[0x4E, 0x71]), "NOP");
    }
}
