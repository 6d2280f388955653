// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The 68030 PMMU stub interface (spec §6): the core dispatches
//! PMOVE/PFLUSH/PTEST/PLOAD to an opaque collaborator handle. A real
//! table walker is explicitly out of scope (spec §1 Non-goals); this
//! module only specifies the boundary a collaborator can implement one
//! behind.

/// Collaborator-implemented PMMU operations. The core never interprets a
/// TLB or page table itself -- it forwards the decoded PMMU opcode here.
pub trait PmmuPort {
    /// PMOVE: transfer between a control register and memory/a data register.
    fn pmove(&mut self, control_register: u8, data: u32, to_control_register: bool) -> u32;

    /// PFLUSH: invalidate TLB entries matching the given function code/address mask.
    fn pflush(&mut self, function_code: u8, mask: u8, address: u32);

    /// PTEST: probe the TLB for a translation, returning the condition
    /// codes the PTEST instruction should report.
    fn ptest(&mut self, address: u32, level: u8, write: bool) -> PmmuTestResult;

    /// PLOAD: force-load a TLB entry for the given address.
    fn pload(&mut self, function_code: u8, address: u32, write: bool);
}

/// Outcome of a PTEST probe, mapped onto the instruction's condition codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PmmuTestResult {
    pub resident: bool,
    pub write_protected: bool,
    pub invalid: bool,
}
