// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use m68k::status_register::StatusRegister;

/// Exhaustive sweep over every 16-bit pattern, mirroring the teacher's own
/// `status_register` test but widened for the two extra bits (T0, M) this
/// crate's SR carries beyond the 68000-only original.
#[test]
fn status_register_roundtrip_and_conditions() {
    const MASK: u16 = 0xF71F;

    for raw in 0..=u16::MAX {
        assert_eq!(Into::<u16>::into(StatusRegister::from(raw)), raw & MASK);

        let lsr = StatusRegister::from(raw);
        let mut rsr = lsr;
        rsr &= raw;
        assert_eq!(lsr, rsr);
        rsr &= 0;
        assert_eq!(0, Into::<u16>::into(rsr));
        rsr &= 0xFFFF;
        assert_eq!(0, Into::<u16>::into(rsr));

        let lsr = StatusRegister::from(raw);
        let mut rsr = lsr;
        rsr ^= raw;
        assert_eq!(0, Into::<u16>::into(rsr));
        rsr ^= 0;
        assert_eq!(0, Into::<u16>::into(rsr));
        rsr ^= 0xFFFF;
        assert_eq!(MASK, Into::<u16>::into(rsr));

        let lsr = StatusRegister::from(raw);
        let mut rsr = lsr;
        rsr |= raw;
        assert_eq!(lsr, rsr);
        rsr |= 0;
        assert_eq!(lsr, rsr);
        rsr |= 0xFFFF;
        assert_eq!(MASK, Into::<u16>::into(rsr));

        let sr = StatusRegister::from(raw);
        assert_eq!(sr.condition(0), true, "condition(0) T for {raw:#X}");
        assert_eq!(sr.condition(1), false, "condition(1) F for {raw:#X}");
        assert_eq!(sr.condition(2), raw & 0b0101 == 0, "condition(2) HI for {raw:#X}");
        assert_eq!(sr.condition(3), raw & 0b0101 != 0, "condition(3) LS for {raw:#X}");
        assert_eq!(sr.condition(4), raw & 0b0001 == 0, "condition(4) CC for {raw:#X}");
        assert_eq!(sr.condition(5), raw & 0b0001 != 0, "condition(5) CS for {raw:#X}");
        assert_eq!(sr.condition(6), raw & 0b0100 == 0, "condition(6) NE for {raw:#X}");
        assert_eq!(sr.condition(7), raw & 0b0100 != 0, "condition(7) EQ for {raw:#X}");
        assert_eq!(sr.condition(8), raw & 0b0010 == 0, "condition(8) VC for {raw:#X}");
        assert_eq!(sr.condition(9), raw & 0b0010 != 0, "condition(9) VS for {raw:#X}");
        assert_eq!(sr.condition(10), raw & 0b1000 == 0, "condition(10) PL for {raw:#X}");
        assert_eq!(sr.condition(11), raw & 0b1000 != 0, "condition(11) MI for {raw:#X}");
        assert_eq!(sr.condition(12), raw & 0b1010 == 0b1010 || raw & 0b1010 == 0, "condition(12) GE for {raw:#X}");
        assert_eq!(sr.condition(13), raw & 0b1010 == 0b1000 || raw & 0b1010 == 0b0010, "condition(13) LT for {raw:#X}");
        assert_eq!(sr.condition(14), raw & 0b1110 == 0b1010 || raw & 0b1110 == 0, "condition(14) GT for {raw:#X}");
        assert_eq!(sr.condition(15), raw & 0b0100 != 0 || raw & 0b1010 == 0b1000 || raw & 0b1010 == 0b0010, "condition(15) LE for {raw:#X}");
    }
}
