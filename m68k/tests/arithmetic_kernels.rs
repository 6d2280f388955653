// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapted from the teacher's `tests/operators.rs`: same carry/overflow
//! truth table, checked against this crate's `CarryingOps` trait instead
//! of the teacher's test-only `#![feature(bigint_helper_methods)]` nightly
//! functions, so the suite runs on stable.

use m68k::utils::CarryingOps;

macro_rules! check {
    ($operator:expr, $expected:expr) => {
        let res = $operator;
        assert_eq!(res, $expected, "{} -> {:?}, expected {:?}", stringify!($operator), res, $expected);
    };
}

#[test]
fn unsigned_carrying_add() {
    check!(255u8.unsigned_carrying_add(1, false), (0, true));
    check!(255u8.unsigned_carrying_add(0, true), (0, true));
    check!(255u8.unsigned_carrying_add(1, true), (1, true));
    check!(0u8.unsigned_carrying_add(255, false), (255, false));
    check!(0u8.unsigned_carrying_add(255, true), (0, true));
}

#[test]
fn signed_carrying_add_overflow_has_no_intermediate_double_count() {
    check!(127u8.signed_carrying_add(1, false), (-128, true));
    check!(127u8.signed_carrying_add(0, true), (-128, true));
    check!(127u8.signed_carrying_add(1, true), (-127, true));
    check!(127u8.signed_carrying_add(255, false), (126, false)); // rhs = -1 as u8
    check!(127u8.signed_carrying_add(255, true), (127, false)); // no intermediate overflow
    check!(128u8.signed_carrying_add(255, false), (127, true)); // -128 + -1
    check!(128u8.signed_carrying_add(255, true), (128u8 as i8, false)); // no intermediate overflow
}

#[test]
fn unsigned_borrowing_sub() {
    check!(0u8.unsigned_borrowing_sub(1, false), (255u8, true));
    check!(0u8.unsigned_borrowing_sub(0, true), (255u8, true));
    check!(0u8.unsigned_borrowing_sub(1, true), (254u8, true));
    check!(255u8.unsigned_borrowing_sub(255, false), (0, false));
    check!(255u8.unsigned_borrowing_sub(255, true), (255u8, true));
}

#[test]
fn signed_borrowing_sub_overflow() {
    check!(128u8.signed_borrowing_sub(1, false), (127, true)); // -128 - 1
    check!(128u8.signed_borrowing_sub(0, true), (127, true));
    check!(128u8.signed_borrowing_sub(1, true), (126, true));
    check!(128u8.signed_borrowing_sub(255, false), (-127, false)); // -128 - -1
    check!(128u8.signed_borrowing_sub(255, true), (-128, false)); // no intermediate overflow
    check!(127u8.signed_borrowing_sub(255, false), (-128, true)); // 127 - -1
    check!(127u8.signed_borrowing_sub(255, true), (127, false)); // no intermediate overflow
}

#[test]
fn sixteen_and_thirtytwo_bit_widths_share_the_same_formula() {
    check!(0xFFFFu16.unsigned_carrying_add(1, false), (0, true));
    check!(0xFFFF_FFFFu32.unsigned_carrying_add(1, false), (0, true));
    check!(0x7FFFu16.signed_carrying_add(1, false), (i16::MIN, true));
    check!(0x7FFF_FFFFu32.signed_carrying_add(1, false), (i32::MIN, true));
}
