// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Q31 fixed-point primitives shared by requantization and softmax.
//!
//! These follow the gemmlowp / CMSIS-NN reference arithmetic bit for bit,
//! including the two's-complement wrap-around of the reference C code, so
//! results match what the compiled model was calibrated against.

/// Rounding doubling high multiply: `round(a * b / 2^31)`, saturating the
/// single overflow case `i32::MIN * i32::MIN`.
#[inline]
pub fn doubling_high_mul(a: i32, b: i32) -> i32 {
    if a == i32::MIN && b == i32::MIN {
        return i32::MAX;
    }
    let ab = i64::from(a) * i64::from(b);
    let nudge: i64 = if (a < 0) ^ (b < 0) {
        1 - (1 << 30)
    } else {
        1 << 30
    };
    ((ab + nudge) / (1i64 << 31)) as i32
}

/// Divides by `2^exponent`, rounding half away from zero.
#[inline]
pub fn rounding_divide_by_pot(x: i32, exponent: u32) -> i32 {
    if exponent == 0 {
        return x;
    }
    let exponent = exponent.min(62);
    let mask = (1i64 << exponent) - 1;
    let x = i64::from(x);
    let remainder = x & mask;
    let threshold = (mask >> 1) + i64::from(x < 0);
    let result = (x >> exponent) + i64::from(remainder > threshold);
    result as i32
}

/// Multiplies by `2^exponent`, saturating to the `i32` range.
#[inline]
pub fn saturating_mul_by_pot(x: i32, exponent: u32) -> i32 {
    debug_assert!(exponent < 31);
    let threshold = (1i32 << (31 - exponent)) - 1;
    if x > threshold {
        i32::MAX
    } else if x < -threshold {
        i32::MIN
    } else {
        x << exponent
    }
}

/// `exp(x)` for `x <= 0` given in Q5.26, result in Q0.31.
pub fn exp_on_negative_values(val: i32) -> i32 {
    const ONE_QUARTER_SHIFT: u32 = 24;
    // exp(-1/4 * 2^k) for k = 0..7, in Q0.31.
    const BARREL: [i32; 7] = [
        1_672_461_947,
        1_302_514_674,
        790_015_084,
        290_630_308,
        39_332_535,
        720_401,
        242,
    ];

    if val == 0 {
        return i32::MAX;
    }

    let quarter = 1i32 << ONE_QUARTER_SHIFT;
    let val_mod_minus_quarter = (val & (quarter - 1)) - quarter;
    let remainder = val_mod_minus_quarter.wrapping_sub(val);

    // Taylor expansion of exp around -1/8 on the [-1/4, 0) interval.
    let x = (val_mod_minus_quarter << 5).wrapping_add(1 << 28);
    let x2 = doubling_high_mul(x, x);
    let x3 = doubling_high_mul(x2, x);
    let x4_over_4 = rounding_divide_by_pot(doubling_high_mul(x2, x2), 2);
    let poly = doubling_high_mul(x4_over_4.wrapping_add(x3), 715_827_883).wrapping_add(x2);
    let mut result = 1_895_147_668i32.wrapping_add(doubling_high_mul(
        1_895_147_668,
        x.wrapping_add(rounding_divide_by_pot(poly, 1)),
    ));

    for (k, &factor) in BARREL.iter().enumerate() {
        if remainder & (1 << (ONE_QUARTER_SHIFT + k as u32)) != 0 {
            result = doubling_high_mul(result, factor);
        }
    }
    result
}

/// `1 / (1 + x)` for `x` in `[0, 1)`, both in Q0.31.
pub fn one_over_one_plus_x(val: i32) -> i32 {
    let sum = i64::from(val) + i64::from(i32::MAX);
    let half_denominator = ((sum + if sum >= 0 { 1 } else { -1 }) / 2) as i32;

    // Newton-Raphson, three iterations from 48/17 - 32/17 * d.
    let mut x = 1_515_870_810i32.wrapping_add(doubling_high_mul(half_denominator, -1_010_580_540));
    let one = 1i32 << 29;
    for _ in 0..3 {
        let half_denominator_times_x = doubling_high_mul(half_denominator, x);
        let one_minus = one.wrapping_sub(half_denominator_times_x);
        x = x.wrapping_add(saturating_mul_by_pot(doubling_high_mul(x, one_minus), 2));
    }
    saturating_mul_by_pot(x, 1)
}
