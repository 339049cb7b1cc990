//! Mathematical Utilities for the Regrow Protocol
//!
//! Safe proportional math shared by the accrual, distribution, and share
//! accounting components. All amounts are u64 base units; accumulators are
//! u128. Products of two u64 values always fit in u128, so the only wide
//! case is `accumulator * amount / accumulator`, which `mul_div` handles
//! with a 192-bit intermediate.

use crate::constants::fees;
use crate::errors::{RegrowError, RegrowResult};

/// Floor of `a * b / den`.
///
/// Exact whenever the quotient fits in u128. When `a * b` overflows u128,
/// at least one factor must fit in 64 bits (true for every call site in
/// this crate: one side is an amount) and the product is carried as three
/// 64-bit limbs through a restoring division.
///
/// # Errors
/// * `DivisionByZero` if `den == 0`
/// * `Overflow` if the quotient exceeds u128 or neither factor fits 64 bits
pub fn mul_div(a: u128, b: u128, den: u128) -> RegrowResult<u128> {
    mul_div_rem(a, b, den).map(|(q, _)| q)
}

/// Ceiling of `a * b / den`, same domain as [`mul_div`].
pub fn mul_div_ceil(a: u128, b: u128, den: u128) -> RegrowResult<u128> {
    let (q, r) = mul_div_rem(a, b, den)?;
    if r == 0 {
        Ok(q)
    } else {
        q.checked_add(1).ok_or(RegrowError::Overflow)
    }
}

/// Quotient and remainder of `a * b / den`
fn mul_div_rem(a: u128, b: u128, den: u128) -> RegrowResult<(u128, u128)> {
    if den == 0 {
        return Err(RegrowError::DivisionByZero);
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok((product / den, product % den));
    }

    // Wide path: order the factors so the small one fits 64 bits
    let (wide, narrow) = if a <= u64::MAX as u128 {
        (b, a)
    } else if b <= u64::MAX as u128 {
        (a, b)
    } else {
        return Err(RegrowError::Overflow);
    };

    // wide * narrow as three 64-bit limbs (n2, n1, n0)
    let mask = u64::MAX as u128;
    let lo = (wide & mask) * narrow;
    let hi = (wide >> 64) * narrow;
    let n0 = lo & mask;
    let mid = (lo >> 64) + (hi & mask);
    let n1 = mid & mask;
    let n2 = (hi >> 64) + (mid >> 64);

    // Restoring division over the 192-bit value, bit by bit. A carry out
    // of the 128-bit remainder means the true shifted value is rem + 2^128;
    // it is still below 2*den, so one wrapping subtraction restores
    // rem < den.
    let mut rem: u128 = 0;
    let mut quo: u128 = 0;
    for i in (0..192).rev() {
        let bit = if i >= 128 {
            (n2 >> (i - 128)) & 1
        } else if i >= 64 {
            (n1 >> (i - 64)) & 1
        } else {
            n0 >> i & 1
        };
        let carry = rem >> 127;
        rem = (rem << 1) | bit;
        if carry != 0 || rem >= den {
            rem = rem.wrapping_sub(den);
            if i >= 128 {
                return Err(RegrowError::Overflow);
            }
            quo |= 1u128 << i;
        }
    }
    Ok((quo, rem))
}

/// Calculate a basis-point fee on an amount, truncating toward zero.
///
/// u64 * u16 cannot overflow u128, and the result never exceeds `amount`.
pub fn fee_amount(amount: u64, bps: u16) -> u64 {
    ((amount as u128 * bps as u128) / fees::BPS_DENOMINATOR as u128) as u64
}

/// Checked addition on u64 amounts
pub fn checked_add_amount(a: u64, b: u64) -> RegrowResult<u64> {
    a.checked_add(b).ok_or(RegrowError::Overflow)
}

/// Checked subtraction on u64 amounts
pub fn checked_sub_amount(a: u64, b: u64) -> RegrowResult<u64> {
    a.checked_sub(b)
        .ok_or(RegrowError::InsufficientBalance {
            available: a,
            requested: b,
        })
}
