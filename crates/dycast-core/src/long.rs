//! 64-bit integers with an explicit signed/unsigned mode.
//!
//! Ids, offsets and counters on the push feed are 64-bit and routinely exceed
//! 2^53, so they travel as `Long` rather than `f64`. Arithmetic is native
//! two's-complement and wraps like the wire types do. `mul_limbs` keeps the
//! 16-bit schoolbook multiplication as a reference path; it must agree with
//! `mul` for every input.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{DyCastError, Result};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TWO_PWR_63_DBL: f64 = 9_223_372_036_854_775_808.0;
const TWO_PWR_64_DBL: f64 = 18_446_744_073_709_551_616.0;

/// A 64-bit integer stored as raw bits plus a signedness flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Long {
    bits: u64,
    unsigned: bool,
}

impl Long {
    pub const ZERO: Long = Long::from_i64(0);
    pub const ONE: Long = Long::from_i64(1);
    pub const NEG_ONE: Long = Long::from_i64(-1);
    pub const UZERO: Long = Long::from_u64(0);
    pub const UONE: Long = Long::from_u64(1);
    pub const MAX_VALUE: Long = Long::from_i64(i64::MAX);
    pub const MIN_VALUE: Long = Long::from_i64(i64::MIN);
    pub const MAX_UNSIGNED_VALUE: Long = Long::from_u64(u64::MAX);

    /// Build from the two 32-bit halves.
    pub const fn from_bits(low: i32, high: i32, unsigned: bool) -> Self {
        Self {
            bits: ((high as u32 as u64) << 32) | (low as u32 as u64),
            unsigned,
        }
    }

    pub const fn from_i64(value: i64) -> Self {
        Self { bits: value as u64, unsigned: false }
    }

    pub const fn from_u64(value: u64) -> Self {
        Self { bits: value, unsigned: true }
    }

    /// Sign-extends `value`, then tags it with the requested mode.
    pub const fn from_int(value: i32, unsigned: bool) -> Self {
        Self { bits: value as i64 as u64, unsigned }
    }

    /// Truncating conversion from a float. NaN maps to zero, out-of-range
    /// values saturate to the mode's bounds.
    pub fn from_number(value: f64, unsigned: bool) -> Self {
        if value.is_nan() {
            return if unsigned { Self::UZERO } else { Self::ZERO };
        }
        if unsigned {
            if value < 0.0 {
                return Self::UZERO;
            }
            if value >= TWO_PWR_64_DBL {
                return Self::MAX_UNSIGNED_VALUE;
            }
            return Self::from_u64(value as u64);
        }
        if value <= -TWO_PWR_63_DBL {
            return Self::MIN_VALUE;
        }
        if value + 1.0 >= TWO_PWR_63_DBL {
            return Self::MAX_VALUE;
        }
        Self::from_i64(value as i64)
    }

    /// Parse `text` in `radix`. Overlong inputs wrap modulo 2^64.
    ///
    /// `NaN` and the infinities parse as zero for compatibility with
    /// JavaScript-produced payloads.
    pub fn from_string(text: &str, unsigned: bool, radix: u32) -> Result<Self> {
        if text.is_empty() {
            return Err(DyCastError::InvalidNumber("empty string".into()));
        }
        if matches!(text, "NaN" | "Infinity" | "+Infinity" | "-Infinity") {
            return Ok(if unsigned { Self::UZERO } else { Self::ZERO });
        }
        check_radix(radix)?;

        match text.find('-') {
            Some(0) => return Ok(Self::from_string(&text[1..], unsigned, radix)?.neg()),
            Some(_) => return Err(DyCastError::InvalidNumber(format!("interior hyphen in {text:?}"))),
            None => {}
        }

        let mut acc: u64 = 0;
        for ch in text.chars() {
            let digit = ch
                .to_digit(radix)
                .ok_or_else(|| DyCastError::InvalidNumber(format!("{text:?} in radix {radix}")))?;
            acc = acc.wrapping_mul(radix as u64).wrapping_add(digit as u64);
        }
        Ok(Self { bits: acc, unsigned })
    }

    pub fn low_bits(self) -> i32 {
        self.bits as u32 as i32
    }

    pub fn high_bits(self) -> i32 {
        (self.bits >> 32) as u32 as i32
    }

    pub fn is_unsigned(self) -> bool {
        self.unsigned
    }

    pub fn is_zero(self) -> bool {
        self.bits == 0
    }

    pub fn is_negative(self) -> bool {
        !self.unsigned && (self.bits as i64) < 0
    }

    pub fn is_odd(self) -> bool {
        self.bits & 1 == 1
    }

    pub fn as_i64(self) -> i64 {
        self.bits as i64
    }

    pub fn as_u64(self) -> u64 {
        self.bits
    }

    pub fn to_unsigned(self) -> Self {
        Self { bits: self.bits, unsigned: true }
    }

    pub fn to_signed(self) -> Self {
        Self { bits: self.bits, unsigned: false }
    }

    /// Mathematical value under this value's own mode.
    fn value(self) -> i128 {
        if self.unsigned {
            self.bits as i128
        } else {
            self.bits as i64 as i128
        }
    }

    fn with_bits(self, bits: u64) -> Self {
        Self { bits, unsigned: self.unsigned }
    }

    pub fn neg(self) -> Self {
        self.with_bits(self.bits.wrapping_neg())
    }

    pub fn not(self) -> Self {
        self.with_bits(!self.bits)
    }

    pub fn and(self, other: Long) -> Self {
        self.with_bits(self.bits & other.bits)
    }

    pub fn or(self, other: Long) -> Self {
        self.with_bits(self.bits | other.bits)
    }

    pub fn xor(self, other: Long) -> Self {
        self.with_bits(self.bits ^ other.bits)
    }

    pub fn add(self, other: Long) -> Self {
        self.with_bits(self.bits.wrapping_add(other.bits))
    }

    pub fn sub(self, other: Long) -> Self {
        self.with_bits(self.bits.wrapping_sub(other.bits))
    }

    /// Native 64-bit product, wrapping.
    pub fn mul(self, other: Long) -> Self {
        self.with_bits(self.bits.wrapping_mul(other.bits))
    }

    /// Schoolbook product over four 16-bit limbs per operand.
    ///
    /// Only the limb pairs that land below bit 64 are multiplied; carries are
    /// propagated once at the end. Always equal to [`Long::mul`].
    pub fn mul_limbs(self, other: Long) -> Self {
        let a = limbs(self.bits);
        let b = limbs(other.bits);

        let mut c = [0u64; 4];
        for i in 0..4 {
            for j in 0..(4 - i) {
                c[i + j] += a[i] * b[j];
            }
        }
        for k in 0..3 {
            c[k + 1] += c[k] >> 16;
            c[k] &= 0xffff;
        }
        c[3] &= 0xffff;

        self.with_bits(c[0] | (c[1] << 16) | (c[2] << 32) | (c[3] << 48))
    }

    /// Truncating division. The result keeps `self`'s mode; an unsigned
    /// dividend treats the divisor's bits as unsigned too.
    /// `MIN_VALUE / -1` wraps to `MIN_VALUE`.
    pub fn div(self, divisor: Long) -> Result<Self> {
        if divisor.is_zero() {
            return Err(DyCastError::DivisionByZero);
        }
        if self.unsigned {
            return Ok(self.with_bits(self.bits / divisor.bits));
        }
        let q = self.value() / divisor.value();
        Ok(self.with_bits(q as u64))
    }

    /// Remainder with the sign of the dividend: `self - (self / divisor) * divisor`.
    pub fn rem(self, divisor: Long) -> Result<Self> {
        let q = self.div(divisor)?;
        Ok(self.sub(q.mul(divisor)))
    }

    pub fn shl(self, num_bits: u32) -> Self {
        self.with_bits(self.bits << (num_bits & 63))
    }

    /// Arithmetic right shift on the raw bits (sign-propagating in both modes).
    pub fn shr(self, num_bits: u32) -> Self {
        self.with_bits(((self.bits as i64) >> (num_bits & 63)) as u64)
    }

    /// Logical right shift.
    pub fn shru(self, num_bits: u32) -> Self {
        self.with_bits(self.bits >> (num_bits & 63))
    }

    /// Compares mathematical values, each under its own mode.
    pub fn compare(self, other: Long) -> Ordering {
        self.value().cmp(&other.value())
    }

    /// Lossy above 2^53.
    pub fn to_number(self) -> f64 {
        self.value() as f64
    }

    pub fn to_string_radix(self, radix: u32) -> Result<String> {
        check_radix(radix)?;
        let value = self.value();
        if value == 0 {
            return Ok("0".to_string());
        }

        let mut magnitude = value.unsigned_abs();
        let mut digits = Vec::new();
        while magnitude > 0 {
            digits.push(DIGITS[(magnitude % radix as u128) as usize]);
            magnitude /= radix as u128;
        }
        if value < 0 {
            digits.push(b'-');
        }
        digits.reverse();
        String::from_utf8(digits).map_err(|e| DyCastError::Internal(e.to_string()))
    }
}

fn limbs(bits: u64) -> [u64; 4] {
    [bits & 0xffff, (bits >> 16) & 0xffff, (bits >> 32) & 0xffff, bits >> 48]
}

fn check_radix(radix: u32) -> Result<()> {
    if !(2..=36).contains(&radix) {
        return Err(DyCastError::InvalidRadix(radix));
    }
    Ok(())
}

impl PartialOrd for Long {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Value order; equal values order signed before unsigned so `Ord` agrees with `Eq`.
impl Ord for Long {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(*other).then(self.unsigned.cmp(&other.unsigned))
    }
}

impl fmt::Display for Long {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<i64> for Long {
    fn from(value: i64) -> Self {
        Long::from_i64(value)
    }
}

impl From<u64> for Long {
    fn from(value: u64) -> Self {
        Long::from_u64(value)
    }
}
