//! The numeric tower: exact rationals and IEEE doubles with mixed-type
//! coercion. Fractions are kept in lowest terms with the sign in the
//! numerator; any operation that mixes a fraction with a float converts the
//! fraction to its double approximation and stays floating from then on.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::Error;

/// A numeric value: exact rational or floating point.
///
/// Cross-variant equality is intentionally false: `1/1` and `1.0` denote the
/// same quantity but are distinct values to `=`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Fraction(Fraction),
    Float(f64),
}

/// An exact rational. Invariant: lowest terms, denominator strictly
/// positive, `0` is stored as `0/1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    num: i64,
    den: i64,
}

/// Euclidean GCD on magnitudes.
fn gcd(mut x: u64, mut y: u64) -> u64 {
    while y != 0 {
        (x, y) = (y, x % y);
    }
    x
}

impl Fraction {
    pub const ZERO: Fraction = Fraction { num: 0, den: 1 };
    pub const ONE: Fraction = Fraction { num: 1, den: 1 };

    /// Build a fraction, reducing to lowest terms. A zero denominator is a
    /// `DivisionByZero` error, also at read time for literals like `1/0`.
    pub fn new(num: i64, den: i64) -> Result<Self, Error> {
        if den == 0 {
            return Err(Error::DivisionByZero);
        }
        Ok(Self::reduced(num, den))
    }

    /// A whole number as `n/1`.
    pub const fn integer(num: i64) -> Self {
        Fraction { num, den: 1 }
    }

    /// Normalize: sign into the numerator, divide out the GCD. `den` must be
    /// nonzero.
    fn reduced(mut num: i64, mut den: i64) -> Self {
        if den < 0 {
            num = -num;
            den = -den;
        }
        if num == 0 {
            return Fraction::ZERO;
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i64;
        Fraction {
            num: num / g,
            den: den / g,
        }
    }

    pub fn numerator(self) -> i64 {
        self.num
    }

    pub fn denominator(self) -> i64 {
        self.den
    }

    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Number {
    pub const fn integer(num: i64) -> Self {
        Number::Fraction(Fraction::integer(num))
    }

    /// Division. Exact division by an exact zero is an error; float division
    /// follows IEEE semantics and yields infinities or NaN instead.
    pub fn div(self, other: Number) -> Result<Number, Error> {
        match (self, other) {
            (Number::Fraction(a), Number::Fraction(b)) => {
                if b.is_zero() {
                    return Err(Error::DivisionByZero);
                }
                // Cross-multiplied, reduced on construction. b.num is
                // nonzero, so the new denominator is too.
                Ok(Number::Fraction(Fraction::reduced(
                    a.num * b.den,
                    a.den * b.num,
                )))
            }
            (a, b) => Ok(Number::Float(a.to_f64() / b.to_f64())),
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Number::Fraction(fr) => fr.to_f64(),
            Number::Float(value) => value,
        }
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Fraction(a), Number::Fraction(b)) => Number::Fraction(Fraction::reduced(
                a.num * b.den + b.num * a.den,
                a.den * b.den,
            )),
            (a, b) => Number::Float(a.to_f64() + b.to_f64()),
        }
    }
}

impl Sub for Number {
    type Output = Number;

    fn sub(self, other: Number) -> Number {
        match (self, other) {
            (Number::Fraction(a), Number::Fraction(b)) => Number::Fraction(Fraction::reduced(
                a.num * b.den - b.num * a.den,
                a.den * b.den,
            )),
            (a, b) => Number::Float(a.to_f64() - b.to_f64()),
        }
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Fraction(a), Number::Fraction(b)) => {
                Number::Fraction(Fraction::reduced(a.num * b.num, a.den * b.den))
            }
            (a, b) => Number::Float(a.to_f64() * b.to_f64()),
        }
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Fraction(fr) => Number::Fraction(Fraction {
                num: -fr.num,
                den: fr.den,
            }),
            Number::Float(value) => Number::Float(-value),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Fraction(fr) if fr.den == 1 => write!(f, "{}", fr.num),
            Number::Fraction(fr) => write!(f, "{}/{}", fr.num, fr.den),
            // {:?} keeps a trailing ".0" on whole floats, so the printed
            // forms of 1 and 1.0 stay distinct.
            Number::Float(value) => write!(f, "{value:?}"),
        }
    }
}
