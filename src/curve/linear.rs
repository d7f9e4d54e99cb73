//! Non-vertical lines.
use super::CurveError;
use std::ops::{Add, Sub};

/// A non-vertical line, stored as `y = c - a x`.
///
/// This is the line `a x + b y = c` normalised by `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFunction {
    /// Coefficient of `x`, with the sign flipped
    pub a: f64,
    /// Intercept
    pub c: f64,
}

impl LinearFunction {
    /// Create the line `a x + b y = c`.
    ///
    /// Fails if `b` is zero, since the line would then be vertical.
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self, CurveError> {
        if b == 0.0 {
            return Err(CurveError::VerticalLine);
        }

        Ok(Self { a: a / b, c: c / b })
    }

    /// The horizontal line `y = c`
    pub fn constant(c: f64) -> Self {
        Self { a: 0.0, c }
    }

    /// Evaluate the line at `x`
    pub fn value_at(&self, x: f64) -> f64 {
        self.c - self.a * x
    }

    /// Whether the line has zero slope
    pub fn is_horizontal(&self) -> bool {
        self.a == 0.0
    }

    /// The line reflected about `y = x`
    pub fn inverse(&self) -> Result<Self, CurveError> {
        if self.is_horizontal() {
            return Err(CurveError::HorizontalInverse);
        }

        Ok(Self {
            a: 1.0 / self.a,
            c: self.c / self.a,
        })
    }

    /// The slope as a constant line
    pub fn derivative(&self) -> Self {
        Self::constant(-self.a)
    }

    /// The line reflected about the origin, i.e. `x -> -f(-x)`
    pub fn mirror(&self) -> Self {
        Self {
            a: self.a,
            c: -self.c,
        }
    }

    /// The antiderivative `c x - a x^2 / 2`, evaluated at `x`
    pub(super) fn primitive(&self, x: f64) -> f64 {
        self.c * x - self.a * x * x / 2.0
    }
}

impl Add for LinearFunction {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            a: self.a + rhs.a,
            c: self.c + rhs.c,
        }
    }
}

impl Sub for LinearFunction {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            a: self.a - rhs.a,
            c: self.c - rhs.c,
        }
    }
}
